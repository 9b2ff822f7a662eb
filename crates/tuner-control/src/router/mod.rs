// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Which displays consume which device output channel.
//!
//! The binding table is read by the sample path and by the controller at the
//! same time, so it sits behind a [`RouterHandle`] that hands out cheap
//! clones of the bound consumers instead of holding the lock while they run.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::info;
use uuid::Uuid;

use crate::error::BindingError;
use crate::store::ChannelId;

/// Anything that renders a channel's spectrum and must keep its frequency
/// axis in step with the data it is given.
///
/// Calls may arrive in any order relative to other consumers, and from any
/// thread. They are made while the controller is mid-change, so an
/// implementation must not call back into the controller.
pub trait DisplayConsumer: Send + Sync {
    fn set_frequency_range(&self, center_hz: f64, span_hz: f64);
}

/// Stable identity of a bound consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConsumerId(Uuid);

impl ConsumerId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }
}

impl Default for ConsumerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Shared reference to a consumer together with its identity.
#[derive(Clone)]
pub struct ConsumerRef {
    id: ConsumerId,
    consumer: Arc<dyn DisplayConsumer>,
}

impl ConsumerRef {
    /// Wrap `consumer` under a freshly generated id.
    #[must_use]
    pub fn new(consumer: Arc<dyn DisplayConsumer>) -> Self {
        Self::with_id(ConsumerId::new(), consumer)
    }

    #[must_use]
    pub fn with_id(id: ConsumerId, consumer: Arc<dyn DisplayConsumer>) -> Self {
        Self { id, consumer }
    }

    #[must_use]
    pub fn id(&self) -> ConsumerId {
        self.id
    }

    pub fn set_frequency_range(&self, center_hz: f64, span_hz: f64) {
        self.consumer.set_frequency_range(center_hz, span_hz);
    }
}

impl fmt::Debug for ConsumerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsumerRef")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// How many channels one consumer may be bound to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BindingPolicy {
    /// One tuner feeds one display.
    #[default]
    Exclusive,
    /// A consumer may watch several channels.
    Shared,
}

/// Relation table between device output channels and consumers.
#[derive(Debug)]
pub struct StreamRouter {
    num_channels: u8,
    policy: BindingPolicy,
    bindings: BTreeMap<ChannelId, Vec<ConsumerRef>>,
}

impl StreamRouter {
    #[must_use]
    pub fn new(num_channels: u8, policy: BindingPolicy) -> Self {
        Self {
            num_channels,
            policy,
            bindings: BTreeMap::new(),
        }
    }

    pub fn bind(&mut self, channel: ChannelId, consumer: ConsumerRef) -> Result<(), BindingError> {
        self.check_channel(channel)?;

        let id = consumer.id();
        for (bound_channel, consumers) in &self.bindings {
            let already_here = *bound_channel == channel;
            let exclusive = self.policy == BindingPolicy::Exclusive;
            if (already_here || exclusive) && consumers.iter().any(|c| c.id() == id) {
                return Err(BindingError::AlreadyBound {
                    consumer: id.to_string(),
                    channel: *bound_channel,
                });
            }
        }

        info!("Binding consumer {} to {}", id, channel);
        self.bindings.entry(channel).or_default().push(consumer);
        Ok(())
    }

    pub fn unbind(
        &mut self,
        channel: ChannelId,
        id: ConsumerId,
    ) -> Result<ConsumerRef, BindingError> {
        self.check_channel(channel)?;

        let not_bound = || BindingError::NotBound {
            consumer: id.to_string(),
            channel,
        };
        let consumers = self.bindings.get_mut(&channel).ok_or_else(not_bound)?;
        let position = consumers
            .iter()
            .position(|c| c.id() == id)
            .ok_or_else(not_bound)?;

        let removed = consumers.remove(position);
        if consumers.is_empty() {
            self.bindings.remove(&channel);
        }

        info!("Unbound consumer {} from {}", id, channel);
        Ok(removed)
    }

    /// Consumers bound to `channel`, possibly none.
    #[must_use]
    pub fn consumers_for(&self, channel: ChannelId) -> Vec<ConsumerRef> {
        self.bindings.get(&channel).cloned().unwrap_or_default()
    }

    /// Every channel `id` is bound to.
    #[must_use]
    pub fn channels_of(&self, id: ConsumerId) -> Vec<ChannelId> {
        self.bindings
            .iter()
            .filter(|(_, consumers)| consumers.iter().any(|c| c.id() == id))
            .map(|(channel, _)| *channel)
            .collect()
    }

    /// All bindings as `(channel, consumer)` pairs, in channel order.
    #[must_use]
    pub fn bindings(&self) -> Vec<(ChannelId, ConsumerRef)> {
        self.bindings
            .iter()
            .flat_map(|(channel, consumers)| consumers.iter().map(|c| (*channel, c.clone())))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    fn check_channel(&self, channel: ChannelId) -> Result<(), BindingError> {
        if (1..=self.num_channels).contains(&channel.index()) {
            Ok(())
        } else {
            Err(BindingError::UnknownChannel(channel))
        }
    }
}

/// Cloneable, thread-safe handle to a [`StreamRouter`].
#[derive(Debug, Clone)]
pub struct RouterHandle {
    inner: Arc<RwLock<StreamRouter>>,
}

impl RouterHandle {
    #[must_use]
    pub fn new(router: StreamRouter) -> Self {
        Self {
            inner: Arc::new(RwLock::new(router)),
        }
    }

    pub fn bind(&self, channel: ChannelId, consumer: ConsumerRef) -> Result<(), BindingError> {
        self.write().bind(channel, consumer)
    }

    pub fn unbind(&self, channel: ChannelId, id: ConsumerId) -> Result<ConsumerRef, BindingError> {
        self.write().unbind(channel, id)
    }

    #[must_use]
    pub fn consumers_for(&self, channel: ChannelId) -> Vec<ConsumerRef> {
        self.read().consumers_for(channel)
    }

    #[must_use]
    pub fn channels_of(&self, id: ConsumerId) -> Vec<ChannelId> {
        self.read().channels_of(id)
    }

    #[must_use]
    pub fn bindings(&self) -> Vec<(ChannelId, ConsumerRef)> {
        self.read().bindings()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, StreamRouter> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StreamRouter> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Null;

    impl DisplayConsumer for Null {
        fn set_frequency_range(&self, _center_hz: f64, _span_hz: f64) {}
    }

    fn consumer() -> ConsumerRef {
        ConsumerRef::new(Arc::new(Null))
    }

    #[test]
    fn test_bind_and_lookup() {
        let mut router = StreamRouter::new(4, BindingPolicy::Exclusive);
        let a = consumer();
        let b = consumer();

        router.bind(ChannelId::new(1), a.clone()).unwrap();
        router.bind(ChannelId::new(1), b.clone()).unwrap();

        let ids: Vec<_> = router
            .consumers_for(ChannelId::new(1))
            .iter()
            .map(ConsumerRef::id)
            .collect();
        assert_eq!(ids, vec![a.id(), b.id()]);
        assert!(router.consumers_for(ChannelId::new(2)).is_empty());
        assert_eq!(router.len(), 2);
    }

    #[test]
    fn test_bind_unknown_channel() {
        let mut router = StreamRouter::new(4, BindingPolicy::Exclusive);

        for index in [0, 5] {
            assert_eq!(
                router.bind(ChannelId::new(index), consumer()),
                Err(BindingError::UnknownChannel(ChannelId::new(index)))
            );
        }
        assert!(router.is_empty());
    }

    #[test]
    fn test_exclusive_policy_rejects_second_channel() {
        let mut router = StreamRouter::new(4, BindingPolicy::Exclusive);
        let a = consumer();

        router.bind(ChannelId::new(1), a.clone()).unwrap();
        let err = router.bind(ChannelId::new(2), a.clone()).unwrap_err();
        assert!(matches!(
            err,
            BindingError::AlreadyBound { channel, .. } if channel == ChannelId::new(1)
        ));
        assert_eq!(router.channels_of(a.id()), vec![ChannelId::new(1)]);
    }

    #[test]
    fn test_shared_policy_allows_several_channels() {
        let mut router = StreamRouter::new(4, BindingPolicy::Shared);
        let a = consumer();

        router.bind(ChannelId::new(1), a.clone()).unwrap();
        router.bind(ChannelId::new(3), a.clone()).unwrap();
        assert!(router.bind(ChannelId::new(3), a.clone()).is_err());
        assert_eq!(
            router.channels_of(a.id()),
            vec![ChannelId::new(1), ChannelId::new(3)]
        );
    }

    #[test]
    fn test_unbind() {
        let mut router = StreamRouter::new(2, BindingPolicy::Exclusive);
        let a = consumer();
        let ch = ChannelId::new(2);

        router.bind(ch, a.clone()).unwrap();
        assert_eq!(router.unbind(ch, a.id()).unwrap().id(), a.id());
        assert!(router.is_empty());
        assert!(matches!(
            router.unbind(ch, a.id()),
            Err(BindingError::NotBound { .. })
        ));

        // Rebinding elsewhere is fine once released.
        router.bind(ChannelId::new(1), a).unwrap();
    }

    #[test]
    fn test_handle_shared_between_threads() {
        let handle = RouterHandle::new(StreamRouter::new(4, BindingPolicy::Exclusive));
        let reader = handle.clone();
        let ch = ChannelId::new(1);

        handle.bind(ch, consumer()).unwrap();
        let seen = std::thread::spawn(move || reader.consumers_for(ch).len())
            .join()
            .unwrap();
        assert_eq!(seen, 1);
    }
}
