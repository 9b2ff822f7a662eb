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

//! Last-applied values mirrored for re-display by a front end.
//!
//! Not authoritative: the parameter store is. The controller writes here in
//! the same critical section that commits a change, so what a control shows
//! never lags what the device was told.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::store::{ChannelId, ParameterStore};

/// Cache of the UI-exposed variables: the sample rate and each channel's
/// frequency.
#[derive(Debug, Clone)]
pub struct SessionState {
    sample_rate: f64,
    frequencies: BTreeMap<ChannelId, f64>,
    updated_at: DateTime<Utc>,
}

/// Immutable copy of the session handed to readers.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub sample_rate: f64,
    pub frequencies: BTreeMap<ChannelId, f64>,
    /// Time of the last applied change (or of initialization).
    pub updated_at: DateTime<Utc>,
}

impl SessionSnapshot {
    #[must_use]
    pub fn frequency(&self, channel: ChannelId) -> Option<f64> {
        self.frequencies.get(&channel).copied()
    }
}

impl SessionState {
    /// Initialize from the store's current contents.
    #[must_use]
    pub fn from_store(store: &ParameterStore) -> Self {
        Self {
            sample_rate: store.get_device_config().sample_rate,
            frequencies: store
                .channels()
                .iter()
                .map(|channel| (channel.id, channel.frequency))
                .collect(),
            updated_at: Utc::now(),
        }
    }

    pub(crate) fn record_frequency(&mut self, channel: ChannelId, hz: f64) {
        self.frequencies.insert(channel, hz);
        self.updated_at = Utc::now();
    }

    pub(crate) fn record_sample_rate(&mut self, hz: f64) {
        self.sample_rate = hz;
        self.updated_at = Utc::now();
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            sample_rate: self.sample_rate,
            frequencies: self.frequencies.clone(),
            updated_at: self.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Channel, DeviceCapabilities, DeviceConfig, DeviceEndpoints};

    #[test]
    fn test_mirrors_store_and_records_changes() {
        let device = DeviceConfig {
            sample_rate: 64e6,
            endpoints: DeviceEndpoints::default(),
            num_channels: 2,
            preamp_available: false,
        };
        let channels = vec![
            Channel::new(ChannelId::new(1), 100e6),
            Channel::new(ChannelId::new(2), 200e6),
        ];
        let store = ParameterStore::new(device, DeviceCapabilities::default(), channels).unwrap();

        let mut session = SessionState::from_store(&store);
        let before = session.snapshot();
        assert_eq!(before.sample_rate, 64e6);
        assert_eq!(before.frequency(ChannelId::new(2)), Some(200e6));

        session.record_frequency(ChannelId::new(1), 111.5e6);
        session.record_sample_rate(1e5);

        let after = session.snapshot();
        assert_eq!(after.frequency(ChannelId::new(1)), Some(111.5e6));
        assert_eq!(after.sample_rate, 1e5);
        assert!(after.updated_at >= before.updated_at);
        // Snapshots are copies.
        assert_eq!(before.frequency(ChannelId::new(1)), Some(100e6));
    }
}
