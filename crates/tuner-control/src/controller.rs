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

//! Single entry point for changing a tunable parameter.
//!
//! Every change runs the same protocol while holding the controller lock:
//!
//! 1. validate and write the value into the [`ParameterStore`];
//! 2. push the matching command to the [`DeviceAdapter`], putting the old
//!    value back if the push fails;
//! 3. mirror it into the [`SessionState`] and tell the bound displays.
//!
//! Holding one lock across all three steps serializes concurrent callers,
//! so requests for a channel are applied in arrival order and a display is
//! never told about a value the device has not been commanded to use.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{info, warn};
use tokio::sync::broadcast;

use crate::device::{AdapterSettings, DeviceAdapter, DeviceCommand};
use crate::error::{BindingError, ControlError, DeviceCommandError, ValidationError};
use crate::router::{BindingPolicy, ConsumerId, ConsumerRef, RouterHandle, StreamRouter};
use crate::session::{SessionSnapshot, SessionState};
use crate::store::{
    Channel, ChannelField, ChannelId, DeviceCapabilities, DeviceConfig, DeviceEndpoints,
    ParameterStore,
};

/// Start-up values for one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelDefaults {
    pub frequency: f64,
    pub attenuation: u32,
    pub preamp: bool,
    pub tuner: u8,
}

impl ChannelDefaults {
    /// Tuned to `frequency`, no attenuation, no preamp, fed by `tuner`.
    #[must_use]
    pub fn new(frequency: f64, tuner: u8) -> Self {
        Self {
            frequency,
            attenuation: 0,
            preamp: false,
            tuner,
        }
    }
}

/// Tuner feeding each output at start-up: outputs 1 and 4 share tuner 4,
/// tuner 1 stays unrouted.
pub const DEFAULT_TUNERS: [u8; 4] = [4, 2, 3, 4];

/// Configuration for a [`ChannelController`].
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub endpoints: DeviceEndpoints,
    pub capabilities: DeviceCapabilities,
    /// One entry per channel; channel `n` uses entry `n - 1`.
    pub channels: Vec<ChannelDefaults>,
    /// Initial sample rate in Hz.
    pub sample_rate: f64,
    pub preamp_available: bool,
    pub independent_operation: bool,
    pub physical_port: u8,
    pub binding_policy: BindingPolicy,
    /// Broadcast channel capacity for events.
    pub event_channel_capacity: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            endpoints: DeviceEndpoints::default(),
            capabilities: DeviceCapabilities::default(),
            channels: DEFAULT_TUNERS
                .iter()
                .map(|&tuner| ChannelDefaults::new(100e6, tuner))
                .collect(),
            sample_rate: 64e6,
            preamp_available: true,
            independent_operation: true,
            physical_port: 0,
            binding_policy: BindingPolicy::Exclusive,
            event_channel_capacity: 256,
        }
    }
}

impl ControllerConfig {
    /// Number of configured channels. Saturates at `u8::MAX`; counts the
    /// device cannot serve are rejected by [`ChannelController::new`].
    #[must_use]
    pub fn num_channels(&self) -> u8 {
        u8::try_from(self.channels.len()).unwrap_or(u8::MAX)
    }

    /// Settings an adapter for this device should be constructed with.
    #[must_use]
    pub fn adapter_settings(&self) -> AdapterSettings {
        AdapterSettings {
            endpoints: self.endpoints.clone(),
            num_outputs: self.num_channels(),
            independent_operation: self.independent_operation,
            physical_port: self.physical_port,
        }
    }
}

/// Events published after a change is applied or a device command fails.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    FrequencyChanged { channel: ChannelId, hz: f64 },
    SampleRateChanged { hz: f64 },
    AttenuationChanged { channel: ChannelId, db: u32 },
    PreampChanged { channel: ChannelId, enabled: bool },
    TunerAssigned { channel: ChannelId, tuner: u8 },
    CommandFailed {
        command: DeviceCommand,
        error: DeviceCommandError,
    },
}

#[derive(Debug)]
struct Inner {
    store: ParameterStore,
    session: SessionState,
}

/// Owns the receiver parameters and keeps the device, the store and the
/// displays consistent with each other.
pub struct ChannelController {
    inner: Mutex<Inner>,
    adapter: Arc<dyn DeviceAdapter>,
    router: RouterHandle,
    event_tx: broadcast::Sender<ControllerEvent>,
}

impl fmt::Debug for ChannelController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelController")
            .field("router", &self.router)
            .finish_non_exhaustive()
    }
}

impl ChannelController {
    /// Build the store from `config`. Nothing is sent to the device until
    /// [`initialize`](Self::initialize) is called.
    pub fn new(
        config: ControllerConfig,
        adapter: Arc<dyn DeviceAdapter>,
    ) -> Result<Self, ValidationError> {
        config
            .capabilities
            .check_channel_count(config.channels.len())?;
        let num_channels = config.num_channels();
        let device = DeviceConfig {
            sample_rate: config.sample_rate,
            endpoints: config.endpoints,
            num_channels,
            preamp_available: config.preamp_available,
        };
        let channels = config
            .channels
            .iter()
            .zip(1..=num_channels)
            .map(|(defaults, index)| Channel {
                id: ChannelId::new(index),
                frequency: defaults.frequency,
                attenuation: defaults.attenuation,
                preamp: defaults.preamp,
                tuner: defaults.tuner,
            })
            .collect();

        let store = ParameterStore::new(device, config.capabilities, channels)?;
        let session = SessionState::from_store(&store);
        let router = RouterHandle::new(StreamRouter::new(num_channels, config.binding_policy));
        let (event_tx, _) = broadcast::channel(config.event_channel_capacity.max(1));

        Ok(Self {
            inner: Mutex::new(Inner { store, session }),
            adapter,
            router,
            event_tx,
        })
    }

    /// Push the complete stored configuration to the device: tuner routing,
    /// preamp, frequency and attenuation of every channel, then the sample
    /// rate. Stops at the first command the device does not take.
    pub fn initialize(&self) -> Result<(), ControlError> {
        let inner = self.lock();
        let channels = inner.store.channels().to_vec();
        let sample_rate = inner.store.get_device_config().sample_rate;

        let commands = channels
            .iter()
            .map(|c| DeviceCommand::Tuner {
                tuner: c.tuner,
                channel: c.id,
            })
            .chain(channels.iter().map(|c| DeviceCommand::Preamp {
                enabled: c.preamp,
                channel: c.id,
            }))
            .chain(channels.iter().map(|c| DeviceCommand::Frequency {
                hz: c.frequency,
                channel: c.id,
            }))
            .chain(channels.iter().map(|c| DeviceCommand::Attenuation {
                db: c.attenuation,
                channel: c.id,
            }))
            .chain(std::iter::once(DeviceCommand::SampleRate { hz: sample_rate }));

        for command in commands {
            self.push(&command)?;
        }

        info!(
            "Pushed initial configuration for {} channels at {} Hz",
            channels.len(),
            sample_rate
        );
        Ok(())
    }

    /// Retune `channel` and refresh the axis of every display bound to it.
    pub fn set_frequency(&self, channel: ChannelId, hz: f64) -> Result<(), ControlError> {
        let mut inner = self.lock();
        self.commit(&mut inner, channel, ChannelField::Frequency(hz))?;
        inner.session.record_frequency(channel, hz);

        let span = inner.store.get_device_config().sample_rate;
        for consumer in self.router.consumers_for(channel) {
            consumer.set_frequency_range(hz, span);
        }

        info!("{} tuned to {} Hz", channel, hz);
        self.publish(ControllerEvent::FrequencyChanged { channel, hz });
        Ok(())
    }

    /// Change the device-wide sample rate and refresh the axis of every bound
    /// display on every channel.
    pub fn set_sample_rate(&self, hz: f64) -> Result<(), ControlError> {
        let mut inner = self.lock();
        let previous = inner.store.get_device_config().sample_rate;

        if let Err(e) = inner.store.set_sample_rate(hz) {
            warn!("Rejected sample rate: {}", e);
            return Err(e.into());
        }
        if let Err(e) = self.push(&DeviceCommand::SampleRate { hz }) {
            inner.store.restore_sample_rate(previous);
            return Err(e);
        }
        inner.session.record_sample_rate(hz);

        for channel in inner.store.channels() {
            for consumer in self.router.consumers_for(channel.id) {
                consumer.set_frequency_range(channel.frequency, hz);
            }
        }

        info!("Sample rate set to {} Hz", hz);
        self.publish(ControllerEvent::SampleRateChanged { hz });
        Ok(())
    }

    pub fn set_attenuation(&self, channel: ChannelId, db: u32) -> Result<(), ControlError> {
        let mut inner = self.lock();
        self.commit(&mut inner, channel, ChannelField::Attenuation(db))?;

        info!("{} attenuation set to {} dB", channel, db);
        self.publish(ControllerEvent::AttenuationChanged { channel, db });
        Ok(())
    }

    pub fn set_preamp(&self, channel: ChannelId, enabled: bool) -> Result<(), ControlError> {
        let mut inner = self.lock();
        self.commit(&mut inner, channel, ChannelField::Preamp(enabled))?;

        info!("{} preamp {}", channel, if enabled { "on" } else { "off" });
        self.publish(ControllerEvent::PreampChanged { channel, enabled });
        Ok(())
    }

    /// Route physical `tuner` to output `channel`.
    pub fn assign_tuner(&self, channel: ChannelId, tuner: u8) -> Result<(), ControlError> {
        let mut inner = self.lock();
        self.commit(&mut inner, channel, ChannelField::Tuner(tuner))?;

        info!("{} fed by tuner {}", channel, tuner);
        self.publish(ControllerEvent::TunerAssigned { channel, tuner });
        Ok(())
    }

    /// Bind a display to `channel` and hand it the channel's current window.
    pub fn bind(
        &self,
        channel: ChannelId,
        consumer: ConsumerRef,
    ) -> Result<ConsumerId, BindingError> {
        let inner = self.lock();
        let current = inner
            .store
            .get(channel)
            .ok_or(BindingError::UnknownChannel(channel))?;

        let id = consumer.id();
        self.router.bind(channel, consumer.clone())?;
        let span = inner.store.get_device_config().sample_rate;
        consumer.set_frequency_range(current.frequency, span);
        Ok(id)
    }

    pub fn unbind(&self, channel: ChannelId, id: ConsumerId) -> Result<(), BindingError> {
        let _inner = self.lock();
        self.router.unbind(channel, id).map(|_| ())
    }

    #[must_use]
    pub fn get(&self, channel: ChannelId) -> Option<Channel> {
        self.lock().store.get(channel)
    }

    #[must_use]
    pub fn channels(&self) -> Vec<Channel> {
        self.lock().store.channels().to_vec()
    }

    #[must_use]
    pub fn device_config(&self) -> DeviceConfig {
        self.lock().store.get_device_config().clone()
    }

    #[must_use]
    pub fn capabilities(&self) -> DeviceCapabilities {
        self.lock().store.capabilities().clone()
    }

    /// Last-applied values for re-display.
    #[must_use]
    pub fn session(&self) -> SessionSnapshot {
        self.lock().session.snapshot()
    }

    /// Handle to the binding table for the sample path.
    #[must_use]
    pub fn router(&self) -> RouterHandle {
        self.router.clone()
    }

    /// Subscribe to controller events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.event_tx.subscribe()
    }

    /// Write `field` into the store and push it to the device, rolling the
    /// store back if the push fails.
    fn commit(
        &self,
        inner: &mut Inner,
        channel: ChannelId,
        field: ChannelField,
    ) -> Result<(), ControlError> {
        let before = inner
            .store
            .get(channel)
            .ok_or(ValidationError::UnknownChannel(channel))?;

        if let Err(e) = inner.store.set(channel, field) {
            warn!("Rejected change to {}: {}", channel, e);
            return Err(e.into());
        }

        if let Err(e) = self.push(&command_for(channel, field)) {
            inner.store.restore(before);
            return Err(e);
        }
        Ok(())
    }

    fn push(&self, command: &DeviceCommand) -> Result<(), ControlError> {
        self.adapter.send(command).map_err(|error| {
            warn!("Device command {} failed: {}", command, error);
            self.publish(ControllerEvent::CommandFailed {
                command: *command,
                error: error.clone(),
            });
            ControlError::Device(error)
        })
    }

    fn publish(&self, event: ControllerEvent) {
        let _ = self.event_tx.send(event);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn command_for(channel: ChannelId, field: ChannelField) -> DeviceCommand {
    match field {
        ChannelField::Frequency(hz) => DeviceCommand::Frequency { hz, channel },
        ChannelField::Attenuation(db) => DeviceCommand::Attenuation { db, channel },
        ChannelField::Preamp(enabled) => DeviceCommand::Preamp { enabled, channel },
        ChannelField::Tuner(tuner) => DeviceCommand::Tuner { tuner, channel },
    }
}
