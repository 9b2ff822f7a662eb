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

//! Authoritative per-channel and device-wide receiver parameters.
//!
//! The store only validates and holds values. Pushing them to the device and
//! telling displays about them is the controller's job.

mod capabilities;

pub use capabilities::DeviceCapabilities;

use std::fmt;

use crate::error::ValidationError;

/// One-based index of a tuner channel on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(u8);

impl ChannelId {
    #[must_use]
    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    #[must_use]
    pub const fn index(self) -> u8 {
        self.0
    }
}

impl From<u8> for ChannelId {
    fn from(index: u8) -> Self {
        Self(index)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel {}", self.0)
    }
}

/// Parameters of one tuner channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Channel {
    pub id: ChannelId,
    /// Center frequency in Hz.
    pub frequency: f64,
    /// Attenuation in dB.
    pub attenuation: u32,
    pub preamp: bool,
    /// Physical tuner routed to this output channel.
    pub tuner: u8,
}

impl Channel {
    /// A channel at `frequency` with no attenuation, preamp off and the tuner
    /// of the same index routed to it.
    #[must_use]
    pub fn new(id: ChannelId, frequency: f64) -> Self {
        Self {
            id,
            frequency,
            attenuation: 0,
            preamp: false,
            tuner: id.index(),
        }
    }
}

/// Network endpoints of the receiver and of the hosts its streams go to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEndpoints {
    /// Address of the device's control interface.
    pub device_address: String,
    /// TCP port for mnemonic commands.
    pub command_port: u16,
    /// Host receiving the first output stream.
    pub stream_host: String,
    pub stream_port: u16,
    /// Host receiving the second output stream (fibre link).
    pub fibre_host: String,
    pub fibre_port: u16,
}

impl Default for DeviceEndpoints {
    fn default() -> Self {
        Self {
            device_address: "192.168.10.50".to_string(),
            command_port: 4991,
            stream_host: "192.168.11.61".to_string(),
            stream_port: 4991,
            fibre_host: "192.168.11.71".to_string(),
            fibre_port: 4991,
        }
    }
}

/// Settings shared by every channel.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceConfig {
    /// Sample rate in Hz. The only field that changes after construction.
    pub sample_rate: f64,
    pub endpoints: DeviceEndpoints,
    pub num_channels: u8,
    pub preamp_available: bool,
}

/// A single per-channel field together with its new value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChannelField {
    Frequency(f64),
    Attenuation(u32),
    Preamp(bool),
    Tuner(u8),
}

/// Holds every tunable value and refuses any that the device cannot take.
#[derive(Debug, Clone)]
pub struct ParameterStore {
    channels: Vec<Channel>,
    device: DeviceConfig,
    capabilities: DeviceCapabilities,
}

impl ParameterStore {
    /// Build a store from initial values, validating every one of them.
    ///
    /// `channels` must hold exactly `device.num_channels` entries with ids
    /// `1..=num_channels` in order.
    pub fn new(
        device: DeviceConfig,
        capabilities: DeviceCapabilities,
        channels: Vec<Channel>,
    ) -> Result<Self, ValidationError> {
        capabilities.check_sample_rate(device.sample_rate)?;

        if channels.len() != usize::from(device.num_channels) {
            let missing = u8::try_from(channels.len() + 1).unwrap_or(u8::MAX);
            return Err(ValidationError::UnknownChannel(ChannelId::new(missing)));
        }

        let store = Self {
            channels,
            device,
            capabilities,
        };

        for (position, channel) in store.channels.iter().enumerate() {
            if usize::from(channel.id.index()) != position + 1 {
                return Err(ValidationError::UnknownChannel(channel.id));
            }
            store.validate(channel.id, ChannelField::Frequency(channel.frequency))?;
            store.validate(channel.id, ChannelField::Attenuation(channel.attenuation))?;
            store.validate(channel.id, ChannelField::Preamp(channel.preamp))?;
            store.validate(channel.id, ChannelField::Tuner(channel.tuner))?;
        }

        Ok(store)
    }

    /// Current parameters of `channel`, if it exists.
    #[must_use]
    pub fn get(&self, channel: ChannelId) -> Option<Channel> {
        self.slot(channel).map(|index| self.channels[index])
    }

    #[must_use]
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    #[must_use]
    pub fn contains(&self, channel: ChannelId) -> bool {
        self.slot(channel).is_some()
    }

    #[must_use]
    pub fn get_device_config(&self) -> &DeviceConfig {
        &self.device
    }

    #[must_use]
    pub fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    /// Check `field` against the device's bounds without changing anything.
    pub fn validate(&self, channel: ChannelId, field: ChannelField) -> Result<(), ValidationError> {
        if !self.contains(channel) {
            return Err(ValidationError::UnknownChannel(channel));
        }

        match field {
            ChannelField::Frequency(hz) => self.capabilities.check_frequency(hz),
            ChannelField::Attenuation(db) => self.capabilities.check_attenuation(db),
            ChannelField::Tuner(tuner) => self.capabilities.check_tuner(tuner),
            ChannelField::Preamp(enabled) => {
                if enabled && !self.device.preamp_available {
                    Err(ValidationError::PreampUnavailable(channel))
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Replace one field of `channel`. Nothing changes if validation fails.
    pub fn set(&mut self, channel: ChannelId, field: ChannelField) -> Result<(), ValidationError> {
        self.validate(channel, field)?;
        let index = self
            .slot(channel)
            .ok_or(ValidationError::UnknownChannel(channel))?;

        let entry = &mut self.channels[index];
        match field {
            ChannelField::Frequency(hz) => entry.frequency = hz,
            ChannelField::Attenuation(db) => entry.attenuation = db,
            ChannelField::Preamp(enabled) => entry.preamp = enabled,
            ChannelField::Tuner(tuner) => entry.tuner = tuner,
        }
        Ok(())
    }

    /// Replace the device-wide sample rate. Nothing changes if validation fails.
    pub fn set_sample_rate(&mut self, hz: f64) -> Result<(), ValidationError> {
        self.capabilities.check_sample_rate(hz)?;
        self.device.sample_rate = hz;
        Ok(())
    }

    /// Put back a channel snapshot taken before a failed device push.
    pub(crate) fn restore(&mut self, snapshot: Channel) {
        if let Some(index) = self.slot(snapshot.id) {
            self.channels[index] = snapshot;
        }
    }

    pub(crate) fn restore_sample_rate(&mut self, hz: f64) {
        self.device.sample_rate = hz;
    }

    fn slot(&self, channel: ChannelId) -> Option<usize> {
        let index = usize::from(channel.index()).checked_sub(1)?;
        (index < self.channels.len()).then_some(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(num_channels: u8) -> DeviceConfig {
        DeviceConfig {
            sample_rate: 64e6,
            endpoints: DeviceEndpoints::default(),
            num_channels,
            preamp_available: true,
        }
    }

    fn store() -> ParameterStore {
        let channels = (1..=4)
            .map(|n| Channel::new(ChannelId::new(n), 100e6))
            .collect();
        ParameterStore::new(device(4), DeviceCapabilities::default(), channels).unwrap()
    }

    #[test]
    fn test_set_frequency_within_range() {
        let mut store = store();
        let ch = ChannelId::new(1);

        for hz in [2e6, 111.5e6, 2.4e9, 6.2e9] {
            store.set(ch, ChannelField::Frequency(hz)).unwrap();
            assert_eq!(store.get(ch).unwrap().frequency, hz);
        }
    }

    #[test]
    fn test_out_of_range_frequency_leaves_store_unchanged() {
        let mut store = store();
        let ch = ChannelId::new(2);

        for hz in [0.0, 1.999e6, 6.2e9 + 1.0, -5.0, f64::NAN, f64::INFINITY] {
            let err = store.set(ch, ChannelField::Frequency(hz)).unwrap_err();
            assert!(matches!(err, ValidationError::FrequencyOutOfRange { .. }));
            assert_eq!(store.get(ch).unwrap().frequency, 100e6);
        }
    }

    #[test]
    fn test_sample_rate_bounds() {
        let mut store = store();

        store.set_sample_rate(9e3).unwrap();
        store.set_sample_rate(128e6).unwrap();
        assert_eq!(store.get_device_config().sample_rate, 128e6);

        assert!(store.set_sample_rate(8_999.0).is_err());
        assert!(store.set_sample_rate(128e6 + 1.0).is_err());
        assert_eq!(store.get_device_config().sample_rate, 128e6);
    }

    #[test]
    fn test_attenuation_and_tuner_bounds() {
        let mut store = store();
        let ch = ChannelId::new(3);

        store.set(ch, ChannelField::Attenuation(46)).unwrap();
        assert_eq!(
            store.set(ch, ChannelField::Attenuation(47)),
            Err(ValidationError::AttenuationOutOfRange { db: 47, max: 46 })
        );
        assert_eq!(store.get(ch).unwrap().attenuation, 46);

        store.set(ch, ChannelField::Tuner(1)).unwrap();
        assert!(store.set(ch, ChannelField::Tuner(0)).is_err());
        assert!(store.set(ch, ChannelField::Tuner(5)).is_err());
        assert_eq!(store.get(ch).unwrap().tuner, 1);
    }

    #[test]
    fn test_unknown_channel() {
        let mut store = store();

        assert!(store.get(ChannelId::new(0)).is_none());
        assert!(store.get(ChannelId::new(5)).is_none());
        assert_eq!(
            store.set(ChannelId::new(5), ChannelField::Preamp(true)),
            Err(ValidationError::UnknownChannel(ChannelId::new(5)))
        );
    }

    #[test]
    fn test_preamp_requires_hardware() {
        let mut config = device(1);
        config.preamp_available = false;
        let channels = vec![Channel::new(ChannelId::new(1), 100e6)];
        let mut store =
            ParameterStore::new(config, DeviceCapabilities::default(), channels).unwrap();
        let ch = ChannelId::new(1);

        assert_eq!(
            store.set(ch, ChannelField::Preamp(true)),
            Err(ValidationError::PreampUnavailable(ch))
        );
        store.set(ch, ChannelField::Preamp(false)).unwrap();
        assert!(!store.get(ch).unwrap().preamp);
    }

    #[test]
    fn test_new_rejects_invalid_initial_values() {
        let channels = vec![Channel::new(ChannelId::new(1), 1e6)];
        assert!(ParameterStore::new(device(1), DeviceCapabilities::default(), channels).is_err());

        let channels = vec![Channel::new(ChannelId::new(2), 100e6)];
        assert!(ParameterStore::new(device(1), DeviceCapabilities::default(), channels).is_err());

        let channels = vec![Channel::new(ChannelId::new(1), 100e6)];
        assert!(ParameterStore::new(device(2), DeviceCapabilities::default(), channels).is_err());
    }

    #[test]
    fn test_restore_snapshot() {
        let mut store = store();
        let ch = ChannelId::new(1);
        let before = store.get(ch).unwrap();

        store.set(ch, ChannelField::Attenuation(20)).unwrap();
        store.restore(before);
        assert_eq!(store.get(ch).unwrap(), before);
    }
}
