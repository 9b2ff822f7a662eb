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

//! Error types reported to whoever initiated a parameter change.
//!
//! None of these are fatal. A rejected request leaves the parameter store
//! exactly as it was before the call.

use thiserror::Error;

use crate::store::ChannelId;

/// A requested value lies outside what the device advertises, or names
/// something the device does not have.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("frequency {hz} Hz outside tunable range {min}..={max} Hz")]
    FrequencyOutOfRange { hz: f64, min: f64, max: f64 },

    #[error("sample rate {hz} Hz outside supported range {min}..={max} Hz")]
    SampleRateOutOfRange { hz: f64, min: f64, max: f64 },

    #[error("attenuation {db} dB above maximum {max} dB")]
    AttenuationOutOfRange { db: u32, max: u32 },

    #[error("tuner {tuner} outside 1..={max}")]
    TunerOutOfRange { tuner: u8, max: u8 },

    #[error("{count} channels requested, device supports 1..={max}")]
    ChannelCount { count: usize, max: u8 },

    #[error("{0} does not exist on this device")]
    UnknownChannel(ChannelId),

    #[error("preamp requested on {0} but the device has no preamp")]
    PreampUnavailable(ChannelId),

    #[error("value {value} outside control range {min}..={max} for '{label}'")]
    OutsideControlRange {
        label: String,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// The device adapter could not deliver a command, or the device refused it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceCommandError {
    #[error("device unreachable: {0}")]
    Unreachable(String),

    #[error("device rejected '{command}': {reason}")]
    Rejected { command: String, reason: String },
}

/// A consumer binding could not be created or removed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    #[error("cannot bind to {0}: no such channel")]
    UnknownChannel(ChannelId),

    #[error("consumer {consumer} is already bound to {channel}")]
    AlreadyBound { consumer: String, channel: ChannelId },

    #[error("consumer {consumer} is not bound to {channel}")]
    NotBound { consumer: String, channel: ChannelId },
}

/// Any failure of a controller entry point.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControlError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Device(#[from] DeviceCommandError),

    #[error(transparent)]
    Binding(#[from] BindingError),
}

impl ControlError {
    /// Whether the request was refused before anything was sent to the device.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Whether the device push failed (the store was rolled back).
    #[must_use]
    pub fn is_device(&self) -> bool {
        matches!(self, Self::Device(_))
    }
}
