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

//! Device layer: the commands a receiver accepts and the adapter seam they
//! are sent through.
//!
//! The controller only ever talks to a [`DeviceAdapter`]. Implementations
//! decide how a command reaches the hardware; this crate ships a
//! [`DryRunAdapter`] that renders commands in the receiver's mnemonic
//! protocol and records them instead of sending them.

mod dry_run;
pub mod mnemonic;

pub use dry_run::DryRunAdapter;
pub use mnemonic::MnemonicEncoder;

use std::fmt;

use crate::error::DeviceCommandError;
use crate::store::{ChannelId, DeviceEndpoints};

/// A coarse-grained configuration command for the receiver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeviceCommand {
    /// Route a physical tuner to an output channel.
    Tuner { tuner: u8, channel: ChannelId },
    /// Tune a channel, in Hz.
    Frequency { hz: f64, channel: ChannelId },
    /// Attenuation of a channel, in dB.
    Attenuation { db: u32, channel: ChannelId },
    Preamp { enabled: bool, channel: ChannelId },
    /// Device-wide sample rate, in Hz.
    SampleRate { hz: f64 },
}

impl DeviceCommand {
    /// Channel the command targets, `None` for device-wide commands.
    #[must_use]
    pub fn channel(&self) -> Option<ChannelId> {
        match *self {
            Self::Tuner { channel, .. }
            | Self::Frequency { channel, .. }
            | Self::Attenuation { channel, .. }
            | Self::Preamp { channel, .. } => Some(channel),
            Self::SampleRate { .. } => None,
        }
    }
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tuner { tuner, channel } => {
                write!(f, "update_tuners({tuner}, {})", channel.index())
            }
            Self::Frequency { hz, channel } => {
                write!(f, "update_freq({hz}, {})", channel.index())
            }
            Self::Attenuation { db, channel } => {
                write!(f, "update_atten({db}, {})", channel.index())
            }
            Self::Preamp { enabled, channel } => {
                write!(f, "update_preamp({enabled}, {})", channel.index())
            }
            Self::SampleRate { hz } => write!(f, "update_samprate({hz})"),
        }
    }
}

/// Everything an adapter needs to reach and set up the receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterSettings {
    pub endpoints: DeviceEndpoints,
    /// Number of output channels the host consumes.
    pub num_outputs: u8,
    /// Let every tuner run independently of the others (dual-output mode).
    pub independent_operation: bool,
    /// Physical output port on the receiver.
    pub physical_port: u8,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            endpoints: DeviceEndpoints::default(),
            num_outputs: 4,
            independent_operation: true,
            physical_port: 0,
        }
    }
}

/// Sink for device commands.
///
/// Commands are fire-and-forget from the data path's point of view, but an
/// adapter must report whether it could deliver each one so the controller
/// can roll back a change the device never received.
pub trait DeviceAdapter: Send + Sync {
    fn send(&self, command: &DeviceCommand) -> Result<(), DeviceCommandError>;

    fn update_tuners(&self, tuner: u8, channel: ChannelId) -> Result<(), DeviceCommandError> {
        self.send(&DeviceCommand::Tuner { tuner, channel })
    }

    fn update_freq(&self, hz: f64, channel: ChannelId) -> Result<(), DeviceCommandError> {
        self.send(&DeviceCommand::Frequency { hz, channel })
    }

    fn update_atten(&self, db: u32, channel: ChannelId) -> Result<(), DeviceCommandError> {
        self.send(&DeviceCommand::Attenuation { db, channel })
    }

    fn update_preamp(&self, enabled: bool, channel: ChannelId) -> Result<(), DeviceCommandError> {
        self.send(&DeviceCommand::Preamp { enabled, channel })
    }

    fn update_samprate(&self, hz: f64) -> Result<(), DeviceCommandError> {
        self.send(&DeviceCommand::SampleRate { hz })
    }
}
