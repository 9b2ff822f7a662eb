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

//! Parameter control for a networked multi-tuner receiver.
//!
//! The receiver exposes several independent tuners, each routed to an output
//! channel that streams samples to the host. This library keeps three things
//! consistent whenever a parameter changes:
//!
//! - **Store layer**: authoritative per-channel and device-wide values,
//!   validated against the device's capabilities
//! - **Device layer**: commands pushed to the receiver through a
//!   [`DeviceAdapter`], with a mnemonic encoder and a dry-run adapter
//! - **Router layer**: which displays consume which channel, so a change
//!   refreshes exactly the frequency axes that depend on it
//!
//! All changes go through a [`ChannelController`].
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use tuner_control::{ChannelController, ChannelId, ControllerConfig, DryRunAdapter};
//!
//! let config = ControllerConfig::default();
//! let adapter = Arc::new(DryRunAdapter::new(config.adapter_settings()));
//! let controller = ChannelController::new(config, adapter).unwrap();
//!
//! controller.initialize().unwrap();
//! controller.set_frequency(ChannelId::new(1), 111.5e6).unwrap();
//!
//! assert_eq!(controller.get(ChannelId::new(1)).unwrap().frequency, 111.5e6);
//! ```
//!
//! # Binding a Display
//!
//! ```
//! use std::sync::Arc;
//! use tuner_control::{
//!     ChannelController, ChannelId, ConsumerRef, ControllerConfig, DisplayConsumer,
//!     DryRunAdapter,
//! };
//!
//! struct Waterfall;
//!
//! impl DisplayConsumer for Waterfall {
//!     fn set_frequency_range(&self, center_hz: f64, span_hz: f64) {
//!         println!("axis {center_hz} +/- {}", span_hz / 2.0);
//!     }
//! }
//!
//! let config = ControllerConfig::default();
//! let adapter = Arc::new(DryRunAdapter::new(config.adapter_settings()));
//! let controller = ChannelController::new(config, adapter).unwrap();
//!
//! controller
//!     .bind(ChannelId::new(2), ConsumerRef::new(Arc::new(Waterfall)))
//!     .unwrap();
//! controller.set_sample_rate(2.4e6).unwrap();
//! ```

pub mod controller;
pub mod controls;
pub mod device;
pub mod error;
pub mod router;
pub mod session;
pub mod store;

pub use controller::{ChannelController, ChannelDefaults, ControllerConfig, ControllerEvent};
pub use controls::{attenuation_control, standard_controls, ControlTarget, RangeControl, RangeSpec};
pub use device::{AdapterSettings, DeviceAdapter, DeviceCommand, DryRunAdapter, MnemonicEncoder};
pub use error::{BindingError, ControlError, DeviceCommandError, ValidationError};
pub use router::{
    BindingPolicy, ConsumerId, ConsumerRef, DisplayConsumer, RouterHandle, StreamRouter,
};
pub use session::{SessionSnapshot, SessionState};
pub use store::{
    Channel, ChannelField, ChannelId, DeviceCapabilities, DeviceConfig, DeviceEndpoints,
    ParameterStore,
};
