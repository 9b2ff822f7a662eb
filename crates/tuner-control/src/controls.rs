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

//! Slider-style controls bound to exactly one controller setter.

use crate::controller::ChannelController;
use crate::error::{ControlError, ValidationError};
use crate::store::ChannelId;

/// Range a control offers: bounds, step, start value and display resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeSpec {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub default: f64,
    /// Number of discrete positions a slider renders.
    pub resolution: u32,
}

impl RangeSpec {
    #[must_use]
    pub const fn new(min: f64, max: f64, step: f64, default: f64, resolution: u32) -> Self {
        Self {
            min,
            max,
            step,
            default,
            resolution,
        }
    }

    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// The setter a control drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlTarget {
    SampleRate,
    Frequency(ChannelId),
    Attenuation(ChannelId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeControl {
    pub label: String,
    pub spec: RangeSpec,
    pub target: ControlTarget,
}

impl RangeControl {
    #[must_use]
    pub fn new(label: impl Into<String>, spec: RangeSpec, target: ControlTarget) -> Self {
        Self {
            label: label.into(),
            spec,
            target,
        }
    }

    /// Forward `value` to the bound setter if it lies within this control's
    /// range. The controller still applies the device limits.
    pub fn apply(&self, controller: &ChannelController, value: f64) -> Result<(), ControlError> {
        if !self.spec.contains(value) {
            return Err(ValidationError::OutsideControlRange {
                label: self.label.clone(),
                value,
                min: self.spec.min,
                max: self.spec.max,
            }
            .into());
        }

        match self.target {
            ControlTarget::SampleRate => controller.set_sample_rate(value),
            ControlTarget::Frequency(channel) => controller.set_frequency(channel, value),
            ControlTarget::Attenuation(channel) => {
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    reason = "value is non-negative and bounded by the control range"
                )]
                let db = value.round() as u32;
                controller.set_attenuation(channel, db)
            }
        }
    }
}

/// Sample rate control plus one frequency control per channel.
#[must_use]
pub fn standard_controls(channels: u8) -> Vec<RangeControl> {
    let mut controls = vec![RangeControl::new(
        "samp_rate",
        RangeSpec::new(9e3, 128e6, 1e5, 64e6, 200),
        ControlTarget::SampleRate,
    )];

    for index in 1..=channels {
        let step = if index == 1 { 1e6 } else { 1e5 };
        controls.push(RangeControl::new(
            format!("freq_{index}"),
            RangeSpec::new(2e6, 6200e6, step, 100e6, 500),
            ControlTarget::Frequency(ChannelId::new(index)),
        ));
    }
    controls
}

/// Attenuation control for `channel` covering `0..=max_db`.
#[must_use]
pub fn attenuation_control(channel: ChannelId, max_db: u32) -> RangeControl {
    RangeControl::new(
        format!("atten_{}", channel.index()),
        RangeSpec::new(0.0, f64::from(max_db), 1.0, 0.0, max_db),
        ControlTarget::Attenuation(channel),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::controller::ControllerConfig;
    use crate::device::{DeviceCommand, DryRunAdapter};

    fn controller() -> (ChannelController, Arc<DryRunAdapter>) {
        let config = ControllerConfig::default();
        let adapter = Arc::new(DryRunAdapter::new(config.adapter_settings()));
        let controller = ChannelController::new(config, adapter.clone()).unwrap();
        (controller, adapter)
    }

    #[test]
    fn test_standard_controls() {
        let controls = standard_controls(4);

        assert_eq!(controls.len(), 5);
        assert_eq!(controls[0].target, ControlTarget::SampleRate);
        assert_eq!(controls[0].spec, RangeSpec::new(9e3, 128e6, 1e5, 64e6, 200));
        assert_eq!(controls[1].label, "freq_1");
        assert_eq!(controls[1].spec.step, 1e6);
        assert_eq!(controls[2].spec.step, 1e5);
        assert_eq!(
            controls[4].target,
            ControlTarget::Frequency(ChannelId::new(4))
        );
    }

    #[test]
    fn test_apply_calls_bound_setter() {
        let (controller, adapter) = controller();
        adapter.clear();
        let controls = standard_controls(4);

        controls[2].apply(&controller, 433.92e6).unwrap();
        controls[0].apply(&controller, 2.4e6).unwrap();

        assert_eq!(
            adapter.commands(),
            vec![
                DeviceCommand::Frequency {
                    hz: 433.92e6,
                    channel: ChannelId::new(2),
                },
                DeviceCommand::SampleRate { hz: 2.4e6 },
            ]
        );
    }

    #[test]
    fn test_apply_outside_control_range() {
        let (controller, adapter) = controller();
        adapter.clear();
        let rate = &standard_controls(1)[0];

        let err = rate.apply(&controller, 200e6).unwrap_err();
        assert!(matches!(
            err,
            ControlError::Validation(ValidationError::OutsideControlRange { ref label, .. })
                if label == "samp_rate"
        ));
        assert!(adapter.commands().is_empty());
        assert_eq!(controller.device_config().sample_rate, 64e6);
    }

    #[test]
    fn test_attenuation_control() {
        let (controller, _adapter) = controller();
        let ch = ChannelId::new(3);
        let control = attenuation_control(ch, 46);

        control.apply(&controller, 12.0).unwrap();
        assert_eq!(controller.get(ch).unwrap().attenuation, 12);
        assert!(control.apply(&controller, 47.0).is_err());
    }
}
