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

use crate::error::ValidationError;

const MIN_FREQUENCY_HZ: f64 = 2e6;
const MAX_FREQUENCY_HZ: f64 = 6.2e9;
const MIN_SAMPLE_RATE_HZ: f64 = 9e3;
const MAX_SAMPLE_RATE_HZ: f64 = 128e6;
const MAX_ATTENUATION_DB: u32 = 46;
const MAX_TUNERS: u8 = 4;
const MAX_CHANNELS: u8 = 4;

/// Bounds the device advertises for its tunable parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceCapabilities {
    pub min_frequency: f64,
    pub max_frequency: f64,
    pub min_sample_rate: f64,
    pub max_sample_rate: f64,
    pub max_attenuation: u32,
    pub max_tuners: u8,
    /// Output channels the host can consume at once.
    pub max_channels: u8,
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        Self {
            min_frequency: MIN_FREQUENCY_HZ,
            max_frequency: MAX_FREQUENCY_HZ,
            min_sample_rate: MIN_SAMPLE_RATE_HZ,
            max_sample_rate: MAX_SAMPLE_RATE_HZ,
            max_attenuation: MAX_ATTENUATION_DB,
            max_tuners: MAX_TUNERS,
            max_channels: MAX_CHANNELS,
        }
    }
}

impl DeviceCapabilities {
    // NaN fails every range check, so it never reaches the store.
    pub fn check_frequency(&self, hz: f64) -> Result<(), ValidationError> {
        if (self.min_frequency..=self.max_frequency).contains(&hz) {
            Ok(())
        } else {
            Err(ValidationError::FrequencyOutOfRange {
                hz,
                min: self.min_frequency,
                max: self.max_frequency,
            })
        }
    }

    pub fn check_sample_rate(&self, hz: f64) -> Result<(), ValidationError> {
        if (self.min_sample_rate..=self.max_sample_rate).contains(&hz) {
            Ok(())
        } else {
            Err(ValidationError::SampleRateOutOfRange {
                hz,
                min: self.min_sample_rate,
                max: self.max_sample_rate,
            })
        }
    }

    pub fn check_attenuation(&self, db: u32) -> Result<(), ValidationError> {
        if db <= self.max_attenuation {
            Ok(())
        } else {
            Err(ValidationError::AttenuationOutOfRange {
                db,
                max: self.max_attenuation,
            })
        }
    }

    pub fn check_tuner(&self, tuner: u8) -> Result<(), ValidationError> {
        if (1..=self.max_tuners).contains(&tuner) {
            Ok(())
        } else {
            Err(ValidationError::TunerOutOfRange {
                tuner,
                max: self.max_tuners,
            })
        }
    }

    pub fn check_channel_count(&self, count: usize) -> Result<(), ValidationError> {
        if (1..=usize::from(self.max_channels)).contains(&count) {
            Ok(())
        } else {
            Err(ValidationError::ChannelCount {
                count,
                max: self.max_channels,
            })
        }
    }
}
