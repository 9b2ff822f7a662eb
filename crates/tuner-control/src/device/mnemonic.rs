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

//! Mnemonic text protocol spoken by the receiver's command port.
//!
//! Every command is a short ASCII mnemonic followed by comma-separated
//! arguments and a `;`. Several may share a line. On the wire each line is
//! terminated by CRLF:
//!
//! ```text
//! FRQ<tuner>,<ddc>,<MHz>;        tune
//! SPR<tuner>,<ddc>,<MHz>;        sample rate
//! RCH<tuner>;ATN<dB>;RCH0;       attenuation (select tuner, set, deselect)
//! RCH<tuner>;PAM<0|1>;RCH0;      preamp
//! SIP / #UDP <tuner>,<ddc>,...;  stream destinations of a tuner
//! STE<tuner>,<ddc>,<0|1>;        stream enable
//! STO<tuner>,<ddc>,<port>;       route tuner output to a physical port
//! SYN1; / SYN0;                  gate outputs while retuning
//! ```
//!
//! The receiver streams per tuner and has no notion of host output
//! channels. Which tuner's stream a channel consumes is decided on the host,
//! so the encoder keeps that table and addresses every per-channel command
//! to the tuner currently feeding the channel.

use std::collections::{BTreeMap, BTreeSet};

use super::{AdapterSettings, DeviceCommand};
use crate::store::{ChannelId, DeviceEndpoints};

/// Digital down-converter used for every stream.
pub const DEFAULT_DDC: u8 = 1;

const HZ_PER_MHZ: f64 = 1_000_000.0;
const BROADCAST_MAC: &str = "FF:FF:FF:FF:FF:FF";
const BEGIN_CONFIG: &str = "CFG1;";
const END_CONFIG: &str = "CFG0;";
const DISABLE_OUTPUT: &str = "SYN1;";
const ENABLE_OUTPUT: &str = "SYN0;";
const ENABLE_INDEPENDENT_OPERATION: &str = "RCH1;DFM2;RCH2;DFM2;RCH3;DFM2;RCH4;DFM2;RCH0;";

/// Append the line terminator the command port expects.
#[must_use]
pub fn to_wire(line: &str) -> String {
    format!("{line}\r\n")
}

fn mhz(hz: f64) -> String {
    format!("{:.6}", hz / HZ_PER_MHZ)
}

/// Renders [`DeviceCommand`]s as mnemonic lines.
///
/// Until a channel is routed explicitly it is fed by the tuner with the same
/// index. The first time a tuner is routed to any channel its stream
/// destinations are configured as well.
#[derive(Debug, Clone)]
pub struct MnemonicEncoder {
    endpoints: DeviceEndpoints,
    routes: BTreeMap<ChannelId, u8>,
    configured: BTreeSet<u8>,
    num_outputs: u8,
    independent_operation: bool,
    physical_port: u8,
}

impl MnemonicEncoder {
    #[must_use]
    pub fn new(settings: &AdapterSettings) -> Self {
        Self {
            endpoints: settings.endpoints.clone(),
            routes: BTreeMap::new(),
            configured: BTreeSet::new(),
            num_outputs: settings.num_outputs,
            independent_operation: settings.independent_operation,
            physical_port: settings.physical_port,
        }
    }

    /// Tuner currently feeding `channel`.
    #[must_use]
    pub fn tuner_for(&self, channel: ChannelId) -> u8 {
        self.routes
            .get(&channel)
            .copied()
            .unwrap_or_else(|| channel.index())
    }

    /// Lines that configure the streams of every routed tuner, sent once
    /// after connecting.
    pub fn setup_sequence(&mut self) -> Vec<String> {
        let mut lines = vec![BEGIN_CONFIG.to_string()];
        for tuner in self.active_tuners() {
            lines.extend(self.stream_setup(tuner));
        }
        if self.independent_operation {
            lines.push(ENABLE_INDEPENDENT_OPERATION.to_string());
        }
        lines.push(END_CONFIG.to_string());
        lines
    }

    /// Encode one command into the lines that carry it.
    pub fn encode(&mut self, command: &DeviceCommand) -> Vec<String> {
        match *command {
            DeviceCommand::Tuner { tuner, channel } => {
                self.routes.insert(channel, tuner);
                if self.configured.contains(&tuner) {
                    vec![self.route_output(tuner)]
                } else {
                    let mut lines = vec![BEGIN_CONFIG.to_string()];
                    lines.extend(self.stream_setup(tuner));
                    lines.push(END_CONFIG.to_string());
                    lines
                }
            }
            DeviceCommand::Frequency { hz, channel } => {
                let tune = format!(
                    "FRQ{},{DEFAULT_DDC},{};",
                    self.tuner_for(channel),
                    mhz(hz)
                );
                if self.independent_operation {
                    vec![tune]
                } else {
                    vec![DISABLE_OUTPUT.to_string(), tune, ENABLE_OUTPUT.to_string()]
                }
            }
            DeviceCommand::Attenuation { db, channel } => {
                vec![format!("RCH{};ATN{db};RCH0;", self.tuner_for(channel))]
            }
            DeviceCommand::Preamp { enabled, channel } => {
                vec![format!(
                    "RCH{};PAM{};RCH0;",
                    self.tuner_for(channel),
                    u8::from(enabled)
                )]
            }
            DeviceCommand::SampleRate { hz } => {
                let mut lines = vec![DISABLE_OUTPUT.to_string()];
                for tuner in self.active_tuners() {
                    lines.push(format!("SPR{tuner},{DEFAULT_DDC},{};", mhz(hz)));
                }
                lines.push(ENABLE_OUTPUT.to_string());
                lines
            }
        }
    }

    /// Destinations, enable and output routing for one tuner's stream.
    fn stream_setup(&mut self, tuner: u8) -> Vec<String> {
        self.configured.insert(tuner);
        vec![
            format!(
                "SIP{tuner},{DEFAULT_DDC},{},{},{BROADCAST_MAC};",
                self.endpoints.stream_host, self.endpoints.stream_port
            ),
            format!(
                "#UDP{tuner},{DEFAULT_DDC},{},{},{BROADCAST_MAC};",
                self.endpoints.fibre_host, self.endpoints.fibre_port
            ),
            format!("STE{tuner},{DEFAULT_DDC},0;"),
            self.route_output(tuner),
        ]
    }

    fn route_output(&self, tuner: u8) -> String {
        format!("STO{tuner},{DEFAULT_DDC},{};", self.physical_port)
    }

    fn active_tuners(&self) -> Vec<u8> {
        let mut tuners: Vec<u8> = (1..=self.num_outputs)
            .map(|index| self.tuner_for(ChannelId::new(index)))
            .collect();
        tuners.sort_unstable();
        tuners.dedup();
        tuners
    }
}
