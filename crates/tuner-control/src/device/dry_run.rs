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

use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{info, warn};

use super::mnemonic::{self, MnemonicEncoder};
use super::{AdapterSettings, DeviceAdapter, DeviceCommand};
use crate::error::DeviceCommandError;

#[derive(Debug)]
struct DryRunState {
    encoder: MnemonicEncoder,
    commands: Vec<DeviceCommand>,
    wire: Vec<String>,
    reachable: bool,
    reject_next: Option<String>,
}

/// Adapter that encodes commands but never opens a socket.
///
/// Every accepted command is logged with its mnemonic rendering and kept
/// for inspection. The adapter can be told to behave like an unreachable
/// receiver, or to reject the next command it gets.
#[derive(Debug)]
pub struct DryRunAdapter {
    settings: AdapterSettings,
    state: Mutex<DryRunState>,
}

impl DryRunAdapter {
    #[must_use]
    pub fn new(settings: AdapterSettings) -> Self {
        let mut encoder = MnemonicEncoder::new(&settings);
        let mut wire = Vec::new();
        for line in encoder.setup_sequence() {
            info!("{} <- {}", settings.endpoints.device_address, line);
            wire.push(mnemonic::to_wire(&line));
        }

        let state = DryRunState {
            encoder,
            commands: Vec::new(),
            wire,
            reachable: true,
            reject_next: None,
        };

        Self {
            settings,
            state: Mutex::new(state),
        }
    }

    /// Commands accepted so far, oldest first.
    #[must_use]
    pub fn commands(&self) -> Vec<DeviceCommand> {
        self.lock().commands.clone()
    }

    /// CRLF-terminated lines produced so far, including the setup sequence.
    #[must_use]
    pub fn wire_log(&self) -> Vec<String> {
        self.lock().wire.clone()
    }

    /// Forget recorded commands and lines.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.commands.clear();
        state.wire.clear();
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.lock().reachable = reachable;
    }

    /// Make the next command fail as if the receiver refused it.
    pub fn reject_next(&self, reason: impl Into<String>) {
        self.lock().reject_next = Some(reason.into());
    }

    fn lock(&self) -> MutexGuard<'_, DryRunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DeviceAdapter for DryRunAdapter {
    fn send(&self, command: &DeviceCommand) -> Result<(), DeviceCommandError> {
        let endpoints = &self.settings.endpoints;
        let mut state = self.lock();

        if !state.reachable {
            warn!("Dropping {}: receiver offline", command);
            return Err(DeviceCommandError::Unreachable(format!(
                "{}:{}",
                endpoints.device_address, endpoints.command_port
            )));
        }

        if let Some(reason) = state.reject_next.take() {
            warn!("Receiver refused {}: {}", command, reason);
            return Err(DeviceCommandError::Rejected {
                command: command.to_string(),
                reason,
            });
        }

        for line in state.encoder.encode(command) {
            info!("{} <- {}", endpoints.device_address, line);
            state.wire.push(mnemonic::to_wire(&line));
        }
        state.commands.push(*command);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ChannelId;

    #[test]
    fn test_records_accepted_commands() {
        let adapter = DryRunAdapter::new(AdapterSettings::default());
        adapter.clear();

        adapter.update_freq(111_500_000.0, ChannelId::new(1)).unwrap();
        adapter.update_samprate(64e6).unwrap();

        assert_eq!(
            adapter.commands(),
            vec![
                DeviceCommand::Frequency {
                    hz: 111_500_000.0,
                    channel: ChannelId::new(1),
                },
                DeviceCommand::SampleRate { hz: 64e6 },
            ]
        );
        assert_eq!(adapter.wire_log()[0], "FRQ1,1,111.500000;\r\n");
    }

    #[test]
    fn test_setup_sequence_logged_on_construction() {
        let adapter = DryRunAdapter::new(AdapterSettings::default());
        let wire = adapter.wire_log();
        assert_eq!(wire.first().map(String::as_str), Some("CFG1;\r\n"));
        assert!(wire.iter().all(|line| line.ends_with(";\r\n")));
        assert!(adapter.commands().is_empty());
    }

    #[test]
    fn test_tuner_outside_initial_outputs_configured_when_routed() {
        let adapter = DryRunAdapter::new(AdapterSettings {
            num_outputs: 2,
            ..Default::default()
        });
        adapter.clear();

        adapter.update_tuners(4, ChannelId::new(1)).unwrap();
        adapter.update_freq(100e6, ChannelId::new(1)).unwrap();

        let wire = adapter.wire_log();
        assert!(wire.contains(&"SIP4,1,192.168.11.61,4991,FF:FF:FF:FF:FF:FF;\r\n".to_string()));
        assert!(wire.contains(&"STE4,1,0;\r\n".to_string()));
        assert_eq!(
            wire.last().map(String::as_str),
            Some("FRQ4,1,100.000000;\r\n")
        );
    }

    #[test]
    fn test_reject_next_only_once() {
        let adapter = DryRunAdapter::new(AdapterSettings::default());
        let ch = ChannelId::new(2);

        adapter.reject_next("busy");
        let err = adapter.update_atten(10, ch).unwrap_err();
        assert_eq!(
            err,
            DeviceCommandError::Rejected {
                command: "update_atten(10, 2)".to_string(),
                reason: "busy".to_string(),
            }
        );
        assert!(adapter.commands().is_empty());

        adapter.update_atten(10, ch).unwrap();
        assert_eq!(adapter.commands().len(), 1);
    }

    #[test]
    fn test_unreachable() {
        let adapter = DryRunAdapter::new(AdapterSettings::default());
        adapter.set_reachable(false);

        let err = adapter.update_preamp(true, ChannelId::new(1)).unwrap_err();
        assert_eq!(
            err,
            DeviceCommandError::Unreachable("192.168.10.50:4991".to_string())
        );

        adapter.set_reachable(true);
        assert!(adapter.update_preamp(true, ChannelId::new(1)).is_ok());
    }
}
