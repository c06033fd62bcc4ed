//! Application configuration for the `eso_safety` binary.
//!
//! One TOML file carries the shared service settings, the system
//! configuration handed to `init()` and the per-channel wiring:
//!
//! ```toml
//! [shared]
//! service_name = "eso-safety-01"
//!
//! [system]
//! safety_category = 3
//!
//! [[inputs]]
//! channel = 0
//! input_type = "emergency_stop"
//! dual_channel = true
//! channel_a_pin = 10
//! channel_b_pin = 11
//!
//! [[outputs]]
//! channel = 0
//! output_type = "door_lock"
//! relay_pin = 20
//! feedback_pin = 21
//! ```

use std::collections::HashSet;

use eso_common::clock::Clock;
use eso_common::config::{ConfigError, SharedConfig, Validate};
use eso_common::consts::{SAFETY_INPUT_CHANNELS, SAFETY_OUTPUT_CHANNELS};
use eso_common::hal::SafetyHal;
use eso_common::safety::{SafetyError, SafetyInputConfig, SafetyOutputConfig, SafetySystemConfig};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::supervisor::SafetySupervisor;

/// One `[[inputs]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputEntry {
    pub channel: u8,
    #[serde(flatten)]
    pub config: SafetyInputConfig,
}

/// One `[[outputs]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputEntry {
    pub channel: u8,
    #[serde(flatten)]
    pub config: SafetyOutputConfig,
}

/// Complete safety application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyAppConfig {
    pub shared: SharedConfig,
    #[serde(default)]
    pub system: SafetySystemConfig,
    #[serde(default)]
    pub inputs: Vec<InputEntry>,
    #[serde(default)]
    pub outputs: Vec<OutputEntry>,
}

fn invalid(what: &str, err: SafetyError) -> ConfigError {
    ConfigError::ValidationError(format!("{what}: {err}"))
}

impl Validate for SafetyAppConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.system.validate().map_err(|e| invalid("system", e))?;

        let category = self.system.safety_category;
        let mut seen = HashSet::new();
        for entry in &self.inputs {
            if entry.channel as usize >= SAFETY_INPUT_CHANNELS {
                return Err(ConfigError::ValidationError(format!(
                    "input channel {} out of range (max {})",
                    entry.channel, SAFETY_INPUT_CHANNELS
                )));
            }
            if !seen.insert(entry.channel) {
                return Err(ConfigError::ValidationError(format!(
                    "input channel {} configured twice",
                    entry.channel
                )));
            }
            entry
                .config
                .validate()
                .map_err(|e| invalid(&format!("input {}", entry.channel), e))?;
            let cfg = &entry.config;
            if cfg.enabled && cfg.input_type.requires_dual_channel(category) && !cfg.dual_channel {
                return Err(ConfigError::ValidationError(format!(
                    "input {}: {:?} must be dual-channel at category {category}",
                    entry.channel, cfg.input_type
                )));
            }
        }

        seen.clear();
        for entry in &self.outputs {
            if entry.channel as usize >= SAFETY_OUTPUT_CHANNELS {
                return Err(ConfigError::ValidationError(format!(
                    "output channel {} out of range (max {})",
                    entry.channel, SAFETY_OUTPUT_CHANNELS
                )));
            }
            if !seen.insert(entry.channel) {
                return Err(ConfigError::ValidationError(format!(
                    "output channel {} configured twice",
                    entry.channel
                )));
            }
            entry
                .config
                .validate(category)
                .map_err(|e| invalid(&format!("output {}", entry.channel), e))?;
        }
        Ok(())
    }
}

impl SafetyAppConfig {
    /// Initialize `supervisor` and configure every listed channel.
    pub fn apply<H: SafetyHal, C: Clock>(
        &self,
        supervisor: &mut SafetySupervisor<H, C>,
    ) -> Result<(), SafetyError> {
        supervisor.init(self.system.clone())?;
        for entry in &self.inputs {
            supervisor.configure_input(entry.channel, entry.config.clone())?;
        }
        for entry in &self.outputs {
            supervisor.configure_output(entry.channel, entry.config.clone())?;
        }
        info!(
            "Applied configuration '{}': {} inputs, {} outputs",
            self.shared.service_name,
            self.inputs.len(),
            self.outputs.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eso_common::clock::ManualClock;
    use eso_common::config::ConfigLoader;
    use eso_common::safety::{InputType, OutputType, SafetyState};
    use eso_hal::SimulatedSafetyHal;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[shared]
service_name = "eso-safety-test"
log_level = "debug"

[system]
watchdog_timeout_ms = 400
safety_category = 3

[[inputs]]
channel = 0
input_type = "emergency_stop"
dual_channel = true
channel_a_pin = 10
channel_b_pin = 11
description = "front e-stop"

[[inputs]]
channel = 2
input_type = "door_sensor"
channel_a_pin = 14
debounce_time_ms = 50

[[outputs]]
channel = 0
output_type = "door_lock"
relay_pin = 20
feedback_pin = 21
"#;

    fn write_temp(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{content}").unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn sample_loads_and_validates() {
        let file = write_temp(SAMPLE);
        let cfg = SafetyAppConfig::load_validated(file.path()).unwrap();
        assert_eq!(cfg.system.watchdog_timeout_ms, 400);
        assert_eq!(cfg.system.test_pulse_interval_ms, 100);
        assert_eq!(cfg.inputs.len(), 2);
        assert_eq!(cfg.inputs[0].config.input_type, InputType::EmergencyStop);
        assert!(cfg.inputs[0].config.enabled);
        assert_eq!(cfg.inputs[0].config.description.as_str(), "front e-stop");
        assert_eq!(cfg.inputs[1].config.debounce_time_ms, 50);
        assert!(cfg.inputs[1].config.normally_closed);
        assert_eq!(cfg.outputs[0].config.output_type, OutputType::DoorLock);
    }

    #[test]
    fn missing_file_is_reported() {
        let err = SafetyAppConfig::load(std::path::Path::new("/nonexistent/safety.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound));
    }

    #[test]
    fn duplicate_and_out_of_range_channels_are_rejected() {
        let mut cfg = SafetyAppConfig::from_toml(SAMPLE).unwrap();
        cfg.inputs[1].channel = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::ValidationError(_))));

        let mut cfg = SafetyAppConfig::from_toml(SAMPLE).unwrap();
        cfg.outputs[0].channel = 4;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn single_channel_estop_rejected_at_category_3() {
        let mut cfg = SafetyAppConfig::from_toml(SAMPLE).unwrap();
        cfg.inputs[0].config.dual_channel = false;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("dual-channel"));

        cfg.system.safety_category = 2;
        cfg.validate().unwrap();
    }

    #[test]
    fn apply_configures_supervisor() {
        let cfg = SafetyAppConfig::from_toml(SAMPLE).unwrap();
        let mut sup = SafetySupervisor::new(SimulatedSafetyHal::new(), ManualClock::new());
        cfg.apply(&mut sup).unwrap();

        assert_eq!(sup.state(), SafetyState::Safe);
        assert_eq!(sup.config().watchdog_timeout_ms, 400);
        assert!(sup.input_config(0).unwrap().dual_channel);
        assert!(sup.output_config(0).unwrap().enabled);
        assert!(!sup.output_config(1).unwrap().enabled);
    }
}
