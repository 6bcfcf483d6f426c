// Layered configuration for rampctl

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use ramp_rl_agent::DQNConfig;
use ramp_rl_core::{CalibrationConstants, ControlConfig};
use ramp_rl_env::{ActuatorConfig, SensorConfig};

/// Everything a run needs, loadable from one JSON file.
/// Missing sections and fields fall back to the reference defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RampConfig {
    pub agent: DQNConfig,
    pub control: ControlConfig,
    pub sensor: SensorConfig,
    pub actuator: ActuatorConfig,
    pub calibration: CalibrationConstants,
}

impl RampConfig {
    /// Read `path`, or use the defaults when no file is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Replace the reward constants with command-line values where given
    pub fn override_calibration(&mut self, alpha: Option<f64>, beta: Option<f64>) -> Result<()> {
        let alpha = alpha.unwrap_or(self.calibration.alpha);
        let beta = beta.unwrap_or(self.calibration.beta);
        self.calibration =
            CalibrationConstants::new(alpha, beta).context("Invalid calibration constants")?;
        Ok(())
    }
}
