//! Reward signals and the calibrated load-based reward model

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::{RLError, Result};

/// Reward signal for one control interval
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Reward(pub f64);

impl Reward {
    /// Create a new reward
    #[must_use]
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    /// Get the reward value
    #[must_use]
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl From<f64> for Reward {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl From<Reward> for f64 {
    fn from(reward: Reward) -> Self {
        reward.0
    }
}

impl std::ops::Add for Reward {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self(self.0 + other.0)
    }
}

impl std::ops::AddAssign for Reward {
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

/// Trait for turning an interval's load metric into a reward
pub trait RewardFunction: Send + Sync {
    /// Reward for the interval that accumulated `load_metric`
    fn reward_for(&self, load_metric: f64) -> Reward;
}

/// Reward scale fixed by an uncontrolled baseline run.
///
/// `alpha` is the worst (maximum) per-interval load seen under no control and
/// `beta` the average one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConstants {
    /// Maximum baseline load per interval
    pub alpha: f64,
    /// Mean baseline load per interval
    pub beta: f64,
}

impl CalibrationConstants {
    /// Create and validate a constant pair
    pub fn new(alpha: f64, beta: f64) -> Result<Self> {
        let constants = Self { alpha, beta };
        constants.validate()?;
        Ok(constants)
    }

    /// Derive the constants from per-interval baseline loads
    pub fn from_baseline(interval_loads: &[f64]) -> Result<Self> {
        if interval_loads.is_empty() {
            return Err(RLError::Config(
                "calibration produced no complete control interval".to_string(),
            ));
        }
        let alpha = Statistics::max(interval_loads.iter());
        let beta = Statistics::mean(interval_loads.iter());
        tracing::debug!(alpha, beta, intervals = interval_loads.len(), "derived calibration constants");
        Self::new(alpha, beta)
    }

    /// Check that both constants are usable as a reward scale
    pub fn validate(&self) -> Result<()> {
        if !self.alpha.is_finite() || !self.beta.is_finite() {
            return Err(RLError::Config(format!(
                "calibration constants must be finite (alpha={}, beta={})",
                self.alpha, self.beta
            )));
        }
        if self.beta <= 0.0 {
            return Err(RLError::Config(format!(
                "calibration beta must be positive, got {}",
                self.beta
            )));
        }
        Ok(())
    }
}

/// Reference constants from the shipped scenario's baseline run
impl Default for CalibrationConstants {
    fn default() -> Self {
        Self {
            alpha: 5601.0,
            beta: 4238.26,
        }
    }
}

/// Maps interval load to `clamp((alpha - load) / beta, -1, 1)`
#[derive(Debug, Clone, Copy)]
pub struct RewardModel {
    constants: CalibrationConstants,
}

impl RewardModel {
    /// Create a reward model from validated constants
    pub fn new(constants: CalibrationConstants) -> Result<Self> {
        constants.validate()?;
        Ok(Self { constants })
    }

    /// The constants this model was built with
    #[must_use]
    pub fn constants(&self) -> CalibrationConstants {
        self.constants
    }
}

impl RewardFunction for RewardModel {
    fn reward_for(&self, load_metric: f64) -> Reward {
        let CalibrationConstants { alpha, beta } = self.constants;
        Reward(((alpha - load_metric) / beta).clamp(-1.0, 1.0))
    }
}
