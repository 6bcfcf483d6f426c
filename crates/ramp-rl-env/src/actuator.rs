//! Ramp signal actuation

use serde::{Deserialize, Serialize};

use ramp_rl_core::{MeterAction, RLError, Result, SignalPhase, Simulator};

/// Metering duty cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActuatorConfig {
    /// Steps in one metering cycle
    pub cycle_period: usize,
    /// Leading steps of each cycle that stay free-flow
    pub free_flow_steps: usize,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            cycle_period: 6,
            free_flow_steps: 2,
        }
    }
}

impl ActuatorConfig {
    /// Check the cycle is non-empty and the free-flow share fits in it
    pub fn validate(&self) -> Result<()> {
        if self.cycle_period == 0 || self.free_flow_steps > self.cycle_period {
            return Err(RLError::Config(format!(
                "invalid metering cycle: {} free-flow steps in a period of {}",
                self.free_flow_steps, self.cycle_period
            )));
        }
        Ok(())
    }
}

/// Turns the current action into one signal command per step
#[derive(Debug, Clone)]
pub struct Actuator {
    config: ActuatorConfig,
}

impl Actuator {
    /// Create an actuator for a validated cycle
    pub fn new(config: ActuatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Phase for `action` at the zero-based simulation step
    #[must_use]
    pub fn phase_for(&self, action: MeterAction, step: usize) -> SignalPhase {
        match action {
            MeterAction::Hold => SignalPhase::FreeFlow,
            MeterAction::Meter if step % self.config.cycle_period < self.config.free_flow_steps => {
                SignalPhase::FreeFlow
            }
            MeterAction::Meter => SignalPhase::Restrict,
        }
    }

    /// Command the simulator for this step
    pub fn apply<S: Simulator + ?Sized>(
        &self,
        sim: &mut S,
        action: MeterAction,
        step: usize,
    ) -> Result<SignalPhase> {
        let phase = self.phase_for(action, step);
        sim.set_phase(phase)?;
        Ok(phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SignalPhase::{FreeFlow as F, Restrict as R};

    #[test]
    fn test_meter_duty_cycle() {
        let actuator = Actuator::new(ActuatorConfig::default()).unwrap();
        let phases: Vec<_> = (0..12)
            .map(|step| actuator.phase_for(MeterAction::Meter, step))
            .collect();
        assert_eq!(phases, vec![F, F, R, R, R, R, F, F, R, R, R, R]);
    }

    #[test]
    fn test_hold_is_always_free_flow() {
        let actuator = Actuator::new(ActuatorConfig::default()).unwrap();
        assert!((0..100).all(|step| actuator.phase_for(MeterAction::Hold, step) == F));
    }

    #[test]
    fn test_rejects_empty_cycle() {
        let config = ActuatorConfig {
            cycle_period: 0,
            free_flow_steps: 0,
        };
        assert!(Actuator::new(config).is_err());
    }
}
