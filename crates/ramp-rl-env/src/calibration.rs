//! Uncontrolled baseline run fixing the reward scale

use serde::{Deserialize, Serialize};
use tracing::info;

use ramp_rl_core::{CalibrationConstants, ControlConfig, Result, SignalPhase, Simulator};

/// Outcome of a baseline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    /// Derived reward constants
    pub constants: CalibrationConstants,
    /// Accumulated load of every complete control interval
    pub interval_loads: Vec<f64>,
}

/// Run one free-flow episode and derive alpha (max) and beta (mean) from the
/// per-interval loads, using the control loop's boundary rule
pub fn calibrate<S: Simulator + ?Sized>(
    sim: &mut S,
    config: &ControlConfig,
) -> Result<CalibrationReport> {
    config.validate()?;
    sim.reset()?;

    let mut interval_loads = Vec::with_capacity(config.max_steps / config.control_interval);
    let mut interval_load = 0.0;
    for step in 1..=config.max_steps {
        sim.set_phase(SignalPhase::FreeFlow)?;
        sim.step()?;
        interval_load += sim.load_metric()?;
        if config.is_boundary(step) {
            interval_loads.push(interval_load);
            interval_load = 0.0;
        }
    }

    let constants = CalibrationConstants::from_baseline(&interval_loads)?;
    info!(
        alpha = constants.alpha,
        beta = constants.beta,
        intervals = interval_loads.len(),
        "calibration complete"
    );
    Ok(CalibrationReport {
        constants,
        interval_loads,
    })
}
