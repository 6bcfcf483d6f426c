//! Environment side of the ramp-metering controller
//!
//! This crate connects an agent to a traffic simulator:
//! - Sensor aggregation into normalized state vectors
//! - Ramp signal actuation with a metering duty cycle
//! - The step-driven control loop producing transitions and episode reports
//! - The uncontrolled calibration run fixing the reward scale
//! - A simulator replaying recorded JSON-lines traces

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod actuator;
pub mod calibration;
pub mod control;
pub mod sensor;
pub mod trace;

pub use actuator::{Actuator, ActuatorConfig};
pub use calibration::{calibrate, CalibrationReport};
pub use control::ControlLoop;
pub use sensor::{SensorAggregator, SensorConfig, DETECTOR_GROUPS};
pub use trace::{TraceFrame, TraceSimulator};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{calibrate, ControlLoop, SensorAggregator, TraceSimulator};
    pub use ramp_rl_core::prelude::*;
}
