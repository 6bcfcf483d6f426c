//! Simulator boundary: raw sensor frames, signal phases and loop configuration

use serde::{Deserialize, Serialize};

use crate::{RLError, Result};

/// Signal state commanded to the ramp traffic light each step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalPhase {
    /// Green, vehicles released
    FreeFlow,
    /// Red, vehicles held on the ramp
    Restrict,
}

/// One induction loop's reading for the last simulation step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoopReading {
    /// Mean speed in m/s; negative when no vehicle passed
    pub mean_speed: f64,
    /// Occupancy percentage
    pub occupancy: f64,
    /// Vehicles that crossed the loop during the step
    pub vehicle_count: u32,
}

impl LoopReading {
    /// Speed reported by loops that saw no vehicle
    pub const NO_VEHICLE: f64 = -1.0;

    /// Create a loop reading
    #[must_use]
    pub fn new(mean_speed: f64, occupancy: f64, vehicle_count: u32) -> Self {
        Self {
            mean_speed,
            occupancy,
            vehicle_count,
        }
    }

    /// Whether the speed is a real measurement rather than the sentinel
    #[must_use]
    pub fn has_speed(&self) -> bool {
        self.mean_speed.is_finite() && self.mean_speed >= 0.0
    }
}

/// Readings from every lane of one detector group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupReading {
    /// One entry per lane
    pub loops: Vec<LoopReading>,
}

impl GroupReading {
    /// Same reading on every lane
    #[must_use]
    pub fn uniform(lanes: usize, reading: LoopReading) -> Self {
        Self {
            loops: vec![reading; lanes],
        }
    }
}

/// Everything the controller reads from the simulator in one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorFrame {
    /// Detector groups, upstream to downstream
    pub groups: Vec<GroupReading>,
    /// Halting vehicles on each of the two ramp lanes
    pub ramp_queue: [f64; 2],
}

impl SensorFrame {
    /// Mean halting count over the ramp lanes
    #[must_use]
    pub fn queue_length(&self) -> f64 {
        (self.ramp_queue[0] + self.ramp_queue[1]) / 2.0
    }
}

/// The external traffic simulator, advanced in lock-step with the controller
pub trait Simulator {
    /// Start (or restart) an episode
    fn reset(&mut self) -> Result<()>;

    /// Sensor readings for the current step
    fn read_sensors(&mut self) -> Result<SensorFrame>;

    /// Command the ramp signal for the current step
    fn set_phase(&mut self, phase: SignalPhase) -> Result<()>;

    /// Advance the simulation by one step
    fn step(&mut self) -> Result<()>;

    /// Vehicles still in the system (network plus insertion backlog)
    fn load_metric(&mut self) -> Result<f64>;

    /// Release simulator resources
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Configuration of the step-driven control loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Simulation steps between decisions
    pub control_interval: usize,
    /// Simulation steps per episode
    pub max_steps: usize,
    /// Flag the transition stored at the final step as terminal
    pub terminal_on_episode_end: bool,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            control_interval: 15,
            max_steps: 3600,
            terminal_on_episode_end: false,
        }
    }
}

impl ControlConfig {
    /// Check the interval and step budget
    pub fn validate(&self) -> Result<()> {
        if self.control_interval == 0 {
            return Err(RLError::Config("control_interval must be non-zero".to_string()));
        }
        if self.max_steps < self.control_interval {
            return Err(RLError::Config(format!(
                "max_steps ({}) is shorter than one control interval ({})",
                self.max_steps, self.control_interval
            )));
        }
        Ok(())
    }

    /// Whether the 1-based completed-step count closes a control interval
    #[must_use]
    pub fn is_boundary(&self, completed_steps: usize) -> bool {
        completed_steps > 0 && completed_steps % self.control_interval == 0
    }
}
