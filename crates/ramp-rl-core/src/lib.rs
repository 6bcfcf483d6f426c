//! Core types and traits for the ramp-metering RL controller
//!
//! This crate holds the shared vocabulary of the controller: the state
//! vector, metering actions, transitions, the calibrated reward model and
//! the traits that agents, value functions, policies and simulators
//! implement.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod action;
pub mod agent;
pub mod environment;
pub mod error;
pub mod policy;
pub mod reward;
pub mod state;
pub mod trajectory;
pub mod value;

// Re-export core traits and types
pub use action::{DiscreteSpace, MeterAction};
pub use agent::{Agent, AgentConfig, AgentMetrics};
pub use environment::{
    ControlConfig, GroupReading, LoopReading, SensorFrame, SignalPhase, Simulator,
};
pub use error::{RLError, Result};
pub use policy::{EpsilonGreedy, Policy};
pub use reward::{CalibrationConstants, Reward, RewardFunction, RewardModel};
pub use state::{StateVector, STATE_DIM};
pub use trajectory::{EpisodeHistory, EpisodeReport, Transition};
pub use value::{greedy, ActionValueFunction, QValues};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        ActionValueFunction, Agent, MeterAction, Policy, Result, Reward, RewardFunction,
        SignalPhase, Simulator, StateVector, Transition,
    };
}
