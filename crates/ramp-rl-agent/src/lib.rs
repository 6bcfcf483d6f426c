//! DQN agent for the ramp-metering controller
//!
//! This crate provides the learning side of the controller:
//! - A feed-forward Q-network with manual backpropagation
//! - SGD and Adam optimizers
//! - A FIFO experience replay buffer
//! - The DQN agent tying them to epsilon-greedy exploration
//! - JSON checkpoints of the trained parameters

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod buffer;
pub mod checkpoint;
pub mod dqn;
pub mod network;
pub mod optimizer;
pub mod qfunction;

// Re-export agents
pub use dqn::{DQNAgent, DQNConfig};

// Re-export components
pub use buffer::ReplayBuffer;
pub use checkpoint::{Checkpoint, CheckpointMetadata};
pub use network::{Activation, NetworkConfig, NetworkParameters, QNetwork};
pub use optimizer::{Optimizer, OptimizerKind};
pub use qfunction::NeuralQFunction;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{DQNAgent, DQNConfig, ReplayBuffer};
    pub use ramp_rl_core::prelude::*;
}
