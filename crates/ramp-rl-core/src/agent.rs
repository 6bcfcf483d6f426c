//! Agent traits and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{MeterAction, StateVector, Transition};

/// Configuration for agents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Learning rate
    pub learning_rate: f64,
    /// Discount factor
    pub gamma: f64,
    /// Batch size for training
    pub batch_size: usize,
    /// Buffer size for experience replay
    pub buffer_size: usize,
    /// Initial exploration rate
    pub epsilon_start: f64,
    /// Exploration floor
    pub epsilon_min: f64,
    /// Per-episode multiplicative exploration decay
    pub epsilon_decay: f64,
    /// Seed for weight init, exploration and replay sampling
    pub seed: Option<u64>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            learning_rate: 1e-3,
            gamma: 0.99,
            batch_size: 32,
            buffer_size: 2000,
            epsilon_start: 1.0,
            epsilon_min: 0.01,
            epsilon_decay: 0.95,
            seed: None,
        }
    }
}

impl AgentConfig {
    /// Reject settings the training step cannot work with
    pub fn validate(&self) -> crate::Result<()> {
        if self.batch_size == 0 || self.buffer_size < self.batch_size {
            return Err(crate::RLError::Config(format!(
                "buffer_size ({}) must be at least batch_size ({}) and batch_size non-zero",
                self.buffer_size, self.batch_size
            )));
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(crate::RLError::Config(format!(
                "gamma must lie in [0, 1], got {}",
                self.gamma
            )));
        }
        if !(self.learning_rate > 0.0) {
            return Err(crate::RLError::Config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

/// Core agent trait driven by the control loop.
///
/// The loop is synchronous; only checkpoint persistence is async.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Select an action for a freshly flushed state
    fn act(&mut self, state: &StateVector) -> MeterAction;

    /// Store a transition for replay
    fn remember(&mut self, transition: Transition);

    /// Train on a replay sample; `None` when the buffer is not ready yet
    fn replay(&mut self) -> crate::Result<Option<f64>>;

    /// Per-episode bookkeeping (exploration decay)
    fn end_episode(&mut self);

    /// Current exploration rate
    fn epsilon(&self) -> f64;

    /// Whether transitions are stored and trained on
    fn is_training(&self) -> bool;

    /// Save the current value-function parameters
    async fn save(&self, path: &std::path::Path) -> crate::Result<()>;

    /// Load parameters and switch to evaluate-only mode
    async fn load(&mut self, path: &std::path::Path) -> crate::Result<()>;

    /// Get agent metrics
    fn metrics(&self) -> AgentMetrics {
        AgentMetrics::default()
    }
}

/// Agent metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentMetrics {
    /// Actions selected
    pub total_decisions: usize,
    /// Completed episodes
    pub total_episodes: usize,
    /// Training updates that ran
    pub training_updates: usize,
    /// Loss of the latest update
    pub loss: Option<f64>,
}
