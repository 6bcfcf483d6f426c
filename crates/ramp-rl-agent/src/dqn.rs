//! Deep Q-Network (DQN) agent implementation

use async_trait::async_trait;
use metrics::{counter, gauge, histogram};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use ramp_rl_core::{
    ActionValueFunction, Agent, AgentConfig, AgentMetrics, EpsilonGreedy, MeterAction, Policy,
    RLError, Result, StateVector, Transition, STATE_DIM,
};

use crate::buffer::ReplayBuffer;
use crate::checkpoint::{Checkpoint, CheckpointMetadata};
use crate::network::{NetworkConfig, QNetwork};
use crate::optimizer::{Optimizer, OptimizerKind};
use crate::qfunction::NeuralQFunction;

/// DQN-specific configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DQNConfig {
    /// Base agent configuration
    #[serde(flatten)]
    pub base: AgentConfig,
    /// Q-network layout
    pub network: NetworkConfig,
    /// Optimizer used for the Bellman updates
    pub optimizer: OptimizerKind,
}

impl DQNConfig {
    /// Check the agent settings and that the network maps states to actions
    pub fn validate(&self) -> Result<()> {
        self.base.validate()?;
        if self.network.input_dim != STATE_DIM {
            return Err(RLError::DimensionMismatch {
                expected: STATE_DIM,
                actual: self.network.input_dim,
            });
        }
        if self.network.output_dim != MeterAction::COUNT {
            return Err(RLError::DimensionMismatch {
                expected: MeterAction::COUNT,
                actual: self.network.output_dim,
            });
        }
        Ok(())
    }
}

/// DQN agent: epsilon-greedy over a neural Q-function trained from replay
pub struct DQNAgent {
    config: DQNConfig,
    q: NeuralQFunction,
    buffer: ReplayBuffer<Transition>,
    policy: EpsilonGreedy,
    rng: StdRng,
    training: bool,
    metrics: AgentMetrics,
}

impl DQNAgent {
    /// Create a new DQN agent
    pub fn new(config: DQNConfig) -> Result<Self> {
        config.validate()?;

        let mut rng = match config.base.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let network = QNetwork::new(config.network.clone(), &mut rng)?;
        let optimizer = Optimizer::new(config.optimizer, config.base.learning_rate);
        let q = NeuralQFunction::new(network, optimizer, config.base.gamma);
        let policy = EpsilonGreedy::new(
            config.base.epsilon_start,
            config.base.epsilon_decay,
            config.base.epsilon_min,
        );

        info!(
            parameters = q.network().num_parameters(),
            buffer_size = config.base.buffer_size,
            "created DQN agent"
        );

        Ok(Self {
            buffer: ReplayBuffer::new(config.base.buffer_size),
            config,
            q,
            policy,
            rng,
            training: true,
            metrics: AgentMetrics::default(),
        })
    }

    /// Create an evaluate-only agent from a saved checkpoint
    pub async fn from_checkpoint(config: DQNConfig, path: &Path) -> Result<Self> {
        let mut agent = Self::new(config)?;
        agent.load(path).await?;
        Ok(agent)
    }

    /// Stop storing and training; act greedily from now on
    pub fn set_evaluation_mode(&mut self) {
        self.training = false;
        self.policy = EpsilonGreedy::greedy();
    }

    /// Snapshot of the current parameters with training context
    #[must_use]
    pub fn checkpoint(&self, score: Option<f64>) -> Checkpoint {
        Checkpoint::new(
            self.q.network().parameters(),
            CheckpointMetadata {
                episode: self.metrics.total_episodes,
                score,
                config: self.config.clone(),
            },
        )
    }

    /// Agent configuration
    #[must_use]
    pub fn config(&self) -> &DQNConfig {
        &self.config
    }

    /// Replay memory
    #[must_use]
    pub fn buffer(&self) -> &ReplayBuffer<Transition> {
        &self.buffer
    }

    /// Value function being trained
    #[must_use]
    pub fn q_function(&self) -> &NeuralQFunction {
        &self.q
    }
}

#[async_trait]
impl Agent for DQNAgent {
    fn act(&mut self, state: &StateVector) -> MeterAction {
        let action = self.policy.select_action(&self.q, state, &mut self.rng);
        self.metrics.total_decisions += 1;
        counter!("ramp_agent_decisions_total", 1);
        action
    }

    fn remember(&mut self, transition: Transition) {
        if self.training {
            self.buffer.push(transition);
        }
    }

    fn replay(&mut self) -> Result<Option<f64>> {
        let batch_size = self.config.base.batch_size;
        if !self.training || !self.buffer.is_ready(batch_size) {
            return Ok(None);
        }

        let batch = self.buffer.sample(batch_size, &mut self.rng)?;
        let loss = self.q.train_step(&batch)?;

        self.metrics.training_updates += 1;
        self.metrics.loss = Some(loss);
        counter!("ramp_agent_training_updates_total", 1);
        histogram!("ramp_agent_loss", loss);
        debug!(loss, buffer = self.buffer.len(), "replay update");
        Ok(Some(loss))
    }

    fn end_episode(&mut self) {
        if self.training {
            self.policy.decay();
        }
        self.metrics.total_episodes += 1;
        gauge!("ramp_agent_epsilon", self.policy.epsilon());
        debug!(
            episode = self.metrics.total_episodes,
            epsilon = self.policy.epsilon(),
            "episode finished"
        );
    }

    fn epsilon(&self) -> f64 {
        self.policy.epsilon()
    }

    fn is_training(&self) -> bool {
        self.training
    }

    async fn save(&self, path: &Path) -> Result<()> {
        self.checkpoint(None).save(path).await
    }

    async fn load(&mut self, path: &Path) -> Result<()> {
        let checkpoint = Checkpoint::load(path).await?;
        self.q.network_mut().set_parameters(checkpoint.parameters)?;
        self.set_evaluation_mode();
        info!(
            path = %path.display(),
            id = %checkpoint.id,
            episode = checkpoint.metadata.episode,
            "loaded checkpoint"
        );
        Ok(())
    }

    fn metrics(&self) -> AgentMetrics {
        self.metrics.clone()
    }
}
