//! Neural Q-function with the one-transition-at-a-time Bellman update

use ramp_rl_core::{ActionValueFunction, QValues, Result, StateVector, Transition};

use crate::network::QNetwork;
use crate::optimizer::Optimizer;

/// Q-network plus the optimizer and discount used to train it.
///
/// Bootstrapped targets come from the same network being trained; there is
/// no separate target network.
#[derive(Debug, Clone)]
pub struct NeuralQFunction {
    network: QNetwork,
    optimizer: Optimizer,
    gamma: f64,
}

impl NeuralQFunction {
    /// Wrap a network for training
    #[must_use]
    pub fn new(network: QNetwork, optimizer: Optimizer, gamma: f64) -> Self {
        Self {
            network,
            optimizer,
            gamma,
        }
    }

    /// The underlying network
    #[must_use]
    pub fn network(&self) -> &QNetwork {
        &self.network
    }

    /// Mutable access for loading parameters
    pub fn network_mut(&mut self) -> &mut QNetwork {
        &mut self.network
    }

    /// Discount factor
    #[must_use]
    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    /// Bellman target for one transition
    fn target(&self, transition: &Transition) -> f64 {
        let reward = transition.reward.value();
        if transition.terminal {
            reward
        } else {
            let next = self.evaluate(&transition.next_state);
            reward + self.gamma * next.iter().copied().fold(f64::NEG_INFINITY, f64::max)
        }
    }

    /// Mean squared error between the prediction for `transition.state` and
    /// the target vector built from it, without updating anything
    #[must_use]
    pub fn loss(&self, transition: &Transition) -> f64 {
        let target = self.target(transition);
        let prediction = self.evaluate(&transition.state);
        let index = transition.action.index();
        // only the taken action's entry differs from the prediction
        (prediction[index] - target).powi(2) / prediction.len() as f64
    }
}

impl ActionValueFunction for NeuralQFunction {
    fn evaluate(&self, state: &StateVector) -> QValues {
        let output = self.network.forward(&state.to_array().view());
        let mut values = [0.0; ramp_rl_core::MeterAction::COUNT];
        for (value, out) in values.iter_mut().zip(output.iter()) {
            *value = *out;
        }
        values
    }

    fn train_step(&mut self, batch: &[Transition]) -> Result<f64> {
        if batch.is_empty() {
            return Ok(0.0);
        }

        let mut total_loss = 0.0;
        for transition in batch {
            let target = self.target(transition);

            let cache = self.network.forward_cached(&transition.state.to_array().view());
            let prediction = cache.output();
            let mut target_vec = prediction.clone();
            target_vec[transition.action.index()] = target;

            let n = prediction.len() as f64;
            let diff = prediction - &target_vec;
            total_loss += diff.mapv(|d| d * d).sum() / n;

            let grad = diff * (2.0 / n);
            let grads = self.network.backward(&cache, &grad);
            self.optimizer.step(&mut self.network, &grads);
        }

        Ok(total_loss / batch.len() as f64)
    }
}
