//! Gradient-descent optimizers for the Q-network

use ndarray::{Array1, Array2, Zip};
use serde::{Deserialize, Serialize};

use crate::network::{Gradients, QNetwork};

/// Optimizer selection and hyperparameters (the learning rate lives in
/// [`ramp_rl_core::AgentConfig`])
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OptimizerKind {
    /// Plain stochastic gradient descent
    Sgd,
    /// Adam with bias-corrected moment estimates
    Adam {
        /// First-moment decay
        beta1: f64,
        /// Second-moment decay
        beta2: f64,
        /// Denominator fuzz
        epsilon: f64,
    },
}

impl Default for OptimizerKind {
    fn default() -> Self {
        Self::Adam {
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
        }
    }
}

#[derive(Debug, Clone)]
struct Moments {
    weights: Vec<Array2<f64>>,
    biases: Vec<Array1<f64>>,
}

impl Moments {
    fn zeros_like(grads: &Gradients) -> Self {
        Self {
            weights: grads.weights.iter().map(|g| Array2::zeros(g.raw_dim())).collect(),
            biases: grads.biases.iter().map(|g| Array1::zeros(g.raw_dim())).collect(),
        }
    }
}

/// Stateful optimizer applying one update per call to [`Optimizer::step`]
#[derive(Debug, Clone)]
pub struct Optimizer {
    kind: OptimizerKind,
    learning_rate: f64,
    /// Adam first and second moments, created on the first step
    moments: Option<(Moments, Moments)>,
    /// Updates applied so far
    t: i32,
}

impl Optimizer {
    /// Create an optimizer
    #[must_use]
    pub fn new(kind: OptimizerKind, learning_rate: f64) -> Self {
        Self {
            kind,
            learning_rate,
            moments: None,
            t: 0,
        }
    }

    /// Learning rate
    #[must_use]
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Number of updates applied
    #[must_use]
    pub fn steps(&self) -> i32 {
        self.t
    }

    /// Apply one descent step to `network`
    pub fn step(&mut self, network: &mut QNetwork, grads: &Gradients) {
        self.t = self.t.saturating_add(1);
        let lr = self.learning_rate;

        match self.kind {
            OptimizerKind::Sgd => {
                for ((w, b), (gw, gb)) in network
                    .layers_mut()
                    .zip(grads.weights.iter().zip(&grads.biases))
                {
                    w.scaled_add(-lr, gw);
                    b.scaled_add(-lr, gb);
                }
            }
            OptimizerKind::Adam {
                beta1,
                beta2,
                epsilon,
            } => {
                let (m, v) = self
                    .moments
                    .get_or_insert_with(|| (Moments::zeros_like(grads), Moments::zeros_like(grads)));
                let correction1 = 1.0 - beta1.powi(self.t);
                let correction2 = 1.0 - beta2.powi(self.t);

                let update = |param: f64, m: &mut f64, v: &mut f64, g: f64| {
                    *m = beta1 * *m + (1.0 - beta1) * g;
                    *v = beta2 * *v + (1.0 - beta2) * g * g;
                    let m_hat = *m / correction1;
                    let v_hat = *v / correction2;
                    param - lr * m_hat / (v_hat.sqrt() + epsilon)
                };

                for (i, (w, b)) in network.layers_mut().enumerate() {
                    Zip::from(w)
                        .and(&mut m.weights[i])
                        .and(&mut v.weights[i])
                        .and(&grads.weights[i])
                        .for_each(|p, m, v, &g| *p = update(*p, m, v, g));
                    Zip::from(b)
                        .and(&mut m.biases[i])
                        .and(&mut v.biases[i])
                        .and(&grads.biases[i])
                        .for_each(|p, m, v, &g| *p = update(*p, m, v, g));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::NetworkConfig;
    use approx::assert_abs_diff_eq;
    use ndarray::Array1;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn squared_output(net: &QNetwork, x: &Array1<f64>) -> f64 {
        net.forward(&x.view()).mapv(|v| v * v).sum()
    }

    fn descend(kind: OptimizerKind) -> (f64, f64) {
        let mut rng = StdRng::seed_from_u64(11);
        let mut net = QNetwork::new(NetworkConfig::default(), &mut rng).unwrap();
        let x = Array1::from_elem(net.config().input_dim, 0.5);
        let mut opt = Optimizer::new(kind, 1e-3);

        let before = squared_output(&net, &x);
        for _ in 0..20 {
            let cache = net.forward_cached(&x.view());
            let grad = cache.output() * 2.0;
            let grads = net.backward(&cache, &grad);
            opt.step(&mut net, &grads);
        }
        (before, squared_output(&net, &x))
    }

    #[test]
    fn test_sgd_reduces_loss() {
        let (before, after) = descend(OptimizerKind::Sgd);
        assert!(after < before, "{after} >= {before}");
    }

    #[test]
    fn test_adam_reduces_loss() {
        let (before, after) = descend(OptimizerKind::default());
        assert!(after < before, "{after} >= {before}");
    }

    #[test]
    fn test_first_adam_step_is_learning_rate_sized() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut net = QNetwork::new(NetworkConfig::default(), &mut rng).unwrap();
        let before = net.parameters();
        let x = Array1::from_elem(net.config().input_dim, 1.0);
        let cache = net.forward_cached(&x.view());
        let grads = net.backward(&cache, &Array1::ones(2));

        let mut opt = Optimizer::new(OptimizerKind::default(), 1e-3);
        opt.step(&mut net, &grads);
        assert_eq!(opt.steps(), 1);

        // output bias gradient is 1, so bias-corrected Adam moves it by ~lr
        let after = net.parameters();
        let last = after.biases.len() - 1;
        assert_abs_diff_eq!(before.biases[last][0] - after.biases[last][0], 1e-3, epsilon = 1e-9);
    }
}
