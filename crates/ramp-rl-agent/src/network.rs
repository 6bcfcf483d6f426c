//! Feed-forward Q-network
//!
//! A small multi-layer perceptron over ndarray: hidden layers with a shared
//! activation and a linear output layer with one unit per action. Besides
//! the forward pass it exposes the cached forward pass and backpropagation
//! needed for a single-sample gradient step.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

use ramp_rl_core::{MeterAction, RLError, Result, STATE_DIM};

/// Hidden-layer activation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    /// Rectified linear unit
    Relu,
    /// Hyperbolic tangent
    Tanh,
}

impl Activation {
    fn apply(self, x: &Array1<f64>) -> Array1<f64> {
        match self {
            Self::Relu => x.mapv(|v| v.max(0.0)),
            Self::Tanh => x.mapv(f64::tanh),
        }
    }

    /// Derivative with respect to the pre-activation
    fn derivative(self, z: &Array1<f64>) -> Array1<f64> {
        match self {
            Self::Relu => z.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }),
            Self::Tanh => z.mapv(|v| 1.0 - v.tanh().powi(2)),
        }
    }
}

/// Q-network layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Input dimension
    pub input_dim: usize,
    /// Hidden layer sizes
    pub hidden_dims: Vec<usize>,
    /// Output dimension (one unit per action)
    pub output_dim: usize,
    /// Hidden activation
    pub activation: Activation,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            input_dim: STATE_DIM,
            hidden_dims: vec![64, 64],
            output_dim: MeterAction::COUNT,
            activation: Activation::Relu,
        }
    }
}

/// Per-layer gradients, shaped like the network parameters
#[derive(Debug, Clone)]
pub struct Gradients {
    /// Weight gradients per layer
    pub weights: Vec<Array2<f64>>,
    /// Bias gradients per layer
    pub biases: Vec<Array1<f64>>,
}

/// Intermediate values of one forward pass
#[derive(Debug, Clone)]
pub struct ForwardCache {
    /// Layer inputs; the last entry is the network output
    activations: Vec<Array1<f64>>,
    /// Pre-activations of every layer
    pre_activations: Vec<Array1<f64>>,
}

impl ForwardCache {
    /// Network output of the cached pass
    #[must_use]
    pub fn output(&self) -> &Array1<f64> {
        &self.activations[self.activations.len() - 1]
    }
}

/// Serializable network parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkParameters {
    /// Layout the parameters belong to
    pub config: NetworkConfig,
    /// Weights for each layer, shaped `(in, out)`
    pub weights: Vec<Array2<f64>>,
    /// Biases for each layer
    pub biases: Vec<Array1<f64>>,
}

impl NetworkParameters {
    /// Total number of weights and biases
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.weights.iter().map(Array2::len).sum::<usize>()
            + self.biases.iter().map(Array1::len).sum::<usize>()
    }
}

/// Multi-layer perceptron mapping a state to per-action values
#[derive(Debug, Clone)]
pub struct QNetwork {
    config: NetworkConfig,
    /// Weights for each layer
    weights: Vec<Array2<f64>>,
    /// Biases for each layer
    biases: Vec<Array1<f64>>,
}

impl QNetwork {
    /// Create a network with Xavier-uniform weights and zero biases
    pub fn new<R: Rng + ?Sized>(config: NetworkConfig, rng: &mut R) -> Result<Self> {
        if config.input_dim == 0 || config.output_dim == 0 || config.hidden_dims.contains(&0) {
            return Err(RLError::Config(format!(
                "network layers must be non-empty: {config:?}"
            )));
        }

        let mut weights = Vec::with_capacity(config.hidden_dims.len() + 1);
        let mut biases = Vec::with_capacity(config.hidden_dims.len() + 1);

        let mut prev_dim = config.input_dim;
        for &dim in config.hidden_dims.iter().chain(std::iter::once(&config.output_dim)) {
            weights.push(Self::xavier_init(prev_dim, dim, rng));
            biases.push(Array1::zeros(dim));
            prev_dim = dim;
        }

        Ok(Self {
            config,
            weights,
            biases,
        })
    }

    /// Xavier initialization for weights
    fn xavier_init<R: Rng + ?Sized>(in_dim: usize, out_dim: usize, rng: &mut R) -> Array2<f64> {
        let limit = (6.0 / (in_dim + out_dim) as f64).sqrt();
        let dist = Uniform::new(-limit, limit);
        Array2::from_shape_fn((in_dim, out_dim), |_| dist.sample(rng))
    }

    /// Layout of this network
    #[must_use]
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Forward pass
    #[must_use]
    pub fn forward(&self, input: &ArrayView1<f64>) -> Array1<f64> {
        let last = self.weights.len() - 1;
        let mut hidden = input.to_owned();
        for (i, (w, b)) in self.weights.iter().zip(&self.biases).enumerate() {
            let z = hidden.dot(w) + b;
            hidden = if i == last { z } else { self.config.activation.apply(&z) };
        }
        hidden
    }

    /// Forward pass keeping what backpropagation needs
    #[must_use]
    pub fn forward_cached(&self, input: &ArrayView1<f64>) -> ForwardCache {
        let last = self.weights.len() - 1;
        let mut activations = Vec::with_capacity(self.weights.len() + 1);
        let mut pre_activations = Vec::with_capacity(self.weights.len());
        activations.push(input.to_owned());

        for (i, (w, b)) in self.weights.iter().zip(&self.biases).enumerate() {
            let z = activations[i].dot(w) + b;
            let a = if i == last { z.clone() } else { self.config.activation.apply(&z) };
            pre_activations.push(z);
            activations.push(a);
        }

        ForwardCache {
            activations,
            pre_activations,
        }
    }

    /// Gradients of a loss given its derivative with respect to the output
    #[must_use]
    pub fn backward(&self, cache: &ForwardCache, output_grad: &Array1<f64>) -> Gradients {
        let layers = self.weights.len();
        let mut weight_grads = Vec::with_capacity(layers);
        let mut bias_grads = Vec::with_capacity(layers);

        let mut delta = output_grad.clone();
        for i in (0..layers).rev() {
            let input = cache.activations[i].view().insert_axis(Axis(1));
            weight_grads.push(input.dot(&delta.view().insert_axis(Axis(0))));
            bias_grads.push(delta.clone());

            if i > 0 {
                delta = self.weights[i].dot(&delta)
                    * self.config.activation.derivative(&cache.pre_activations[i - 1]);
            }
        }

        weight_grads.reverse();
        bias_grads.reverse();
        Gradients {
            weights: weight_grads,
            biases: bias_grads,
        }
    }

    /// Each layer's weights and biases, input layer first
    pub(crate) fn layers_mut(
        &mut self,
    ) -> impl Iterator<Item = (&mut Array2<f64>, &mut Array1<f64>)> + '_ {
        self.weights.iter_mut().zip(self.biases.iter_mut())
    }

    /// Total number of weights and biases
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.weights.iter().map(Array2::len).sum::<usize>()
            + self.biases.iter().map(Array1::len).sum::<usize>()
    }

    /// Snapshot of the parameters
    #[must_use]
    pub fn parameters(&self) -> NetworkParameters {
        NetworkParameters {
            config: self.config.clone(),
            weights: self.weights.clone(),
            biases: self.biases.clone(),
        }
    }

    /// Replace the parameters, checking every shape against this layout
    pub fn set_parameters(&mut self, params: NetworkParameters) -> Result<()> {
        if params.config != self.config {
            return Err(RLError::DimensionMismatch {
                expected: self.parameter_count(),
                actual: params.parameter_count(),
            });
        }
        if params.weights.len() != self.weights.len() || params.biases.len() != self.biases.len() {
            return Err(RLError::DimensionMismatch {
                expected: self.weights.len(),
                actual: params.weights.len(),
            });
        }
        for (current, new) in self.weights.iter().zip(&params.weights) {
            if current.dim() != new.dim() {
                return Err(RLError::DimensionMismatch {
                    expected: current.len(),
                    actual: new.len(),
                });
            }
        }
        for (current, new) in self.biases.iter().zip(&params.biases) {
            if current.len() != new.len() {
                return Err(RLError::DimensionMismatch {
                    expected: current.len(),
                    actual: new.len(),
                });
            }
        }

        self.weights = params.weights;
        self.biases = params.biases;
        Ok(())
    }

    /// Total number of scalar parameters
    #[must_use]
    pub fn num_parameters(&self) -> usize {
        self.weights.iter().map(Array2::len).sum::<usize>()
            + self.biases.iter().map(Array1::len).sum::<usize>()
    }
}
