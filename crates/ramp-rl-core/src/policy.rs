//! Policy abstractions for action selection

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{ActionValueFunction, DiscreteSpace, MeterAction, StateVector};

/// Core policy trait for selecting actions
pub trait Policy: Send + Sync {
    /// Select an action for `state` given the current value estimates
    fn select_action<Q, R>(&self, q: &Q, state: &StateVector, rng: &mut R) -> MeterAction
    where
        Q: ActionValueFunction + ?Sized,
        R: Rng + ?Sized;

    /// Per-episode update of any exploration schedule
    fn decay(&mut self) {}
}

/// Epsilon-greedy selection with multiplicative per-episode decay
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpsilonGreedy {
    /// Exploration rate
    epsilon: f64,
    /// Factor applied by [`Policy::decay`]
    decay: f64,
    /// Lower bound that decay never crosses
    floor: f64,
    #[serde(skip)]
    action_space: DiscreteSpace,
}

impl EpsilonGreedy {
    /// Create a new epsilon-greedy policy
    #[must_use]
    pub fn new(epsilon: f64, decay: f64, floor: f64) -> Self {
        Self {
            epsilon: epsilon.clamp(0.0, 1.0),
            decay,
            floor: floor.clamp(0.0, 1.0),
            action_space: DiscreteSpace,
        }
    }

    /// Pure exploitation, used for evaluation runs
    #[must_use]
    pub fn greedy() -> Self {
        Self::new(0.0, 1.0, 0.0)
    }

    /// Current exploration rate
    #[must_use]
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Set the exploration rate
    pub fn set_epsilon(&mut self, epsilon: f64) {
        self.epsilon = epsilon.clamp(0.0, 1.0);
    }
}

impl Policy for EpsilonGreedy {
    fn select_action<Q, R>(&self, q: &Q, state: &StateVector, rng: &mut R) -> MeterAction
    where
        Q: ActionValueFunction + ?Sized,
        R: Rng + ?Sized,
    {
        if self.epsilon > 0.0 && rng.gen::<f64>() < self.epsilon {
            self.action_space.sample(rng)
        } else {
            q.best_action_value(state).0
        }
    }

    fn decay(&mut self) {
        if self.epsilon > self.floor {
            self.epsilon = (self.epsilon * self.decay).max(self.floor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{QValues, Result, Transition};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct FixedValues(QValues);

    impl ActionValueFunction for FixedValues {
        fn evaluate(&self, _state: &StateVector) -> QValues {
            self.0
        }

        fn train_step(&mut self, _batch: &[Transition]) -> Result<f64> {
            Ok(0.0)
        }
    }

    #[test]
    fn test_zero_epsilon_is_greedy() {
        let policy = EpsilonGreedy::greedy();
        let mut rng = StdRng::seed_from_u64(1);
        let state = StateVector::zeros();

        for _ in 0..50 {
            assert_eq!(
                policy.select_action(&FixedValues([0.1, 0.9]), &state, &mut rng),
                MeterAction::Meter
            );
            assert_eq!(
                policy.select_action(&FixedValues([0.4, 0.4]), &state, &mut rng),
                MeterAction::Hold
            );
        }
    }

    #[test]
    fn test_full_epsilon_is_uniform() {
        let policy = EpsilonGreedy::new(1.0, 0.95, 0.01);
        let mut rng = StdRng::seed_from_u64(42);
        let state = StateVector::zeros();
        let q = FixedValues([10.0, 0.0]);

        let trials = 10_000;
        let meters = (0..trials)
            .filter(|_| policy.select_action(&q, &state, &mut rng) == MeterAction::Meter)
            .count();
        let share = meters as f64 / f64::from(trials);
        assert!((share - 0.5).abs() < 0.03, "meter share {share}");
    }

    #[test]
    fn test_decay_clamps_to_floor() {
        let mut policy = EpsilonGreedy::new(1.0, 0.95, 0.01);
        policy.decay();
        assert_eq!(policy.epsilon(), 0.95);

        for _ in 0..500 {
            policy.decay();
        }
        assert_eq!(policy.epsilon(), 0.01);
    }

    #[test]
    fn test_decay_never_raises_epsilon() {
        let mut policy = EpsilonGreedy::new(0.0, 0.95, 0.01);
        policy.decay();
        assert_eq!(policy.epsilon(), 0.0);

        let mut policy = EpsilonGreedy::new(0.005, 0.95, 0.01);
        policy.decay();
        assert_eq!(policy.epsilon(), 0.005);
    }
}
