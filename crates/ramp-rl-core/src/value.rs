//! Action-value functions

use crate::{MeterAction, Result, StateVector, Transition};

/// One estimated value per [`MeterAction`], indexed by [`MeterAction::index`]
pub type QValues = [f64; MeterAction::COUNT];

/// Action value function Q(s, a)
pub trait ActionValueFunction: Send + Sync {
    /// Q-values for every action in `state`; no side effects
    fn evaluate(&self, state: &StateVector) -> QValues;

    /// One pass of bootstrapped updates over `batch`, returning the mean loss
    fn train_step(&mut self, batch: &[Transition]) -> Result<f64>;

    /// Value of taking `action` in `state`
    fn q_value(&self, state: &StateVector, action: MeterAction) -> f64 {
        self.evaluate(state)[action.index()]
    }

    /// Greedy action and its value
    fn best_action_value(&self, state: &StateVector) -> (MeterAction, f64) {
        greedy(&self.evaluate(state))
    }
}

/// Argmax over Q-values; ties go to the lowest action index
#[must_use]
pub fn greedy(values: &QValues) -> (MeterAction, f64) {
    let mut best = 0;
    for (i, value) in values.iter().enumerate().skip(1) {
        if *value > values[best] {
            best = i;
        }
    }
    (MeterAction::ALL[best], values[best])
}
