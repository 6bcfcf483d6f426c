//! Metering actions and the discrete action space

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{RLError, Result};

/// High-level decision taken once per control interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeterAction {
    /// Keep the ramp signal in free-flow until the next decision
    Hold,
    /// Run the restrictive metering duty cycle until the next decision
    Meter,
}

impl MeterAction {
    /// Number of actions in the space
    pub const COUNT: usize = 2;

    /// All actions in index order
    pub const ALL: [Self; Self::COUNT] = [Self::Hold, Self::Meter];

    /// Index of the action in value-function outputs
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Hold => 0,
            Self::Meter => 1,
        }
    }

    /// Look an action up by its output index
    pub fn from_index(index: usize) -> Result<Self> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or_else(|| RLError::InvalidAction(format!("action index {index} out of range")))
    }
}

impl fmt::Display for MeterAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hold => write!(f, "hold"),
            Self::Meter => write!(f, "meter"),
        }
    }
}

/// Discrete action space over [`MeterAction`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscreteSpace;

impl DiscreteSpace {
    /// Sample an action uniformly at random
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> MeterAction {
        MeterAction::ALL[rng.gen_range(0..MeterAction::COUNT)]
    }

    /// Number of actions
    #[must_use]
    pub fn n(&self) -> usize {
        MeterAction::COUNT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_index_round_trip() {
        for action in MeterAction::ALL {
            assert_eq!(MeterAction::from_index(action.index()).unwrap(), action);
        }
        assert!(matches!(MeterAction::from_index(2), Err(RLError::InvalidAction(_))));
    }

    #[test]
    fn test_sample_covers_space() {
        let mut rng = StdRng::seed_from_u64(7);
        let space = DiscreteSpace;
        let mut seen = [false; MeterAction::COUNT];
        for _ in 0..100 {
            seen[space.sample(&mut rng).index()] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }
}
