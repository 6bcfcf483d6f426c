//! The normalized per-interval state vector

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::{RLError, Result};

/// Number of components in a [`StateVector`]
pub const STATE_DIM: usize = 10;

/// Normalized traffic state observed over one control interval.
///
/// Components are ordered as [`StateVector::FEATURE_NAMES`]: speed and
/// occupancy for each of the three detector groups, then the three group
/// flows, then the ramp queue. Each is a physical mean divided by its
/// reference maximum, so values sit roughly in `[0, 1]` without being clamped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateVector {
    data: [f64; STATE_DIM],
}

impl StateVector {
    /// Component names in vector order
    pub const FEATURE_NAMES: [&'static str; STATE_DIM] = [
        "speed_g1", "occ_g1", "speed_g2", "occ_g2", "speed_g3", "occ_g3",
        "flow_g1", "flow_g2", "flow_g3", "queue",
    ];

    /// Wrap an already-normalized component array
    #[must_use]
    pub fn new(data: [f64; STATE_DIM]) -> Self {
        Self { data }
    }

    /// Build a state from a slice, checking its length
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        let data: [f64; STATE_DIM] = values.try_into().map_err(|_| RLError::DimensionMismatch {
            expected: STATE_DIM,
            actual: values.len(),
        })?;
        Ok(Self { data })
    }

    /// All-zero state
    #[must_use]
    pub fn zeros() -> Self {
        Self { data: [0.0; STATE_DIM] }
    }

    /// Feature representation of the state
    #[must_use]
    pub fn features(&self) -> &[f64] {
        &self.data
    }

    /// Feature vector as an ndarray column for network input
    #[must_use]
    pub fn to_array(&self) -> Array1<f64> {
        Array1::from_iter(self.data.iter().copied())
    }

    /// Always [`STATE_DIM`]
    #[must_use]
    pub fn len(&self) -> usize {
        STATE_DIM
    }

    /// A state vector is never empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl std::ops::Index<usize> for StateVector {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.data[index]
    }
}
