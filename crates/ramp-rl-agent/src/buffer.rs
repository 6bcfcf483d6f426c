//! Experience replay buffer

use rand::seq::index;
use rand::Rng;
use std::collections::VecDeque;

use ramp_rl_core::{RLError, Result, Transition};

/// Fixed-capacity FIFO store with uniform sampling.
///
/// Once full, every push evicts the oldest entry; access never affects
/// eviction order.
#[derive(Debug, Clone)]
pub struct ReplayBuffer<T = Transition> {
    /// Buffer storage, oldest first
    buffer: VecDeque<T>,
    /// Maximum capacity
    capacity: usize,
}

impl<T: Clone> ReplayBuffer<T> {
    /// Create a new replay buffer
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Add an entry, evicting the oldest one at capacity
    pub fn push(&mut self, item: T) {
        if self.capacity == 0 {
            return;
        }
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(item);
    }

    /// Draw `batch_size` distinct entries uniformly at random
    pub fn sample<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Result<Vec<T>> {
        if batch_size == 0 || self.buffer.len() < batch_size {
            return Err(RLError::EmptyBatch {
                requested: batch_size,
                available: self.buffer.len(),
            });
        }

        Ok(index::sample(rng, self.buffer.len(), batch_size)
            .into_iter()
            .map(|i| self.buffer[i].clone())
            .collect())
    }

    /// Whether a batch of `batch_size` can be sampled
    #[must_use]
    pub fn is_ready(&self, batch_size: usize) -> bool {
        batch_size > 0 && self.buffer.len() >= batch_size
    }

    /// Stored entries, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buffer.iter()
    }

    /// Get the current size of the buffer
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if buffer is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Maximum number of stored entries
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Clear the buffer
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
