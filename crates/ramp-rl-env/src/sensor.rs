//! Detector aggregation into the normalized state vector
//!
//! Every simulation step the aggregator reduces the raw loop readings of each
//! detector group to one speed, occupancy and flow value and buffers them
//! together with the ramp queue. At a decision boundary the buffered values
//! are averaged over the interval, scaled by their reference maxima and
//! assembled into a [`StateVector`].

use serde::{Deserialize, Serialize};

use ramp_rl_core::{GroupReading, RLError, Result, SensorFrame, StateVector, STATE_DIM};

/// Number of detector groups the state vector describes
pub const DETECTOR_GROUPS: usize = 3;

/// Detector layout and normalization constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Loop count of each detector group, upstream first
    pub lanes: Vec<usize>,
    /// Reference maximum speed in m/s
    pub max_speed: f64,
    /// Reference maximum occupancy in percent
    pub max_occupancy: f64,
    /// Reference maximum flow in vehicles per hour per lane
    pub max_flow: f64,
    /// Reference maximum ramp queue in vehicles
    pub max_queue: f64,
    /// Factor turning per-step counts into hourly flow
    pub flow_scale: f64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            lanes: vec![5, 4, 4],
            max_speed: 30.0,
            max_occupancy: 100.0,
            max_flow: 2000.0,
            max_queue: 20.0,
            flow_scale: 3600.0,
        }
    }
}

impl SensorConfig {
    /// Check the layout and that every maximum can be divided by
    pub fn validate(&self) -> Result<()> {
        if self.lanes.len() != DETECTOR_GROUPS {
            return Err(RLError::DimensionMismatch {
                expected: DETECTOR_GROUPS,
                actual: self.lanes.len(),
            });
        }
        if self.lanes.contains(&0) {
            return Err(RLError::Config(format!(
                "every detector group needs at least one loop: {:?}",
                self.lanes
            )));
        }
        let maxima = [self.max_speed, self.max_occupancy, self.max_flow, self.max_queue];
        if maxima.iter().any(|m| !m.is_finite() || *m <= 0.0) {
            return Err(RLError::Config(format!(
                "reference maxima must be positive: {maxima:?}"
            )));
        }
        Ok(())
    }

    /// Divisor for each state component, in state order
    fn scales(&self) -> [f64; STATE_DIM] {
        let mut scales = [0.0; STATE_DIM];
        for group in 0..DETECTOR_GROUPS {
            scales[2 * group] = self.max_speed;
            scales[2 * group + 1] = self.max_occupancy;
            scales[2 * DETECTOR_GROUPS + group] = self.max_flow;
        }
        scales[STATE_DIM - 1] = self.max_queue;
        scales
    }
}

/// Per-group step values buffered until the next flush
#[derive(Debug, Clone, Default)]
struct GroupBuffer {
    speed: Vec<f64>,
    occupancy: Vec<f64>,
    flow: Vec<f64>,
}

/// Mean of the values, 0 when there are none
fn mean_or_zero(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0_usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

/// Buffers per-step detector values and flushes them into state vectors
#[derive(Debug, Clone)]
pub struct SensorAggregator {
    config: SensorConfig,
    groups: Vec<GroupBuffer>,
    queue: Vec<f64>,
}

impl SensorAggregator {
    /// Create an aggregator for a validated layout
    pub fn new(config: SensorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            groups: vec![GroupBuffer::default(); config.lanes.len()],
            queue: Vec::new(),
            config,
        })
    }

    /// Detector layout
    #[must_use]
    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    /// Steps buffered since the last flush
    #[must_use]
    pub fn pending_steps(&self) -> usize {
        self.queue.len()
    }

    /// Reduce one step of readings and buffer the result
    pub fn collect_step(&mut self, frame: &SensorFrame) -> Result<()> {
        if frame.groups.len() != self.config.lanes.len() {
            return Err(RLError::DimensionMismatch {
                expected: self.config.lanes.len(),
                actual: frame.groups.len(),
            });
        }
        for (group, &lanes) in frame.groups.iter().zip(&self.config.lanes) {
            if group.loops.len() != lanes {
                return Err(RLError::DimensionMismatch {
                    expected: lanes,
                    actual: group.loops.len(),
                });
            }
        }

        let flow_scale = self.config.flow_scale;
        for ((group, buffer), &lanes) in frame
            .groups
            .iter()
            .zip(&mut self.groups)
            .zip(&self.config.lanes)
        {
            let (speed, occupancy, flow) = Self::reduce(group, lanes, flow_scale);
            buffer.speed.push(speed);
            buffer.occupancy.push(occupancy);
            buffer.flow.push(flow);
        }

        let queue = frame.queue_length();
        self.queue.push(if queue.is_finite() { queue } else { 0.0 });
        Ok(())
    }

    /// Speed, occupancy and hourly flow of one group for one step
    fn reduce(group: &GroupReading, lanes: usize, flow_scale: f64) -> (f64, f64, f64) {
        let speed = mean_or_zero(
            group
                .loops
                .iter()
                .filter(|l| l.has_speed())
                .map(|l| l.mean_speed),
        );
        let occupancy = mean_or_zero(
            group
                .loops
                .iter()
                .map(|l| l.occupancy)
                .filter(|o| o.is_finite()),
        );
        let count: u32 = group.loops.iter().map(|l| l.vehicle_count).sum();
        let flow = f64::from(count) * flow_scale / lanes as f64;
        (speed, occupancy, flow)
    }

    /// Average the interval, normalize, and clear the buffers.
    ///
    /// Returns the state vector and the raw interval means in the same order.
    pub fn flush_interval(&mut self) -> (StateVector, [f64; STATE_DIM]) {
        let mut raw = [0.0; STATE_DIM];
        for (group, buffer) in self.groups.iter().enumerate() {
            raw[2 * group] = mean_or_zero(buffer.speed.iter().copied());
            raw[2 * group + 1] = mean_or_zero(buffer.occupancy.iter().copied());
            raw[2 * DETECTOR_GROUPS + group] = mean_or_zero(buffer.flow.iter().copied());
        }
        raw[STATE_DIM - 1] = mean_or_zero(self.queue.iter().copied());

        let mut normalized = [0.0; STATE_DIM];
        for ((n, r), scale) in normalized.iter_mut().zip(&raw).zip(self.config.scales()) {
            *n = r / scale;
        }

        self.clear();
        (StateVector::new(normalized), raw)
    }

    /// Drop everything buffered since the last flush
    pub fn clear(&mut self) {
        for buffer in &mut self.groups {
            buffer.speed.clear();
            buffer.occupancy.clear();
            buffer.flow.clear();
        }
        self.queue.clear();
    }
}
