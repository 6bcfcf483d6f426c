//! Transitions, per-interval episode history and episode reports

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{MeterAction, Reward, StateVector, STATE_DIM};

/// Single decision-to-decision transition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// State the action was chosen in
    pub state: StateVector,
    /// Action taken
    pub action: MeterAction,
    /// Reward for the interval that followed
    pub reward: Reward,
    /// State observed at the next decision
    pub next_state: StateVector,
    /// Whether the episode ended with this transition
    pub terminal: bool,
}

impl Transition {
    /// Create a new transition
    #[must_use]
    pub fn new(
        state: StateVector,
        action: MeterAction,
        reward: Reward,
        next_state: StateVector,
        terminal: bool,
    ) -> Self {
        Self {
            state,
            action,
            reward,
            next_state,
            terminal,
        }
    }
}

/// Named float sequences with one entry per control interval.
///
/// Holds the raw (un-normalized) interval means under the state feature
/// names plus `load`, `reward` and `cumulative_reward`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeHistory {
    series: IndexMap<String, Vec<f64>>,
}

impl EpisodeHistory {
    /// Name of the per-interval load series
    pub const LOAD: &'static str = "load";
    /// Name of the per-interval reward series
    pub const REWARD: &'static str = "reward";
    /// Name of the running episode score series
    pub const CUMULATIVE_REWARD: &'static str = "cumulative_reward";

    /// Create an empty history with every series registered
    #[must_use]
    pub fn new() -> Self {
        let mut series = IndexMap::new();
        for name in StateVector::FEATURE_NAMES
            .iter()
            .chain(&[Self::LOAD, Self::REWARD, Self::CUMULATIVE_REWARD])
        {
            series.insert((*name).to_string(), Vec::new());
        }
        Self { series }
    }

    /// Append one control interval
    pub fn record_interval(
        &mut self,
        raw_means: &[f64; STATE_DIM],
        load_metric: f64,
        reward: Reward,
        cumulative_reward: f64,
    ) {
        for (name, value) in StateVector::FEATURE_NAMES.iter().zip(raw_means) {
            self.push(name, *value);
        }
        self.push(Self::LOAD, load_metric);
        self.push(Self::REWARD, reward.value());
        self.push(Self::CUMULATIVE_REWARD, cumulative_reward);
    }

    fn push(&mut self, name: &str, value: f64) {
        self.series.entry(name.to_string()).or_default().push(value);
    }

    /// Series by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.series.get(name).map(Vec::as_slice)
    }

    /// Number of recorded intervals
    #[must_use]
    pub fn len(&self) -> usize {
        self.series.get(Self::LOAD).map_or(0, Vec::len)
    }

    /// Whether no interval has been recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate series in registration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.series.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

/// Summary of one control-loop episode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeReport {
    /// Episode ID
    pub id: Uuid,
    /// Simulation steps executed
    pub steps: usize,
    /// Control decisions taken
    pub decisions: usize,
    /// Transitions handed to the agent
    pub transitions: usize,
    /// Training updates that actually ran
    pub training_updates: usize,
    /// Sum of interval rewards
    pub total_reward: f64,
    /// Mean loss over training updates, if any ran
    pub mean_loss: Option<f64>,
    /// Exploration rate after the episode-end decay
    pub final_epsilon: f64,
    /// Start time
    pub start_time: DateTime<Utc>,
    /// End time
    pub end_time: Option<DateTime<Utc>>,
    /// Action chosen at each decision, in order
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub actions: Vec<MeterAction>,
    /// Per-interval log
    #[serde(skip_serializing_if = "EpisodeHistory::is_empty", default)]
    pub history: EpisodeHistory,
}

impl EpisodeReport {
    /// Start a report for a new episode
    #[must_use]
    pub fn start() -> Self {
        Self {
            id: Uuid::new_v4(),
            steps: 0,
            decisions: 0,
            transitions: 0,
            training_updates: 0,
            total_reward: 0.0,
            mean_loss: None,
            final_epsilon: 0.0,
            start_time: Utc::now(),
            end_time: None,
            actions: Vec::new(),
            history: EpisodeHistory::new(),
        }
    }

    /// Stamp the end time
    pub fn finish(&mut self) {
        self.end_time = Some(Utc::now());
    }
}
