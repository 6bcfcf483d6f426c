//! Simulator that replays recorded detector traces
//!
//! A trace is a JSON-lines file with one frame per simulation step. Each
//! frame carries the detector readings seen at the start of the step and the
//! load metric once the step has been simulated:
//!
//! ```json
//! {"groups":[{"loops":[{"mean_speed":12.5,"occupancy":8.0,"vehicle_count":1}]}],"ramp_queue":[2.0,3.0],"load":412.0}
//! ```
//!
//! Phase commands cannot influence a recording; they are counted so runs can
//! report how often the ramp was restricted.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::info;

use ramp_rl_core::{RLError, Result, SensorFrame, SignalPhase, Simulator};

/// One recorded simulation step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceFrame {
    /// Detector readings at the start of the step
    #[serde(flatten)]
    pub sensors: SensorFrame,
    /// Vehicles in the system after the step
    pub load: f64,
}

/// Replays a fixed sequence of frames
#[derive(Debug, Clone)]
pub struct TraceSimulator {
    frames: Vec<TraceFrame>,
    /// Index of the frame for the step in progress
    cursor: usize,
    free_flow_commands: usize,
    restrict_commands: usize,
}

impl TraceSimulator {
    /// Create a simulator over in-memory frames
    pub fn from_frames(frames: Vec<TraceFrame>) -> Result<Self> {
        if frames.is_empty() {
            return Err(RLError::Simulator("trace contains no frames".to_string()));
        }
        Ok(Self {
            frames,
            cursor: 0,
            free_flow_commands: 0,
            restrict_commands: 0,
        })
    }

    /// Parse JSON-lines content, skipping blank lines
    pub fn parse(content: &str) -> Result<Self> {
        let mut frames = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let frame: TraceFrame = serde_json::from_str(line)
                .with_context(|| format!("failed to parse trace frame on line {}", line_no + 1))?;
            frames.push(frame);
        }
        Self::from_frames(frames)
    }

    /// Load a trace file
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read trace file {}", path.display()))?;
        let sim = Self::parse(&content)?;
        info!(path = %path.display(), frames = sim.len(), "loaded trace");
        Ok(sim)
    }

    /// Number of recorded steps
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the trace holds no steps
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Steps completed since the last reset
    #[must_use]
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Commands received for `phase` since the last reset
    #[must_use]
    pub fn phase_count(&self, phase: SignalPhase) -> usize {
        match phase {
            SignalPhase::FreeFlow => self.free_flow_commands,
            SignalPhase::Restrict => self.restrict_commands,
        }
    }

    fn current(&self) -> Result<&TraceFrame> {
        self.frames.get(self.cursor).ok_or_else(|| {
            RLError::Simulator(format!(
                "trace exhausted after {} steps",
                self.frames.len()
            ))
        })
    }
}

impl Simulator for TraceSimulator {
    fn reset(&mut self) -> Result<()> {
        self.cursor = 0;
        self.free_flow_commands = 0;
        self.restrict_commands = 0;
        Ok(())
    }

    fn read_sensors(&mut self) -> Result<SensorFrame> {
        Ok(self.current()?.sensors.clone())
    }

    fn set_phase(&mut self, phase: SignalPhase) -> Result<()> {
        match phase {
            SignalPhase::FreeFlow => self.free_flow_commands += 1,
            SignalPhase::Restrict => self.restrict_commands += 1,
        }
        Ok(())
    }

    fn step(&mut self) -> Result<()> {
        self.current()?;
        self.cursor += 1;
        Ok(())
    }

    fn load_metric(&mut self) -> Result<f64> {
        Ok(self
            .cursor
            .checked_sub(1)
            .map_or(0.0, |last| self.frames[last].load))
    }
}
