//! Value-function checkpoints

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use uuid::Uuid;

use ramp_rl_core::{RLError, Result};

use crate::dqn::DQNConfig;
use crate::network::NetworkParameters;

/// Training context stored alongside the parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    /// Episodes completed when the checkpoint was taken
    pub episode: usize,
    /// Score of the episode that produced it, if any
    pub score: Option<f64>,
    /// Agent configuration used for training
    pub config: DQNConfig,
}

/// Saved network parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Checkpoint ID
    pub id: Uuid,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Network weights and biases
    pub parameters: NetworkParameters,
    /// Training context
    pub metadata: CheckpointMetadata,
}

impl Checkpoint {
    /// Create a checkpoint stamped now
    #[must_use]
    pub fn new(parameters: NetworkParameters, metadata: CheckpointMetadata) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            parameters,
            metadata,
        }
    }

    /// Write the checkpoint as JSON, creating parent directories
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).await?;
        tracing::debug!(path = %path.display(), id = %self.id, "saved checkpoint");
        Ok(())
    }

    /// Read a checkpoint; a missing file is [`RLError::MissingCheckpoint`]
    pub async fn load(path: &Path) -> Result<Self> {
        let json = match fs::read_to_string(path).await {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(RLError::MissingCheckpoint(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&json)?)
    }
}
