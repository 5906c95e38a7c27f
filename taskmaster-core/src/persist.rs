//! File-backed game state and mission log.
//!
//! Both files are plain pretty-printed JSON. Loading never fails: a missing
//! or unreadable file falls back to an empty value. Saving reports errors.

use crate::mission::GameState;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Read and parse a JSON file, or `None` if it is missing or malformed.
async fn load_tolerant<T: for<'de> Deserialize<'de>>(path: &Path, what: &str) -> Option<T> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no {what} file yet");
            return None;
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "unreadable {what} file; starting fresh");
            return None;
        }
    };

    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "malformed {what} file; starting fresh");
            None
        }
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistError> {
    let content = serde_json::to_string_pretty(value)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, content).await?;
    Ok(())
}

// ============================================================================
// Game state
// ============================================================================

/// Game state stored at a fixed path. The last writer wins.
#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored state, or an empty one.
    pub async fn load(&self) -> GameState {
        load_tolerant(&self.path, "game state")
            .await
            .unwrap_or_default()
    }

    pub async fn save(&self, state: &GameState) -> Result<(), PersistError> {
        write_json(&self.path, state).await
    }
}

// ============================================================================
// Mission log
// ============================================================================

/// One player message and the reply it received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub user: String,
    pub agent: String,
}

/// Every exchange recorded so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionRecord {
    #[serde(default)]
    pub conversation: Vec<Exchange>,
}

/// Append-only record of exchanges, stored at a fixed path.
#[derive(Debug, Clone)]
pub struct MissionLog {
    path: PathBuf,
}

impl MissionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the record, or an empty one.
    pub async fn load(&self) -> MissionRecord {
        load_tolerant(&self.path, "mission log")
            .await
            .unwrap_or_default()
    }

    /// Append an exchange. A corrupt log is replaced by one holding just this exchange.
    pub async fn append(
        &self,
        user: impl Into<String>,
        agent: impl Into<String>,
    ) -> Result<(), PersistError> {
        let mut record = self.load().await;
        record.conversation.push(Exchange {
            user: user.into(),
            agent: agent.into(),
        });
        write_json(&self.path, &record).await
    }
}
