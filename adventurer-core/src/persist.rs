//! Session persistence for save/load functionality.
//!
//! Serializes everything a resumed session needs: the spatial map's edges,
//! the memory store, the issue ledger, and the scalar turn state.

use crate::issue::Issue;
use crate::map::{EdgeRecord, SpatialMap};
use crate::memory::MemoryRecord;
use crate::orchestrator::{SessionState, TurnOrchestrator};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tokio::fs;
use tracing::info;

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

/// Current save file version.
const SAVE_VERSION: u32 = 1;

/// A saved session with all state needed to resume play.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Save format version for compatibility checking.
    pub version: u32,

    /// When the save was created (unix seconds).
    pub saved_at: String,

    /// Turns completed before the save.
    pub turn: u32,

    /// Location at the end of the last completed turn.
    pub location: Option<String>,

    /// The command whose response the next turn will consume.
    pub last_command: Option<String>,

    /// Every discovered map edge, blocked ones included.
    pub edges: Vec<EdgeRecord>,

    /// The memory store's records.
    pub memories: Vec<MemoryRecord>,

    /// All issues, resolved included.
    pub issues: Vec<Issue>,
}

impl SessionSnapshot {
    /// Capture the orchestrator's full session state.
    pub fn capture(orchestrator: &TurnOrchestrator) -> Self {
        let state = orchestrator.session_state();
        Self {
            version: SAVE_VERSION,
            saved_at: unix_now(),
            turn: state.turn,
            location: state.location,
            last_command: state.last_command,
            edges: orchestrator.map().edge_records(),
            memories: orchestrator.memory().all(),
            issues: orchestrator.issues().all(),
        }
    }

    /// Load the snapshot back into an orchestrator.
    ///
    /// Replaces the orchestrator's map, memory, issues, and turn counters;
    /// its collaborators and configuration are untouched.
    pub fn restore(self, orchestrator: &mut TurnOrchestrator) {
        orchestrator.restore_session(
            SpatialMap::from_records(self.edges),
            self.memories,
            self.issues,
            SessionState {
                turn: self.turn,
                location: self.location,
                last_command: self.last_command,
            },
        );
    }

    /// Save to a JSON file.
    pub async fn save_json(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&path, content).await?;
        info!(path = %path.as_ref().display(), turn = self.turn, "session saved");
        Ok(())
    }

    /// Load from a JSON file.
    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let content = fs::read_to_string(path).await?;
        let snapshot: Self = serde_json::from_str(&content)?;

        if snapshot.version != SAVE_VERSION {
            return Err(PersistError::VersionMismatch {
                expected: SAVE_VERSION,
                found: snapshot.version,
            });
        }

        Ok(snapshot)
    }
}

/// Get current timestamp as unix seconds.
fn unix_now() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}", now.as_secs())
}
