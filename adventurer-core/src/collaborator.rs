//! Trait seams for the external collaborators the core relies on.
//!
//! The core never implements transport, prompting, or loop detection
//! itself; it only fixes the shape of data crossing these seams. Scripted
//! implementations for tests live in [`crate::testing`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use thiserror::Error;

/// Errors from the environment transport.
///
/// Transport failure is fatal to the current turn: no valid next action can
/// be computed without a response.
#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("environment returned a malformed response: {0}")]
    Malformed(String),
}

/// One turn's worth of environment output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvResponse {
    /// The environment's narrative response text.
    pub text: String,
    /// Name of the location after the command executed.
    pub location: String,
    /// Current game score.
    pub score: i32,
    /// Total moves so far.
    pub moves: u32,
}

/// The stateful, text-driven environment being played.
#[async_trait]
pub trait Environment: Send {
    /// Execute one command and return the environment's response.
    async fn execute(&mut self, command: &str) -> Result<EnvResponse, EnvironmentError>;
}

/// Errors from the reasoning collaborator.
#[derive(Debug, Error)]
pub enum ReasonerError {
    #[error("reasoner call failed: {0}")]
    Call(String),

    #[error("reasoner response could not be parsed: {0}")]
    Parse(String),
}

/// Structured context handed to the reasoning collaborator for one proposal.
#[derive(Debug, Clone)]
pub struct ProposalRequest {
    /// What this advocate is arguing for (issue summary or exploration plan).
    pub focus: String,
    /// Current location name.
    pub location: String,
    /// The environment's latest response text.
    pub response_text: String,
    /// Compact summary of the known map.
    pub map_summary: String,
    /// Compact summary of the top remembered facts.
    pub memory_summary: String,
}

/// What the reasoning collaborator hands back for one proposal.
#[derive(Debug, Clone)]
pub struct ReasonedProposal {
    pub action: String,
    /// Confidence 0..=100.
    pub confidence: u8,
    pub rationale: String,
}

/// External reasoning engine consulted by advocates.
///
/// The core does not specify prompting; it only passes structured context in
/// and expects an action/confidence/rationale back.
#[async_trait]
pub trait Reasoner: Send + Sync {
    async fn propose_action(
        &self,
        request: ProposalRequest,
    ) -> Result<ReasonedProposal, ReasonerError>;
}

/// History and loop-detection advice consumed by arbitration heuristics.
pub trait HistoryAdvisor: Send + Sync {
    /// Actions that recently failed and should not be retried.
    fn recently_failed_actions(&self) -> Vec<String>;

    /// Consecutive turns spent at the same location with no score change.
    fn turns_without_progress(&self) -> u32;
}

/// A ready-made [`HistoryAdvisor`] fed by the embedding application.
///
/// Tracks stagnation from `(location, score)` observations and keeps a short
/// sliding window of reported failures.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    inner: Mutex<TrackerState>,
}

#[derive(Debug, Default)]
struct TrackerState {
    last_position: Option<(String, i32)>,
    stagnant_turns: u32,
    failed_actions: Vec<String>,
}

/// How many recently failed actions the tracker remembers.
const FAILED_ACTION_WINDOW: usize = 5;

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record where a turn ended up.
    pub fn note_turn(&self, location: &str, score: i32) {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let position = (location.to_string(), score);
        if state.last_position.as_ref() == Some(&position) {
            state.stagnant_turns += 1;
        } else {
            state.stagnant_turns = 0;
            state.last_position = Some(position);
        }
    }

    /// Report an action that failed (e.g. a blocked movement).
    pub fn note_failed(&self, action: &str) {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let action = action.trim().to_uppercase();
        if !state.failed_actions.contains(&action) {
            state.failed_actions.push(action);
        }
        while state.failed_actions.len() > FAILED_ACTION_WINDOW {
            state.failed_actions.remove(0);
        }
    }

    /// Forget recorded failures (e.g. after the situation changed).
    pub fn clear_failures(&self) {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        state.failed_actions.clear();
    }
}

impl HistoryAdvisor for ProgressTracker {
    fn recently_failed_actions(&self) -> Vec<String> {
        let state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        state.failed_actions.clone()
    }

    fn turns_without_progress(&self) -> u32 {
        let state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        state.stagnant_turns
    }
}
