//! Testing utilities for the decision core.
//!
//! This module provides tools for integration testing:
//! - `MockReasoner` for deterministic proposals without API calls
//! - `ScriptedEnvironment` for replaying canned game transcripts
//! - `ScriptedHistory` for fixed loop-detection advice

use crate::collaborator::{
    EnvResponse, Environment, EnvironmentError, HistoryAdvisor, ProposalRequest, ReasonedProposal,
    Reasoner, ReasonerError,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A mock reasoner with a fixed behavior.
///
/// Every request it receives is recorded and can be inspected afterwards
/// with [`MockReasoner::requests`].
pub struct MockReasoner {
    behavior: MockBehavior,
    requests: Mutex<Vec<ProposalRequest>>,
}

enum MockBehavior {
    /// Always fail, driving every advocate to its fallback.
    Fail,
    /// Always return the same reasoned proposal.
    Fixed(ReasonedProposal),
}

impl MockReasoner {
    /// A reasoner with nothing to say; every call fails.
    pub fn empty() -> Self {
        Self {
            behavior: MockBehavior::Fail,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A reasoner whose calls always fail. Alias of [`MockReasoner::empty`]
    /// that reads better in failure-path tests.
    pub fn failing() -> Self {
        Self::empty()
    }

    /// A reasoner that always returns the same proposal.
    pub fn scripted(action: &str, confidence: u8, rationale: &str) -> Self {
        Self {
            behavior: MockBehavior::Fixed(ReasonedProposal {
                action: action.to_string(),
                confidence,
                rationale: rationale.to_string(),
            }),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every request received so far, in call order.
    pub fn requests(&self) -> Vec<ProposalRequest> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Reasoner for MockReasoner {
    async fn propose_action(
        &self,
        request: ProposalRequest,
    ) -> Result<ReasonedProposal, ReasonerError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);
        match &self.behavior {
            MockBehavior::Fail => Err(ReasonerError::Call("mock reasoner has no answer".into())),
            MockBehavior::Fixed(proposal) => Ok(proposal.clone()),
        }
    }
}

/// An environment that replays a canned transcript.
///
/// Responses are returned in order regardless of the command; the commands
/// themselves are recorded for assertions.
pub struct ScriptedEnvironment {
    responses: VecDeque<EnvResponse>,
    executed: Vec<String>,
}

impl ScriptedEnvironment {
    pub fn new(responses: Vec<EnvResponse>) -> Self {
        Self {
            responses: responses.into(),
            executed: Vec::new(),
        }
    }

    /// Queue another response at the end of the transcript.
    pub fn queue_response(&mut self, response: EnvResponse) {
        self.responses.push_back(response);
    }

    /// Every command executed so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed.clone()
    }
}

#[async_trait]
impl Environment for ScriptedEnvironment {
    async fn execute(&mut self, command: &str) -> Result<EnvResponse, EnvironmentError> {
        self.executed.push(command.to_string());
        self.responses
            .pop_front()
            .ok_or_else(|| EnvironmentError::Transport("transcript exhausted".into()))
    }
}

/// A history advisor with fixed advice.
#[derive(Debug, Clone, Default)]
pub struct ScriptedHistory {
    failures: Vec<String>,
    stuck_turns: u32,
}

impl ScriptedHistory {
    /// No failures, no stagnation.
    pub fn quiet() -> Self {
        Self::default()
    }

    pub fn new(failures: Vec<String>, stuck_turns: u32) -> Self {
        Self {
            failures,
            stuck_turns,
        }
    }
}

impl HistoryAdvisor for ScriptedHistory {
    fn recently_failed_actions(&self) -> Vec<String> {
        self.failures.clone()
    }

    fn turns_without_progress(&self) -> u32 {
        self.stuck_turns
    }
}
