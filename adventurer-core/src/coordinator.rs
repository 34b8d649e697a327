//! Concurrent proposal collection with a hard join barrier.
//!
//! Each advocate runs in its own task against a shared read-only snapshot.
//! A worker that errors internally already degrades to its own fallback; a
//! worker that exceeds the per-advocate deadline or panics is replaced by a
//! fallback captured before spawn. Arbitration therefore always sees a
//! complete proposal set with no holes.

use crate::advocate::{Advocate, Proposal, TurnSnapshot};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

/// Default cap on concurrently advocated issues.
pub const DEFAULT_MAX_ISSUE_ADVOCATES: usize = 5;

/// Default per-advocate deadline.
pub const DEFAULT_ADVOCATE_TIMEOUT: Duration = Duration::from_secs(30);

/// Spawns advocates and joins their proposals each turn.
#[derive(Debug, Clone)]
pub struct ProposalCoordinator {
    max_issue_advocates: usize,
    advocate_timeout: Duration,
}

impl Default for ProposalCoordinator {
    fn default() -> Self {
        Self {
            max_issue_advocates: DEFAULT_MAX_ISSUE_ADVOCATES,
            advocate_timeout: DEFAULT_ADVOCATE_TIMEOUT,
        }
    }
}

impl ProposalCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the number of issue advocates spawned per turn.
    pub fn with_max_issue_advocates(mut self, max: usize) -> Self {
        self.max_issue_advocates = max;
        self
    }

    /// Per-advocate deadline; exceeding it yields the advocate's fallback,
    /// never a stalled turn.
    pub fn with_advocate_timeout(mut self, deadline: Duration) -> Self {
        self.advocate_timeout = deadline;
        self
    }

    /// How many issue advocates may run per turn.
    pub fn max_issue_advocates(&self) -> usize {
        self.max_issue_advocates
    }

    /// Run every advocate concurrently and wait for all of them.
    ///
    /// Returns one proposal per advocate, in spawn order. Absent advocates
    /// must be filtered out by the caller before this point; the result
    /// never contains holes.
    pub async fn collect(
        &self,
        advocates: Vec<Arc<dyn Advocate>>,
        snapshot: Arc<TurnSnapshot>,
    ) -> Vec<Proposal> {
        let deadline = self.advocate_timeout;

        let handles: Vec<_> = advocates
            .into_iter()
            .map(|advocate| {
                let snapshot = Arc::clone(&snapshot);
                // Captured before spawn so a panicked worker still yields a
                // proposal at the barrier.
                let panic_fallback = advocate.fallback(&snapshot);
                let name = advocate.name();
                let handle = tokio::spawn(async move {
                    match timeout(deadline, advocate.propose(&snapshot)).await {
                        Ok(proposal) => proposal,
                        Err(_) => {
                            warn!(advocate = advocate.name().as_str(), "deadline exceeded, using fallback");
                            advocate.fallback(&snapshot)
                        }
                    }
                });
                (name, panic_fallback, handle)
            })
            .collect();

        let mut proposals = Vec::with_capacity(handles.len());
        let (names_and_fallbacks, futures): (Vec<_>, Vec<_>) = handles
            .into_iter()
            .map(|(name, fallback, handle)| ((name, fallback), handle))
            .unzip();

        for ((name, fallback), joined) in names_and_fallbacks
            .into_iter()
            .zip(join_all(futures).await)
        {
            match joined {
                Ok(proposal) => proposals.push(proposal),
                Err(err) => {
                    warn!(advocate = name.as_str(), %err, "worker failed, using fallback");
                    proposals.push(fallback);
                }
            }
        }

        proposals
    }
}
