//! Persistent strategic issues tracked across turns.
//!
//! An issue is a named obstacle or opportunity (a locked grating, a troll
//! demanding payment) that keeps an advocate alive every turn until it is
//! resolved. Issues are only ever created by the arbitration engine's
//! new-fact output.

use crate::memory::is_similar;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// A tracked strategic obstacle or opportunity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: Uuid,
    pub content: String,
    /// Priority 1..=1000; higher means more critical to winning.
    pub importance: u32,
    pub turn_created: u32,
    pub location: String,
    pub resolved: bool,
}

impl Issue {
    /// A short formatted summary for advocate focus text.
    pub fn summary(&self) -> String {
        format!(
            "Issue: {} (importance {}/1000, at {}, since turn {})",
            self.content, self.importance, self.location, self.turn_created
        )
    }
}

/// The set of all issues for a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueLedger {
    issues: Vec<Issue>,
    /// Containment ratio used to suppress near-duplicate issues.
    similarity_ratio: f64,
}

impl Default for IssueLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl IssueLedger {
    pub fn new() -> Self {
        Self {
            issues: Vec::new(),
            similarity_ratio: crate::memory::DEFAULT_SIMILARITY_RATIO,
        }
    }

    /// Open a new issue unless a near-duplicate open issue already exists.
    ///
    /// On a duplicate the existing issue keeps its row and absorbs the
    /// higher importance. Returns the id of the new or merged issue.
    pub fn open(
        &mut self,
        content: &str,
        importance: u32,
        turn_created: u32,
        location: &str,
    ) -> Uuid {
        let importance = importance.clamp(1, 1000);

        for existing in self.issues.iter_mut().filter(|i| !i.resolved) {
            if is_similar(content, &existing.content, self.similarity_ratio) {
                if importance > existing.importance {
                    existing.importance = importance;
                }
                return existing.id;
            }
        }

        let issue = Issue {
            id: Uuid::new_v4(),
            content: content.trim().to_string(),
            importance,
            turn_created,
            location: location.to_string(),
            resolved: false,
        };
        info!(content = issue.content.as_str(), importance, "issue opened");
        let id = issue.id;
        self.issues.push(issue);
        id
    }

    /// Mark an issue resolved. Returns `false` if the id is unknown.
    ///
    /// Nothing in the core calls this on its own: when an issue counts as
    /// solved is the embedding application's call.
    pub fn resolve(&mut self, id: Uuid) -> bool {
        match self.issues.iter_mut().find(|i| i.id == id) {
            Some(issue) => {
                if !issue.resolved {
                    info!(content = issue.content.as_str(), "issue resolved");
                }
                issue.resolved = true;
                true
            }
            None => false,
        }
    }

    /// The `k` highest-importance open issues, as copies.
    pub fn top_open(&self, k: usize) -> Vec<Issue> {
        let mut open: Vec<Issue> = self.issues.iter().filter(|i| !i.resolved).cloned().collect();
        open.sort_by(|a, b| b.importance.cmp(&a.importance));
        open.truncate(k);
        open
    }

    /// Number of open issues.
    pub fn open_count(&self) -> usize {
        self.issues.iter().filter(|i| !i.resolved).count()
    }

    /// All issues, resolved included, for persistence.
    pub fn all(&self) -> Vec<Issue> {
        self.issues.clone()
    }

    /// Replace the ledger contents from a persistence snapshot.
    pub fn restore(&mut self, issues: Vec<Issue>) {
        self.issues = issues;
    }
}
