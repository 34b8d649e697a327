//! Proposal producers: one concern, one candidate action per turn.
//!
//! Advocates share a single capability: given a read-only snapshot of the
//! turn, produce exactly one proposal. A failed research step never aborts
//! the turn; the advocate degrades to a fallback proposal instead.

use crate::collaborator::{ProposalRequest, Reasoner};
use crate::direction::Direction;
use crate::issue::Issue;
use crate::map::SpatialMap;
use crate::memory::MemoryRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// How many memory records to summarize into reasoner context.
const CONTEXT_MEMORY_LIMIT: usize = 10;

/// Confidence assigned to an issue advocate's fallback proposal.
const ISSUE_FALLBACK_CONFIDENCE: u8 = 20;

/// Explorer confidence never exceeds this (never fully certain).
const EXPLORER_CONFIDENCE_CAP: u8 = 95;

/// Bonus when the chosen direction is named in the location description.
const MENTION_BONUS: u8 = 20;

/// Read-only view of the turn handed to every advocate at spawn time.
///
/// Advocates never mutate shared state; all writes happen after the
/// coordinator's join barrier.
#[derive(Debug, Clone)]
pub struct TurnSnapshot {
    pub turn: u32,
    pub location: String,
    pub response_text: String,
    pub score: i32,
    pub moves: u32,
    pub map: SpatialMap,
    pub memories: Vec<MemoryRecord>,
    pub recent_failures: Vec<String>,
    pub turns_without_progress: u32,
}

impl TurnSnapshot {
    /// Memory summary for reasoner context.
    pub fn memory_summary(&self) -> String {
        self.memories
            .iter()
            .take(CONTEXT_MEMORY_LIMIT)
            .map(|r| format!("- [{:.0}/1000] {}", r.importance, r.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Which kind of advocate produced a proposal, with kind-specific data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProposalKind {
    Issue {
        issue_id: Uuid,
        /// The advocated issue's importance, 1..=1000.
        importance: u32,
    },
    Explorer {
        /// Count of unexplored directions at the current location.
        unexplored: usize,
    },
}

/// One advocate's candidate action for the turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    /// Stable identifier of the producing advocate.
    pub producer: String,
    pub kind: ProposalKind,
    pub action: String,
    /// Confidence 0..=100.
    pub confidence: u8,
    pub rationale: String,
}

impl Proposal {
    /// Action normalized for comparison (loop avoidance, consensus).
    pub fn normalized_action(&self) -> String {
        self.action.trim().to_uppercase()
    }

    /// Whether this proposal came from an issue advocate.
    pub fn is_issue(&self) -> bool {
        matches!(self.kind, ProposalKind::Issue { .. })
    }
}

/// Shared capability: produce one proposal from the turn snapshot.
///
/// `propose` must always return a proposal; internal failures degrade to
/// `fallback`. The coordinator also uses `fallback` directly when a worker
/// times out or panics.
#[async_trait]
pub trait Advocate: Send + Sync {
    /// Stable identifier for logs and the proposal's `producer` field.
    fn name(&self) -> String;

    async fn propose(&self, snapshot: &TurnSnapshot) -> Proposal;

    fn fallback(&self, snapshot: &TurnSnapshot) -> Proposal;
}

// ============================================================================
// IssueAdvocate
// ============================================================================

/// Advocates for solving one specific tracked issue.
///
/// Bound to its issue at construction and re-created for the same issue
/// every turn until the issue is resolved.
pub struct IssueAdvocate {
    issue: Issue,
    reasoner: Arc<dyn Reasoner>,
}

impl IssueAdvocate {
    pub fn new(issue: Issue, reasoner: Arc<dyn Reasoner>) -> Self {
        Self { issue, reasoner }
    }

    pub fn issue(&self) -> &Issue {
        &self.issue
    }

    fn kind(&self) -> ProposalKind {
        ProposalKind::Issue {
            issue_id: self.issue.id,
            importance: self.issue.importance,
        }
    }

    /// Focus text for the reasoner: the issue plus how to get back to it.
    fn focus(&self, snapshot: &TurnSnapshot) -> String {
        let mut focus = self.issue.summary();
        if !self
            .issue
            .location
            .eq_ignore_ascii_case(&snapshot.location)
        {
            match snapshot.map.path_string(&snapshot.location, &self.issue.location) {
                Some(route) if !route.is_empty() => {
                    focus.push_str(&format!("\nRoute from here: {route}"));
                }
                _ => focus.push_str("\nNo known route from the current location."),
            }
        }
        focus
    }
}

#[async_trait]
impl Advocate for IssueAdvocate {
    fn name(&self) -> String {
        format!("issue-{}", self.issue.id.simple())
    }

    async fn propose(&self, snapshot: &TurnSnapshot) -> Proposal {
        let request = ProposalRequest {
            focus: self.focus(snapshot),
            location: snapshot.location.clone(),
            response_text: snapshot.response_text.clone(),
            map_summary: snapshot.map.summary(),
            memory_summary: snapshot.memory_summary(),
        };

        match self.reasoner.propose_action(request).await {
            Ok(reasoned) => Proposal {
                producer: self.name(),
                kind: self.kind(),
                action: reasoned.action,
                confidence: reasoned.confidence.min(100),
                rationale: reasoned.rationale,
            },
            Err(err) => {
                warn!(advocate = self.name().as_str(), %err, "research failed, using fallback");
                self.fallback(snapshot)
            }
        }
    }

    fn fallback(&self, snapshot: &TurnSnapshot) -> Proposal {
        // Without research, the best safe move is heading back toward the
        // issue's location, or looking around if we are already there.
        let action = if self.issue.location.eq_ignore_ascii_case(&snapshot.location) {
            "LOOK".to_string()
        } else {
            match snapshot.map.next_step(&snapshot.location, &self.issue.location) {
                Some(step) => format!("GO {step}"),
                None => "LOOK".to_string(),
            }
        };

        Proposal {
            producer: self.name(),
            kind: self.kind(),
            action,
            confidence: ISSUE_FALLBACK_CONFIDENCE,
            rationale: format!(
                "Research unavailable; keeping issue in play: {}",
                self.issue.content
            ),
        }
    }
}

// ============================================================================
// ExplorerAdvocate
// ============================================================================

/// Advocates for exploring the best unexplored direction.
///
/// Instantiated fresh each turn, and only when the current location still
/// has unexplored directions.
pub struct ExplorerAdvocate {
    location: String,
    unexplored: Vec<Direction>,
    mentioned: Vec<Direction>,
    best: Direction,
    confidence: u8,
    reasoner: Arc<dyn Reasoner>,
}

impl ExplorerAdvocate {
    /// Build the turn's explorer, or `None` when nothing is unexplored.
    pub fn for_turn(
        map: &SpatialMap,
        location: &str,
        response_text: &str,
        reasoner: Arc<dyn Reasoner>,
    ) -> Option<Self> {
        let unexplored = map.unexplored_from(location);
        if unexplored.is_empty() {
            return None;
        }

        // Only directions we have not tried count as mentioned.
        let mentioned: Vec<Direction> = Direction::mentioned_in(response_text)
            .into_iter()
            .filter(|d| unexplored.contains(d))
            .collect();

        let best = Self::pick_best(&unexplored, &mentioned);
        let confidence = Self::confidence_for(&unexplored, &mentioned, best);

        Some(Self {
            location: location.to_string(),
            unexplored,
            mentioned,
            best,
            confidence,
            reasoner,
        })
    }

    /// The direction this explorer will advocate for.
    pub fn best_direction(&self) -> Direction {
        self.best
    }

    /// Priority: mentioned in the description, then cardinal, then diagonal,
    /// then vertical.
    fn pick_best(unexplored: &[Direction], mentioned: &[Direction]) -> Direction {
        if let Some(first) = mentioned.first() {
            return *first;
        }
        for group in [
            Direction::CARDINALS.as_slice(),
            Direction::DIAGONALS.as_slice(),
            Direction::VERTICALS.as_slice(),
        ] {
            if let Some(d) = group.iter().find(|d| unexplored.contains(d)) {
                return *d;
            }
        }
        unexplored[0]
    }

    /// Base confidence scales with how much remains unexplored; a mention
    /// in the description adds a bonus; capped below certainty.
    fn confidence_for(unexplored: &[Direction], mentioned: &[Direction], chosen: Direction) -> u8 {
        let base = match unexplored.len() {
            n if n >= 6 => 75,
            n if n >= 4 => 65,
            n if n >= 2 => 55,
            _ => 45,
        };
        let bonus = if mentioned.contains(&chosen) {
            MENTION_BONUS
        } else {
            0
        };
        (base + bonus).min(EXPLORER_CONFIDENCE_CAP)
    }

    fn kind(&self) -> ProposalKind {
        ProposalKind::Explorer {
            unexplored: self.unexplored.len(),
        }
    }

    fn action(&self) -> String {
        format!("GO {}", self.best)
    }
}

#[async_trait]
impl Advocate for ExplorerAdvocate {
    fn name(&self) -> String {
        "explorer".to_string()
    }

    async fn propose(&self, snapshot: &TurnSnapshot) -> Proposal {
        // Action and confidence are computed locally; the reasoner only
        // supplies the rationale, so a failed call costs nothing but prose.
        let request = ProposalRequest {
            focus: format!(
                "Advocate exploring {} from {} ({} unexplored: {}; mentioned: {})",
                self.best,
                self.location,
                self.unexplored.len(),
                join_directions(&self.unexplored),
                if self.mentioned.is_empty() {
                    "none".to_string()
                } else {
                    join_directions(&self.mentioned)
                },
            ),
            location: snapshot.location.clone(),
            response_text: snapshot.response_text.clone(),
            map_summary: snapshot.map.summary(),
            memory_summary: snapshot.memory_summary(),
        };

        match self.reasoner.propose_action(request).await {
            Ok(reasoned) => Proposal {
                producer: self.name(),
                kind: self.kind(),
                action: self.action(),
                confidence: self.confidence,
                rationale: reasoned.rationale,
            },
            Err(err) => {
                warn!(advocate = "explorer", %err, "research failed, using fallback");
                self.fallback(snapshot)
            }
        }
    }

    fn fallback(&self, _snapshot: &TurnSnapshot) -> Proposal {
        Proposal {
            producer: self.name(),
            kind: self.kind(),
            action: self.action(),
            confidence: self.confidence,
            rationale: format!(
                "Explore {} ({} unexplored directions remain from {})",
                self.best,
                self.unexplored.len(),
                self.location
            ),
        }
    }
}

fn join_directions(directions: &[Direction]) -> String {
    directions
        .iter()
        .map(Direction::name)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockReasoner;

    fn snapshot_at(location: &str, response_text: &str, map: SpatialMap) -> TurnSnapshot {
        TurnSnapshot {
            turn: 1,
            location: location.to_string(),
            response_text: response_text.to_string(),
            score: 0,
            moves: 1,
            map,
            memories: Vec::new(),
            recent_failures: Vec::new(),
            turns_without_progress: 0,
        }
    }

    fn sample_issue(content: &str, importance: u32, location: &str) -> Issue {
        Issue {
            id: Uuid::new_v4(),
            content: content.to_string(),
            importance,
            turn_created: 1,
            location: location.to_string(),
            resolved: false,
        }
    }

    #[test]
    fn explorer_absent_when_everything_explored() {
        let mut map = SpatialMap::new();
        for d in Direction::ALL {
            map.record_normalized("Dead End", d, "Dead End");
        }
        let explorer = ExplorerAdvocate::for_turn(
            &map,
            "Dead End",
            "You are at a dead end.",
            Arc::new(MockReasoner::empty()),
        );
        assert!(explorer.is_none());
    }

    #[test]
    fn explorer_prefers_mentioned_direction() {
        let map = SpatialMap::new();
        let explorer = ExplorerAdvocate::for_turn(
            &map,
            "Forest",
            "A narrow trail winds up the hill.",
            Arc::new(MockReasoner::empty()),
        )
        .unwrap();
        assert_eq!(explorer.best_direction(), Direction::Up);
        // 10 unexplored -> base 75, +20 mention bonus, capped at 95.
        assert_eq!(explorer.confidence, 95);
    }

    #[test]
    fn explorer_falls_back_to_cardinal_priority() {
        let mut map = SpatialMap::new();
        map.record_normalized("Forest", Direction::North, "Clearing");
        map.record_normalized("Forest", Direction::South, "Forest");

        let explorer = ExplorerAdvocate::for_turn(
            &map,
            "Forest",
            "You are in a forest.",
            Arc::new(MockReasoner::empty()),
        )
        .unwrap();
        assert_eq!(explorer.best_direction(), Direction::East);
        // 8 unexplored -> base 75, no mention bonus.
        assert_eq!(explorer.confidence, 75);
    }

    #[test]
    fn explorer_confidence_scales_with_unexplored_count() {
        let mut map = SpatialMap::new();
        for d in &Direction::ALL[..9] {
            map.record_normalized("Cave", *d, "Cave");
        }
        // Only DOWN remains.
        let explorer = ExplorerAdvocate::for_turn(
            &map,
            "Cave",
            "It is pitch black.",
            Arc::new(MockReasoner::empty()),
        )
        .unwrap();
        assert_eq!(explorer.best_direction(), Direction::Down);
        assert_eq!(explorer.confidence, 45);
    }

    #[tokio::test]
    async fn explorer_survives_reasoner_failure() {
        let map = SpatialMap::new();
        let explorer = ExplorerAdvocate::for_turn(
            &map,
            "Forest",
            "Paths lead north and east.",
            Arc::new(MockReasoner::failing()),
        )
        .unwrap();

        let snapshot = snapshot_at("Forest", "Paths lead north and east.", SpatialMap::new());
        let proposal = explorer.propose(&snapshot).await;

        assert_eq!(proposal.action, "GO NORTH");
        assert_eq!(proposal.confidence, 95);
        assert!(matches!(
            proposal.kind,
            ProposalKind::Explorer { unexplored: 10 }
        ));
    }

    #[tokio::test]
    async fn issue_advocate_uses_reasoned_proposal() {
        let issue = sample_issue("locked grating blocks the way down", 800, "Clearing");
        let advocate = IssueAdvocate::new(
            issue,
            Arc::new(MockReasoner::scripted("UNLOCK GRATING WITH KEY", 85, "we hold the key")),
        );

        let snapshot = snapshot_at("Clearing", "You are in a clearing.", SpatialMap::new());
        let proposal = advocate.propose(&snapshot).await;

        assert_eq!(proposal.action, "UNLOCK GRATING WITH KEY");
        assert_eq!(proposal.confidence, 85);
        assert!(proposal.is_issue());
    }

    #[tokio::test]
    async fn issue_advocate_fallback_heads_toward_issue() {
        let mut map = SpatialMap::new();
        map.record_normalized("Forest", Direction::East, "Clearing");

        let issue = sample_issue("locked grating blocks the way down", 800, "Clearing");
        let advocate = IssueAdvocate::new(issue, Arc::new(MockReasoner::failing()));

        let snapshot = snapshot_at("Forest", "You are in a forest.", map);
        let proposal = advocate.propose(&snapshot).await;

        assert_eq!(proposal.action, "GO EAST");
        assert_eq!(proposal.confidence, ISSUE_FALLBACK_CONFIDENCE);
        assert!(proposal.rationale.contains("Research unavailable"));
    }

    #[tokio::test]
    async fn issue_advocate_fallback_looks_when_already_there() {
        let issue = sample_issue("small mailbox here", 300, "West Of House");
        let advocate = IssueAdvocate::new(issue, Arc::new(MockReasoner::failing()));

        let snapshot = snapshot_at("West Of House", "You are west of the house.", SpatialMap::new());
        let proposal = advocate.propose(&snapshot).await;
        assert_eq!(proposal.action, "LOOK");
    }
}
