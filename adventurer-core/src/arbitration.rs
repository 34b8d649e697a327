//! Expected-value arbitration: many proposals in, one decision out.
//!
//! Single pass per turn, stateless between turns. Heuristic inputs (failed
//! actions, stagnation) arrive on the turn snapshot from the history
//! collaborator.

use crate::advocate::{Proposal, ProposalKind, TurnSnapshot};
use crate::issue::Issue;
use crate::memory::{is_similar, DEFAULT_SIMILARITY_RATIO};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, info};

/// Errors from arbitration.
#[derive(Debug, Error)]
pub enum ArbitrationError {
    /// No advocates produced proposals; the orchestrator must handle this
    /// with a forced fallback, it is never an unrecovered crash.
    #[error("no proposals to arbitrate")]
    EmptyProposalSet,
}

/// Tunable arbitration heuristics.
#[derive(Debug, Clone)]
pub struct ArbitrationConfig {
    /// Issue importance at or above which the high-value override fires.
    pub high_value_importance: u32,
    /// Confidence at or above which the high-value override fires.
    pub high_value_confidence: u8,
    /// Stagnant turns at or above which exploration is preferred.
    pub stuck_threshold: u32,
    /// Multiplicative EV bonus for an action named by two or more
    /// proposals. The magnitude is configurable because the behavior it
    /// reproduces never documented one.
    pub consensus_bonus: f64,
}

impl Default for ArbitrationConfig {
    fn default() -> Self {
        Self {
            high_value_importance: 800,
            high_value_confidence: 80,
            stuck_threshold: 3,
            consensus_bonus: 1.25,
        }
    }
}

/// A proposal with its computed expected value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluatedProposal {
    pub proposal: Proposal,
    pub ev: f64,
}

/// A new fact the arbitration engine wants persisted.
///
/// The orchestrator turns candidates into memory records and issues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactCandidate {
    pub content: String,
    /// 800..=1000 major blocking puzzle, 500..=700 secondary lead,
    /// 100..=400 minor/optional.
    pub importance: u32,
}

/// The turn's arbitration result. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub chosen: Proposal,
    /// Full EV table over every submitted proposal.
    pub evaluated: Vec<EvaluatedProposal>,
    /// Names of the heuristic overrides that fired, in application order.
    pub overrides: Vec<String>,
    pub new_facts: Vec<FactCandidate>,
}

/// Selects one proposal per turn and flags new facts.
#[derive(Debug, Clone, Default)]
pub struct ArbitrationEngine {
    config: ArbitrationConfig,
}

impl ArbitrationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ArbitrationConfig) -> Self {
        Self { config }
    }

    /// Expected value of a proposal.
    ///
    /// Both kinds reduce to `strength_fraction * confidence`: an issue's
    /// strength is its importance out of 1000, an explorer's is its
    /// unexplored count out of 10.
    pub fn expected_value(proposal: &Proposal) -> f64 {
        let confidence = f64::from(proposal.confidence);
        match proposal.kind {
            // importance/1000 * confidence, arranged to divide last so the
            // documented worked examples come out exact.
            ProposalKind::Issue { importance, .. } => {
                f64::from(importance) * confidence / 1000.0
            }
            // unexplored/10 * confidence, capped at ten directions.
            ProposalKind::Explorer { unexplored } => {
                (unexplored.min(10) as f64) * confidence / 10.0
            }
        }
    }

    /// Run the single-pass arbitration over a complete proposal set.
    pub fn decide(
        &self,
        proposals: Vec<Proposal>,
        snapshot: &TurnSnapshot,
        open_issues: &[Issue],
    ) -> Result<Decision, ArbitrationError> {
        if proposals.is_empty() {
            return Err(ArbitrationError::EmptyProposalSet);
        }

        let evaluated: Vec<EvaluatedProposal> = proposals
            .iter()
            .map(|p| EvaluatedProposal {
                proposal: p.clone(),
                ev: Self::expected_value(p),
            })
            .collect();
        let mut overrides = Vec::new();

        let chosen = self
            .high_value_choice(&proposals, &mut overrides)
            .unwrap_or_else(|| self.weighed_choice(&proposals, snapshot, &mut overrides));

        for name in &overrides {
            info!(rule = name.as_str(), action = chosen.action.as_str(), "override applied");
        }

        let new_facts = self.scan_new_facts(&snapshot.response_text, open_issues, &chosen);

        Ok(Decision {
            chosen,
            evaluated,
            overrides,
            new_facts,
        })
    }

    /// Override (a): an issue important and confident enough is selected
    /// outright, bypassing EV comparison entirely.
    fn high_value_choice(
        &self,
        proposals: &[Proposal],
        overrides: &mut Vec<String>,
    ) -> Option<Proposal> {
        let best = proposals
            .iter()
            .filter_map(|p| match p.kind {
                ProposalKind::Issue { importance, .. }
                    if importance >= self.config.high_value_importance
                        && p.confidence >= self.config.high_value_confidence =>
                {
                    Some((importance, p))
                }
                _ => None,
            })
            .max_by_key(|(importance, p)| (*importance, p.confidence))?;

        overrides.push("high-value".to_string());
        Some(best.1.clone())
    }

    /// Overrides (b)-(d) and the final EV selection.
    fn weighed_choice(
        &self,
        proposals: &[Proposal],
        snapshot: &TurnSnapshot,
        overrides: &mut Vec<String>,
    ) -> Proposal {
        // (b) Loop avoidance: drop recently failed actions. If that would
        // discard everything, arbitration still has to decide, so the
        // filter is skipped.
        let failed: HashSet<String> = snapshot
            .recent_failures
            .iter()
            .map(|a| a.trim().to_uppercase())
            .collect();
        let mut surviving: Vec<&Proposal> = proposals
            .iter()
            .filter(|p| !failed.contains(&p.normalized_action()))
            .collect();
        if surviving.is_empty() {
            overrides.push("loop-avoidance-skipped".to_string());
            surviving = proposals.iter().collect();
        } else if surviving.len() < proposals.len() {
            overrides.push("loop-avoidance".to_string());
        }

        // (c) Stuck exploration: stagnation trumps EV if an explorer is
        // available at all.
        if snapshot.turns_without_progress >= self.config.stuck_threshold {
            if let Some(explorer) = surviving.iter().find(|p| !p.is_issue()) {
                overrides.push("stuck-exploration".to_string());
                return (*explorer).clone();
            }
        }

        // (d) Consensus: agreement between advocates boosts effective EV.
        let mut action_counts: HashMap<String, usize> = HashMap::new();
        for p in &surviving {
            *action_counts.entry(p.normalized_action()).or_default() += 1;
        }
        let consensus_fired = action_counts.values().any(|&n| n >= 2);
        if consensus_fired {
            overrides.push("consensus".to_string());
        }

        let best = surviving
            .iter()
            .map(|p| {
                let mut ev = Self::expected_value(p);
                if action_counts[&p.normalized_action()] >= 2 {
                    ev *= self.config.consensus_bonus;
                }
                debug!(producer = p.producer.as_str(), action = p.action.as_str(), ev, "effective EV");
                (*p, ev)
            })
            .max_by(|a, b| Self::preference(a, b))
            .map(|(p, _)| p.clone());

        // `surviving` is never empty here.
        best.unwrap_or_else(|| proposals[0].clone())
    }

    /// Total preference order: effective EV, then issue before explorer,
    /// then higher raw confidence.
    fn preference(a: &(&Proposal, f64), b: &(&Proposal, f64)) -> Ordering {
        a.1.partial_cmp(&b.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.is_issue().cmp(&b.0.is_issue()))
            .then_with(|| a.0.confidence.cmp(&b.0.confidence))
    }

    /// Scan the environment's response for newly introduced obstacles and
    /// opportunities not already tracked.
    ///
    /// Deterministic marker scan; blocking obstacles land at 850,
    /// secondary leads at 600, minor observations at 250.
    fn scan_new_facts(
        &self,
        response_text: &str,
        open_issues: &[Issue],
        chosen: &Proposal,
    ) -> Vec<FactCandidate> {
        let chosen_action = chosen.normalized_action();
        let mut facts = Vec::new();

        for sentence in split_sentences(response_text) {
            let Some(importance) = classify_sentence(&sentence) else {
                continue;
            };

            let already_tracked = open_issues
                .iter()
                .filter(|i| !i.resolved)
                .any(|i| is_similar(&sentence, &i.content, DEFAULT_SIMILARITY_RATIO));
            let covered_by_action =
                !chosen_action.is_empty() && sentence.to_uppercase().contains(&chosen_action);
            if already_tracked || covered_by_action {
                continue;
            }

            if !facts
                .iter()
                .any(|f: &FactCandidate| is_similar(&sentence, &f.content, DEFAULT_SIMILARITY_RATIO))
            {
                facts.push(FactCandidate {
                    content: sentence,
                    importance,
                });
            }
        }

        facts
    }
}

/// Importance for a major blocking obstacle.
const BLOCKING_IMPORTANCE: u32 = 850;
/// Importance for a secondary lead.
const LEAD_IMPORTANCE: u32 = 600;
/// Importance for a minor observation.
const MINOR_IMPORTANCE: u32 = 250;

/// Sentences shorter than this are noise, not facts.
const MIN_FACT_LEN: usize = 12;

const BLOCKING_MARKERS: [&str; 8] = [
    "locked",
    "blocked",
    "won't budge",
    "bars your way",
    "blocks your",
    "too dark",
    "impassable",
    "will not open",
];

const LEAD_MARKERS: [&str; 6] = ["closed", "key", "hidden", "engraved", "appears to be", "strange"];

const MINOR_MARKERS: [&str; 3] = ["you see", "there is", "lying here"];

fn split_sentences(text: &str) -> Vec<String> {
    text.split(['.', '!', '?', '\n'])
        .map(str::trim)
        .filter(|s| s.len() >= MIN_FACT_LEN)
        .map(str::to_string)
        .collect()
}

fn classify_sentence(sentence: &str) -> Option<u32> {
    let lower = sentence.to_lowercase();
    if BLOCKING_MARKERS.iter().any(|m| lower.contains(m)) {
        Some(BLOCKING_IMPORTANCE)
    } else if LEAD_MARKERS.iter().any(|m| lower.contains(m)) {
        Some(LEAD_IMPORTANCE)
    } else if MINOR_MARKERS.iter().any(|m| lower.contains(m)) {
        Some(MINOR_IMPORTANCE)
    } else {
        None
    }
}
