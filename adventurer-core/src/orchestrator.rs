//! The per-turn decision loop tying every component together.
//!
//! One call to [`TurnOrchestrator::play_turn`] consumes the environment's
//! latest response and produces the next command: update the map, snapshot
//! the turn, fan advocates out, arbitrate, then apply the decision's writes
//! after the join barrier. The orchestrator owns all mutable session state;
//! advocates only ever see immutable snapshots of it.

use crate::advocate::{Advocate, ExplorerAdvocate, IssueAdvocate, Proposal, ProposalKind, TurnSnapshot};
use crate::arbitration::{ArbitrationEngine, ArbitrationError, Decision};
use crate::collaborator::{
    EnvResponse, Environment, EnvironmentError, HistoryAdvisor, Reasoner,
};
use crate::coordinator::ProposalCoordinator;
use crate::direction::Direction;
use crate::issue::IssueLedger;
use crate::map::SpatialMap;
use crate::memory::MemoryStore;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Per-turn importance decay applied to every memory record.
pub const DEFAULT_DECAY_FACTOR: f64 = 0.97;

/// Command issued when no advocate produced a proposal.
const FORCED_FALLBACK_ACTION: &str = "LOOK";

/// Errors that abort a turn.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error(transparent)]
    Environment(#[from] EnvironmentError),

    #[error(transparent)]
    Arbitration(#[from] ArbitrationError),
}

/// What one completed turn hands back to the embedding application.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The command to send to the environment next.
    pub command: String,
    pub decision: Decision,
}

/// Owns the session state and runs the decide cycle each turn.
pub struct TurnOrchestrator {
    map: SpatialMap,
    memory: MemoryStore,
    issues: IssueLedger,
    coordinator: ProposalCoordinator,
    engine: ArbitrationEngine,
    reasoner: Arc<dyn Reasoner>,
    history: Arc<dyn HistoryAdvisor>,
    decay_factor: f64,
    turn: u32,
    /// Location at the end of the previous turn.
    prev_location: Option<String>,
    /// The command whose response the next `play_turn` call will receive.
    last_command: Option<String>,
}

impl TurnOrchestrator {
    pub fn new(reasoner: Arc<dyn Reasoner>, history: Arc<dyn HistoryAdvisor>) -> Self {
        Self {
            map: SpatialMap::new(),
            memory: MemoryStore::new(),
            issues: IssueLedger::new(),
            coordinator: ProposalCoordinator::new(),
            engine: ArbitrationEngine::new(),
            reasoner,
            history,
            decay_factor: DEFAULT_DECAY_FACTOR,
            turn: 0,
            prev_location: None,
            last_command: None,
        }
    }

    pub fn with_coordinator(mut self, coordinator: ProposalCoordinator) -> Self {
        self.coordinator = coordinator;
        self
    }

    pub fn with_engine(mut self, engine: ArbitrationEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_memory(mut self, memory: MemoryStore) -> Self {
        self.memory = memory;
        self
    }

    /// Override the per-turn memory decay factor.
    pub fn with_decay_factor(mut self, factor: f64) -> Self {
        self.decay_factor = factor;
        self
    }

    pub fn map(&self) -> &SpatialMap {
        &self.map
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    pub fn issues(&self) -> &IssueLedger {
        &self.issues
    }

    /// Mark an issue resolved. When an issue counts as solved is the
    /// embedding application's call.
    pub fn resolve_issue(&mut self, id: uuid::Uuid) -> bool {
        self.issues.resolve(id)
    }

    /// Turns completed so far.
    pub fn turn(&self) -> u32 {
        self.turn
    }

    /// Location at the end of the most recent turn.
    pub fn location(&self) -> Option<&str> {
        self.prev_location.as_deref()
    }

    /// Run one full decide cycle against the environment's latest response.
    ///
    /// All session writes happen here, strictly after the proposal join
    /// barrier; the snapshot handed to advocates reflects the state at the
    /// start of the turn.
    pub async fn play_turn(&mut self, response: &EnvResponse) -> Result<TurnOutcome, TurnError> {
        self.turn += 1;
        info!(
            turn = self.turn,
            location = response.location.as_str(),
            score = response.score,
            "turn started"
        );

        self.record_movement(response);

        let snapshot = Arc::new(TurnSnapshot {
            turn: self.turn,
            location: response.location.clone(),
            response_text: response.text.clone(),
            score: response.score,
            moves: response.moves,
            map: self.map.clone(),
            memories: self.memory.all(),
            recent_failures: self.history.recently_failed_actions(),
            turns_without_progress: self.history.turns_without_progress(),
        });

        let advocates = self.spawn_set(&snapshot);
        let decision = if advocates.is_empty() {
            // Nothing to arbitrate on turn one of a fresh session with no
            // issues and nowhere unexplored. Look around instead of stalling.
            warn!("no advocates available, forcing fallback");
            self.forced_fallback()
        } else {
            let proposals = self.coordinator.collect(advocates, Arc::clone(&snapshot)).await;
            let open_issues = self.issues.top_open(usize::MAX);
            self.engine.decide(proposals, &snapshot, &open_issues)?
        };

        self.apply_decision(&decision, response);

        let command = decision.chosen.action.clone();
        info!(
            turn = self.turn,
            command = command.as_str(),
            overrides = ?decision.overrides,
            "turn decided"
        );

        self.prev_location = Some(response.location.clone());
        self.last_command = Some(command.clone());

        Ok(TurnOutcome { command, decision })
    }

    /// Execute a command against the environment and decide the next one.
    pub async fn step<E: Environment>(
        &mut self,
        environment: &mut E,
        command: &str,
    ) -> Result<TurnOutcome, TurnError> {
        let response = environment.execute(command).await?;
        self.last_command = Some(command.to_string());
        self.play_turn(&response).await
    }

    /// Record the edge the previous command traversed, if it was a movement.
    fn record_movement(&mut self, response: &EnvResponse) {
        let (Some(prev), Some(command)) = (&self.prev_location, &self.last_command) else {
            return;
        };
        let Some(direction) = Direction::from_command(command) else {
            return;
        };
        self.map.record_normalized(prev, direction, &response.location);
    }

    /// The turn's advocate set: one per top open issue, plus the explorer
    /// when the current location still has unexplored directions.
    fn spawn_set(&self, snapshot: &TurnSnapshot) -> Vec<Arc<dyn Advocate>> {
        let mut advocates: Vec<Arc<dyn Advocate>> = self
            .issues
            .top_open(self.coordinator.max_issue_advocates())
            .into_iter()
            .map(|issue| {
                Arc::new(IssueAdvocate::new(issue, Arc::clone(&self.reasoner))) as Arc<dyn Advocate>
            })
            .collect();

        if let Some(explorer) = ExplorerAdvocate::for_turn(
            &snapshot.map,
            &snapshot.location,
            &snapshot.response_text,
            Arc::clone(&self.reasoner),
        ) {
            advocates.push(Arc::new(explorer));
        }

        advocates
    }

    /// Decision issued when the advocate set came up empty.
    fn forced_fallback(&self) -> Decision {
        Decision {
            chosen: Proposal {
                producer: "orchestrator".to_string(),
                kind: ProposalKind::Explorer { unexplored: 0 },
                action: FORCED_FALLBACK_ACTION.to_string(),
                confidence: 10,
                rationale: "No advocates available this turn".to_string(),
            },
            evaluated: Vec::new(),
            overrides: vec!["forced-fallback".to_string()],
            new_facts: Vec::new(),
        }
    }

    /// Post-barrier writes: persist new facts, then decay.
    fn apply_decision(&mut self, decision: &Decision, response: &EnvResponse) {
        for fact in &decision.new_facts {
            let inserted = self.memory.add(
                &fact.content,
                f64::from(fact.importance),
                self.turn,
                &response.location,
                response.score,
                response.moves,
            );
            if inserted {
                self.issues
                    .open(&fact.content, fact.importance, self.turn, &response.location);
            }
        }
        self.memory.decay_all(self.decay_factor);
    }

    // Persistence hooks; the snapshot format lives in `crate::persist`.

    pub(crate) fn session_state(&self) -> SessionState {
        SessionState {
            turn: self.turn,
            location: self.prev_location.clone(),
            last_command: self.last_command.clone(),
        }
    }

    pub(crate) fn restore_session(
        &mut self,
        map: SpatialMap,
        memory_records: Vec<crate::memory::MemoryRecord>,
        issues: Vec<crate::issue::Issue>,
        state: SessionState,
    ) {
        self.map = map;
        self.memory.restore(memory_records);
        self.issues.restore(issues);
        self.turn = state.turn;
        self.prev_location = state.location;
        self.last_command = state.last_command;
    }
}

/// Scalar session fields carried through persistence.
#[derive(Debug, Clone)]
pub(crate) struct SessionState {
    pub turn: u32,
    pub location: Option<String>,
    pub last_command: Option<String>,
}
