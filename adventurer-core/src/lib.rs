//! Per-turn decision core for an autonomous text-adventure agent.
//!
//! This crate provides:
//! - A spatial map with breadth-first pathfinding over discovered exits
//! - Bounded, decaying memory and a persistent issue ledger
//! - Concurrent advocates proposing candidate actions each turn
//! - Expected-value arbitration with heuristic overrides
//! - Session persistence
//!
//! The crate never talks to a game or a language model itself; the
//! [`collaborator`] traits are the seams where the embedding application
//! plugs those in.
//!
//! # Quick Start
//!
//! ```ignore
//! use adventurer_core::TurnOrchestrator;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut orchestrator = TurnOrchestrator::new(
//!         Arc::new(my_reasoner()),
//!         Arc::new(my_history_tracker()),
//!     );
//!
//!     let mut command = "LOOK".to_string();
//!     loop {
//!         let outcome = orchestrator.step(&mut environment, &command).await?;
//!         command = outcome.command;
//!     }
//! }
//! ```

pub mod advocate;
pub mod arbitration;
pub mod collaborator;
pub mod coordinator;
pub mod direction;
pub mod issue;
pub mod map;
pub mod memory;
pub mod orchestrator;
pub mod persist;
pub mod testing;

// Primary public API
pub use advocate::{Advocate, ExplorerAdvocate, IssueAdvocate, Proposal, ProposalKind, TurnSnapshot};
pub use arbitration::{ArbitrationConfig, ArbitrationEngine, Decision, FactCandidate};
pub use collaborator::{EnvResponse, Environment, HistoryAdvisor, ProgressTracker, Reasoner};
pub use coordinator::ProposalCoordinator;
pub use direction::Direction;
pub use issue::{Issue, IssueLedger};
pub use map::{Exit, SpatialMap};
pub use memory::{MemoryRecord, MemoryStore};
pub use orchestrator::{TurnError, TurnOrchestrator, TurnOutcome};
pub use persist::SessionSnapshot;
