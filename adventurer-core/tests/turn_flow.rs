//! Integration tests for the full turn cycle with scripted collaborators.
//!
//! These drive the orchestrator end to end: map building, fact capture,
//! issue-keeping across turns, and the arbitration heuristics as they
//! surface through real turns. No network, no real game process.

use adventurer_core::collaborator::EnvResponse;
use adventurer_core::testing::{MockReasoner, ScriptedEnvironment, ScriptedHistory};
use adventurer_core::{Direction, ProgressTracker, TurnOrchestrator};
use std::sync::Arc;

fn response(text: &str, location: &str, score: i32, moves: u32) -> EnvResponse {
    EnvResponse {
        text: text.to_string(),
        location: location.to_string(),
        score,
        moves,
    }
}

#[tokio::test]
async fn multi_turn_session_builds_map_memory_and_issues() {
    let mut environment = ScriptedEnvironment::new(vec![
        response(
            "You are standing in an open field west of a white house. \
             There is a small mailbox here.",
            "West Of House",
            0,
            1,
        ),
        response(
            "This is a forest, with tall trees on all sides.",
            "Forest",
            0,
            2,
        ),
        response("The grating is locked.", "Clearing", 0, 3),
    ]);

    let mut orchestrator = TurnOrchestrator::new(
        Arc::new(MockReasoner::empty()),
        Arc::new(ScriptedHistory::quiet()),
    );

    let mut command = "LOOK".to_string();
    for _ in 0..3 {
        let outcome = orchestrator.step(&mut environment, &command).await.unwrap();
        command = outcome.command;
    }

    // Turn 1 mentions WEST, so the explorer goes west; turn 2 falls back to
    // cardinal priority. Both moves leave edges behind.
    assert_eq!(environment.executed()[1], "GO WEST");
    assert_eq!(environment.executed()[2], "GO NORTH");
    assert_eq!(
        orchestrator.map().shortest_path("West Of House", "Clearing"),
        Some(vec![Direction::West, Direction::North])
    );

    // The mailbox observation and the locked grating both became issues,
    // the grating at blocking importance.
    assert_eq!(orchestrator.issues().open_count(), 2);
    let top = orchestrator.issues().top_open(1);
    assert_eq!(top[0].content, "The grating is locked");
    assert_eq!(top[0].importance, 850);
    assert_eq!(orchestrator.memory().len(), 2);
    assert_eq!(orchestrator.turn(), 3);
}

#[tokio::test]
async fn recently_failed_action_is_not_retried() {
    let tracker = Arc::new(ProgressTracker::new());
    let mut orchestrator = TurnOrchestrator::new(
        Arc::new(MockReasoner::empty()),
        Arc::clone(&tracker) as Arc<dyn adventurer_core::HistoryAdvisor>,
    );

    // Turn 1 opens a blocking issue at the clearing.
    orchestrator
        .play_turn(&response("The grating is locked.", "Clearing", 0, 1))
        .await
        .unwrap();

    // The explorer's next pick from the clearing will be GO SOUTH (north is
    // blocked after this turn's non-move). Mark it failed up front.
    tracker.note_failed("GO SOUTH");

    let outcome = orchestrator
        .play_turn(&response("You are in the clearing.", "Clearing", 0, 2))
        .await
        .unwrap();

    assert!(outcome
        .decision
        .overrides
        .contains(&"loop-avoidance".to_string()));
    assert_ne!(outcome.command, "GO SOUTH");
    // The surviving proposal is the issue advocate's on-site fallback.
    assert_eq!(outcome.command, "LOOK");
}

#[tokio::test]
async fn stagnation_forces_exploration() {
    let mut orchestrator = TurnOrchestrator::new(
        Arc::new(MockReasoner::scripted("EXAMINE GRATING", 79, "worth a look")),
        Arc::new(ScriptedHistory::new(Vec::new(), 3)),
    );

    orchestrator
        .play_turn(&response("The grating is locked.", "Clearing", 0, 1))
        .await
        .unwrap();

    let outcome = orchestrator
        .play_turn(&response("You are in the clearing.", "Clearing", 0, 2))
        .await
        .unwrap();

    // Three stagnant turns: the explorer wins even against a reasoned
    // issue proposal.
    assert!(outcome
        .decision
        .overrides
        .contains(&"stuck-exploration".to_string()));
    assert!(outcome.command.starts_with("GO "));
}

#[tokio::test]
async fn score_drop_and_blocked_moves_leave_the_turn_alive() {
    let mut orchestrator = TurnOrchestrator::new(
        Arc::new(MockReasoner::empty()),
        Arc::new(ScriptedHistory::quiet()),
    );

    orchestrator
        .play_turn(&response("A dark tunnel.", "Tunnel", 10, 5))
        .await
        .unwrap();

    // Same location, lower score: still a normal turn with a decision.
    let outcome = orchestrator
        .play_turn(&response("A lurking grue bites you.", "Tunnel", 4, 6))
        .await
        .unwrap();

    assert!(!outcome.command.is_empty());
    use adventurer_core::Exit;
    // The non-move was recorded as a blocked edge.
    assert!(orchestrator
        .map()
        .exits_from("Tunnel")
        .contains(&(Direction::North, Exit::Blocked)));
}

#[tokio::test]
async fn transcript_exhaustion_surfaces_as_turn_error() {
    let mut environment = ScriptedEnvironment::new(Vec::new());
    let mut orchestrator = TurnOrchestrator::new(
        Arc::new(MockReasoner::empty()),
        Arc::new(ScriptedHistory::quiet()),
    );

    let result = orchestrator.step(&mut environment, "LOOK").await;
    assert!(matches!(
        result,
        Err(adventurer_core::TurnError::Environment(_))
    ));
}
