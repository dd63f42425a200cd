//! Tests for the session coordinator, using a stub rule engine.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use board_master::{
    Coordinator, DuplicatePolicy, Game, GameErrorKind, GameRegistry, HistoryEntry,
    PropagationError, Propagator, Registered, ResultEngine, ScoreCollector, ScoreUpdate, Symbol,
    game_location,
};
use tokio::task::JoinHandle;

/// Master always plays "M<n>"; every move scores one point for the slave.
#[derive(Debug)]
struct CountingEngine;

impl ResultEngine for CountingEngine {
    fn advance(&self, game: &Game, slave_symbol: &Symbol) -> Game {
        let mut next = game.clone();
        let master = Symbol::new(format!("M{}", game.history.len() + 1));
        next.history.push(HistoryEntry::new(master, slave_symbol.clone()));
        next.slave_score += 1;
        next
    }
}

/// Breaks the engine contract by lowering a score.
#[derive(Debug)]
struct RegressingEngine;

impl ResultEngine for RegressingEngine {
    fn advance(&self, game: &Game, slave_symbol: &Symbol) -> Game {
        let mut next = CountingEngine.advance(game, slave_symbol);
        next.master_score = 0;
        next.slave_score = 0;
        next
    }
}

/// Breaks the engine contract by appending nothing.
#[derive(Debug)]
struct StallingEngine;

impl ResultEngine for StallingEngine {
    fn advance(&self, game: &Game, _slave_symbol: &Symbol) -> Game {
        game.clone()
    }
}

#[derive(Debug, Default)]
struct RecordingCollector {
    received: Mutex<Vec<(String, ScoreUpdate)>>,
}

#[async_trait]
impl ScoreCollector for RecordingCollector {
    async fn put_scores(&self, board_id: &str, update: ScoreUpdate) -> Result<(), PropagationError> {
        self.received
            .lock()
            .expect("Lock poisoned")
            .push((board_id.to_string(), update));
        Ok(())
    }
}

fn setup(
    engine: Arc<dyn ResultEngine>,
    policy: DuplicatePolicy,
) -> (Coordinator, Arc<RecordingCollector>, JoinHandle<()>) {
    let collector = Arc::new(RecordingCollector::default());
    let (propagator, worker) = Propagator::spawn(collector.clone(), 64);
    let coordinator = Coordinator::new(GameRegistry::with_policy(policy), engine, propagator);
    (coordinator, collector, worker)
}

/// Drops the coordinator and waits until every queued score was delivered.
async fn drain(coordinator: Coordinator, worker: JoinHandle<()>) {
    drop(coordinator);
    worker.await.expect("Worker panicked");
}

#[tokio::test]
async fn test_register_forces_empty_history_and_zero_scores() {
    let (coordinator, _collector, _worker) =
        setup(Arc::new(CountingEngine), DuplicatePolicy::Overwrite);

    let proposed = Game {
        board_id: "B1".to_string(),
        master_score: 7,
        slave_score: 3,
        history: vec![HistoryEntry::new("ROCK".into(), "PAPER".into())],
    };
    let registration = coordinator.register(proposed).expect("Register failed");
    assert_eq!(registration.board_id, "B1");
    assert_eq!(registration.location, "/games/B1");
    assert_eq!(registration.outcome, Registered::Created);

    let game = coordinator.fetch("B1").expect("Fetch failed");
    assert!(game.history.is_empty());
    assert_eq!((game.master_score, game.slave_score), (0, 0));
}

#[tokio::test]
async fn test_register_rejects_invalid_board_ids() {
    let (coordinator, _collector, _worker) =
        setup(Arc::new(CountingEngine), DuplicatePolicy::Overwrite);

    for id in ["", "a/b", "tab\there"] {
        let err = coordinator
            .register(Game::new(id))
            .expect_err("Registration should fail");
        assert_eq!(err.kind, GameErrorKind::BadRequest, "id {:?}", id);
    }
    assert!(coordinator.list().is_empty());
}

#[test]
fn test_game_location_encodes_reserved_characters() {
    assert_eq!(game_location("B1"), "/games/B1");
    assert_eq!(game_location("a?b"), "/games/a%3Fb");
    assert_eq!(game_location("a#b"), "/games/a%23b");
    assert_eq!(game_location("a%2Fb"), "/games/a%252Fb");
    assert_eq!(game_location("board 1"), "/games/board%201");
    assert_eq!(game_location("é"), "/games/%C3%A9");
}

#[tokio::test]
async fn test_register_duplicate_respects_policy() {
    let (coordinator, _collector, _worker) =
        setup(Arc::new(CountingEngine), DuplicatePolicy::Reject);
    coordinator.register(Game::new("B1")).expect("Register failed");
    let err = coordinator
        .register(Game::new("B1"))
        .expect_err("Duplicate should fail");
    assert_eq!(err.kind, GameErrorKind::Conflict);

    let (coordinator, _collector, _worker) =
        setup(Arc::new(CountingEngine), DuplicatePolicy::Overwrite);
    coordinator.register(Game::new("B1")).expect("Register failed");
    let again = coordinator.register(Game::new("B1")).expect("Overwrite failed");
    assert_eq!(again.outcome, Registered::Replaced);
}

#[tokio::test]
async fn test_fetch_unknown_board_is_not_found() {
    let (coordinator, _collector, _worker) =
        setup(Arc::new(CountingEngine), DuplicatePolicy::Overwrite);
    coordinator.register(Game::new("B1")).expect("Register failed");

    for id in ["", "b1", "B1 ", "unknown-board"] {
        let err = coordinator.fetch(id).expect_err("Fetch should fail");
        assert!(err.is_not_found(), "id {:?}", id);
    }
}

#[tokio::test]
async fn test_submit_unknown_board_is_not_found() {
    let (coordinator, collector, worker) =
        setup(Arc::new(CountingEngine), DuplicatePolicy::Overwrite);

    let err = coordinator
        .submit("nope", Symbol::from("X"))
        .expect_err("Submit should fail");
    assert!(err.is_not_found());

    drain(coordinator, worker).await;
    assert!(collector.received.lock().expect("Lock poisoned").is_empty());
}

#[tokio::test]
async fn test_first_move_scenario() {
    let (coordinator, collector, worker) =
        setup(Arc::new(CountingEngine), DuplicatePolicy::Overwrite);
    coordinator.register(Game::new("B1")).expect("Register failed");

    let snapshot = coordinator
        .submit("B1", Symbol::from("X"))
        .expect("Submit failed");
    assert_eq!(snapshot.slave_symbol, Symbol::from("X"));
    assert_eq!(snapshot.master_symbol, Symbol::from("M1"));
    assert_eq!((snapshot.master_score, snapshot.slave_score), (0, 1));

    let game = coordinator.fetch("B1").expect("Fetch failed");
    assert_eq!(game.history.len(), 1);

    drain(coordinator, worker).await;
    let received = collector.received.lock().expect("Lock poisoned");
    assert_eq!(*received, vec![("B1".to_string(), ScoreUpdate::new(0, 1))]);
}

#[tokio::test]
async fn test_snapshot_reflects_latest_entry_across_interleaved_boards() {
    let (coordinator, _collector, _worker) =
        setup(Arc::new(CountingEngine), DuplicatePolicy::Overwrite);
    coordinator.register(Game::new("A")).expect("Register failed");
    coordinator.register(Game::new("B")).expect("Register failed");

    for round in 1..=5u32 {
        for board in ["A", "B"] {
            let symbol = format!("{board}{round}");
            let snapshot = coordinator
                .submit(board, Symbol::new(symbol.clone()))
                .expect("Submit failed");
            assert_eq!(snapshot.slave_symbol, Symbol::new(symbol));
            assert_eq!(snapshot.master_symbol, Symbol::new(format!("M{round}")));
            assert_eq!(snapshot.slave_score, round);

            let game = coordinator.fetch(board).expect("Fetch failed");
            assert_eq!(game.snapshot(), Some(snapshot));
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submissions_lose_nothing() {
    const SUBMISSIONS: usize = 64;

    let (coordinator, collector, worker) =
        setup(Arc::new(CountingEngine), DuplicatePolicy::Overwrite);
    coordinator.register(Game::new("B1")).expect("Register failed");

    let tasks: Vec<_> = (0..SUBMISSIONS)
        .map(|i| {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .submit("B1", Symbol::new(format!("S{i}")))
                    .expect("Submit failed")
            })
        })
        .collect();

    let mut slave_scores = Vec::new();
    for task in tasks {
        slave_scores.push(task.await.expect("Task panicked").slave_score);
    }

    let game = coordinator.fetch("B1").expect("Fetch failed");
    assert_eq!(game.history.len(), SUBMISSIONS);
    assert_eq!(game.slave_score as usize, SUBMISSIONS);

    // Every submission saw a distinct post-update state.
    slave_scores.sort_unstable();
    let expected: Vec<u32> = (1..=SUBMISSIONS as u32).collect();
    assert_eq!(slave_scores, expected);

    // Master symbols follow the order the updates were applied in.
    for (i, entry) in game.history.iter().enumerate() {
        assert_eq!(entry.master_symbol, Symbol::new(format!("M{}", i + 1)));
    }
    let mut slaves: Vec<String> = game
        .history
        .iter()
        .map(|e| e.slave_symbol.to_string())
        .collect();
    slaves.sort();
    slaves.dedup();
    assert_eq!(slaves.len(), SUBMISSIONS);

    // Delivery order is not guaranteed, only that each submission was sent once.
    drain(coordinator, worker).await;
    assert_eq!(
        collector.received.lock().expect("Lock poisoned").len(),
        SUBMISSIONS
    );
}

#[tokio::test]
async fn test_engine_that_lowers_scores_is_rejected() {
    let (coordinator, _collector, _worker) =
        setup(Arc::new(CountingEngine), DuplicatePolicy::Overwrite);
    coordinator.register(Game::new("B1")).expect("Register failed");
    coordinator
        .submit("B1", Symbol::from("X"))
        .expect("Submit failed");
    let registry = coordinator.registry().clone();

    let (propagator, _worker) = Propagator::spawn(Arc::new(RecordingCollector::default()), 4);
    let broken = Coordinator::new(registry, Arc::new(RegressingEngine), propagator);
    let err = broken
        .submit("B1", Symbol::from("Y"))
        .expect_err("Regressing engine must be rejected");
    assert_eq!(err.kind, GameErrorKind::Internal);

    let game = broken.fetch("B1").expect("Fetch failed");
    assert_eq!(game.history.len(), 1);
    assert_eq!(game.slave_score, 1);
}

#[tokio::test]
async fn test_engine_that_appends_nothing_is_rejected() {
    let (coordinator, _collector, _worker) =
        setup(Arc::new(StallingEngine), DuplicatePolicy::Overwrite);
    coordinator.register(Game::new("B1")).expect("Register failed");

    let err = coordinator
        .submit("B1", Symbol::from("X"))
        .expect_err("Stalling engine must be rejected");
    assert_eq!(err.kind, GameErrorKind::Internal);
    assert!(coordinator.fetch("B1").expect("Fetch failed").history.is_empty());
}
