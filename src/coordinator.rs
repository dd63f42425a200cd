//! Request lifecycle for game sessions: register, list, fetch and submit.

use crate::engine::ResultEngine;
use crate::error::GameError;
use crate::game::{Game, ResultSnapshot, ScoreUpdate, Symbol};
use crate::propagator::Propagator;
use crate::registry::{GameRegistry, Registered};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Bytes that cannot appear raw in a URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Location of a game resource, with the board ID percent-encoded as one
/// path segment.
pub fn game_location(board_id: &str) -> String {
    format!("/games/{}", utf8_percent_encode(board_id, PATH_SEGMENT))
}

/// Result of a registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Board that was registered.
    pub board_id: String,
    /// Where the new game can be fetched.
    pub location: String,
    /// Whether an existing game was replaced.
    pub outcome: Registered,
}

/// Orchestrates game sessions.
///
/// Holds no game state of its own; every operation reads or writes through
/// the [`GameRegistry`].
#[derive(Debug, Clone)]
pub struct Coordinator {
    registry: GameRegistry,
    engine: Arc<dyn ResultEngine>,
    propagator: Propagator,
}

impl Coordinator {
    /// Creates a coordinator over a registry, a rule engine and a propagator.
    #[instrument(skip_all)]
    pub fn new(
        registry: GameRegistry,
        engine: Arc<dyn ResultEngine>,
        propagator: Propagator,
    ) -> Self {
        info!(?engine, "Creating coordinator");
        Self {
            registry,
            engine,
            propagator,
        }
    }

    /// Returns the registry backing this coordinator.
    pub fn registry(&self) -> &GameRegistry {
        &self.registry
    }

    /// Registers a new game.
    ///
    /// Only the board ID is taken from `proposed`: history is cleared and both
    /// scores reset so a caller cannot seed a game with fabricated moves.
    #[instrument(skip(self, proposed), fields(board_id = %proposed.board_id))]
    pub fn register(&self, proposed: Game) -> Result<Registration, GameError> {
        validate_board_id(&proposed.board_id)?;

        if !proposed.history.is_empty() || proposed.master_score > 0 || proposed.slave_score > 0 {
            debug!(
                supplied_moves = proposed.history.len(),
                "Discarding caller-supplied history and scores"
            );
        }

        let game = Game::new(proposed.board_id);
        let board_id = game.board_id.clone();
        let outcome = self.registry.create(game)?;

        info!(?outcome, "{} registered", board_id);
        Ok(Registration {
            location: game_location(&board_id),
            board_id,
            outcome,
        })
    }

    /// Returns every game keyed by board ID.
    #[instrument(skip(self))]
    pub fn list(&self) -> BTreeMap<String, Game> {
        self.registry.list()
    }

    /// Returns the current state of one game.
    #[instrument(skip(self))]
    pub fn fetch(&self, board_id: &str) -> Result<Game, GameError> {
        self.registry.get(board_id)
    }

    /// Resolves a slave's move and returns the resulting snapshot.
    ///
    /// The rule engine runs inside the registry's atomic update, so
    /// concurrent submissions to one board are applied one after another. The
    /// new scores are queued for propagation; queueing never delays or fails
    /// the submission.
    #[instrument(skip(self, symbol), fields(slave_symbol = %symbol))]
    pub fn submit(&self, board_id: &str, symbol: Symbol) -> Result<ResultSnapshot, GameError> {
        let updated = self.registry.update(board_id, |current| {
            let next = self.engine.advance(current, &symbol);
            check_advance(current, &next)?;
            Ok(next)
        })?;

        let snapshot = updated.snapshot().ok_or_else(|| {
            error!("Updated game has no history");
            GameError::internal("Updated game has no history")
        })?;

        info!(
            master_score = snapshot.master_score,
            slave_score = snapshot.slave_score,
            master_symbol = %snapshot.master_symbol,
            moves = updated.history.len(),
            "Move resolved"
        );

        if !self
            .propagator
            .enqueue(board_id, ScoreUpdate::from(&snapshot))
        {
            warn!("Scores not queued for propagation");
        }

        Ok(snapshot)
    }
}

/// Rejects board IDs that are empty or unusable as a single URL path segment.
#[instrument]
pub fn validate_board_id(board_id: &str) -> Result<(), GameError> {
    if board_id.is_empty() {
        return Err(GameError::bad_request("boardId is required"));
    }
    if board_id.contains('/') || board_id.chars().any(char::is_control) {
        return Err(GameError::bad_request(format!(
            "boardId '{}' must not contain '/' or control characters",
            board_id.escape_debug()
        )));
    }
    Ok(())
}

/// Verifies that an engine output is a legal successor of `current`.
fn check_advance(current: &Game, next: &Game) -> Result<(), GameError> {
    let appended_one = next.history.len() == current.history.len() + 1
        && next.history.starts_with(&current.history);
    let monotonic =
        next.master_score >= current.master_score && next.slave_score >= current.slave_score;

    if !appended_one || !monotonic {
        error!(
            before_moves = current.history.len(),
            after_moves = next.history.len(),
            before = ?(current.master_score, current.slave_score),
            after = ?(next.master_score, next.slave_score),
            "Result engine produced an invalid successor"
        );
        return Err(GameError::internal("Result engine produced an invalid game state"));
    }
    Ok(())
}
