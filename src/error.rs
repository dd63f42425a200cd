//! Error types for the game coordinator.

use derive_more::{Display, Error};
use tracing::instrument;

/// Classification of a coordinator failure.
///
/// Each kind maps onto exactly one HTTP status in the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum GameErrorKind {
    /// The request body could not be decoded or failed validation.
    #[display("bad request")]
    BadRequest,
    /// No game is registered under the requested board ID.
    #[display("not found")]
    NotFound,
    /// A game is already registered under the board ID and duplicates are rejected.
    #[display("conflict")]
    Conflict,
    /// The HTTP verb is not supported on the requested path.
    #[display("method not allowed")]
    MethodNotAllowed,
    /// Serialization failure or a broken internal invariant.
    #[display("internal failure")]
    Internal,
}

/// Coordinator error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Game error ({}): {} at {}:{}", kind, message, file, line)]
pub struct GameError {
    /// What went wrong, coarsely.
    pub kind: GameErrorKind,
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl GameError {
    /// Creates a new error of the given kind with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(kind: GameErrorKind, message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// Malformed or invalid input.
    #[track_caller]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(GameErrorKind::BadRequest, message)
    }

    /// Unknown board ID.
    #[track_caller]
    pub fn not_found(board_id: &str) -> Self {
        Self::new(
            GameErrorKind::NotFound,
            format!("No game registered for board '{}'", board_id),
        )
    }

    /// Board ID already registered.
    #[track_caller]
    pub fn conflict(board_id: &str) -> Self {
        Self::new(
            GameErrorKind::Conflict,
            format!("Game already registered for board '{}'", board_id),
        )
    }

    /// Unsupported HTTP verb.
    #[track_caller]
    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::new(GameErrorKind::MethodNotAllowed, message)
    }

    /// Anything the caller cannot fix.
    #[track_caller]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(GameErrorKind::Internal, message)
    }

    /// Returns true if this error reports an unknown board ID.
    pub fn is_not_found(&self) -> bool {
        self.kind == GameErrorKind::NotFound
    }
}

