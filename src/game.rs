//! Core domain types for a game session.

use derive_new::new;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a board. Case-sensitive.
pub type BoardId = String;

/// An opaque move marker.
///
/// The coordinator never interprets symbols; only a [`ResultEngine`](crate::ResultEngine)
/// gives them meaning. Serialized as a bare JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Wraps a raw marker.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the raw marker.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// One resolved move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, new)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Symbol played by the master.
    pub master_symbol: Symbol,
    /// Symbol submitted by the slave.
    pub slave_symbol: Symbol,
}

/// Full state of one board.
///
/// Every field defaults when absent so that a registration body carrying only
/// `boardId` decodes; validation happens in the coordinator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    /// Board this game is played on.
    #[serde(default)]
    pub board_id: BoardId,
    /// Cumulative master score.
    #[serde(default)]
    pub master_score: u32,
    /// Cumulative slave score.
    #[serde(default)]
    pub slave_score: u32,
    /// Resolved moves, oldest first.
    #[serde(default, alias = "gameHistory")]
    pub history: Vec<HistoryEntry>,
}

impl Game {
    /// Creates an empty game for the given board.
    pub fn new(board_id: impl Into<BoardId>) -> Self {
        Self {
            board_id: board_id.into(),
            ..Self::default()
        }
    }

    /// Returns the most recently appended entry, if any.
    pub fn last_entry(&self) -> Option<&HistoryEntry> {
        self.history.last()
    }

    /// Builds the caller-facing view of the last resolved move.
    ///
    /// Returns `None` before the first move.
    pub fn snapshot(&self) -> Option<ResultSnapshot> {
        self.last_entry().map(|entry| ResultSnapshot {
            master_score: self.master_score,
            slave_score: self.slave_score,
            master_symbol: entry.master_symbol.clone(),
            slave_symbol: entry.slave_symbol.clone(),
        })
    }
}

/// Score and last-move view returned to a submitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, new)]
#[serde(rename_all = "camelCase")]
pub struct ResultSnapshot {
    /// Master score after the move.
    pub master_score: u32,
    /// Slave score after the move.
    pub slave_score: u32,
    /// Master symbol of the move.
    pub master_symbol: Symbol,
    /// Slave symbol of the move.
    pub slave_symbol: Symbol,
}

/// Payload sent to the external score collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, new)]
#[serde(rename_all = "camelCase")]
pub struct ScoreUpdate {
    /// Master score.
    pub master_score: u32,
    /// Slave score.
    pub slave_score: u32,
}

impl From<&ResultSnapshot> for ScoreUpdate {
    fn from(snapshot: &ResultSnapshot) -> Self {
        Self::new(snapshot.master_score, snapshot.slave_score)
    }
}
