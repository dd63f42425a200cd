//! Game rules: how a submitted symbol advances a game.

use crate::game::{Game, HistoryEntry, Symbol};
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString};
use tracing::{debug, instrument};

/// Computes the next state of a game from a submitted slave symbol.
///
/// Implementations must be pure: the returned game has the same board ID,
/// exactly one more history entry than `game`, and scores no lower than
/// before. The coordinator rejects any output that breaks these rules.
/// An empty history is a valid input (first move).
pub trait ResultEngine: Send + Sync + std::fmt::Debug {
    /// Resolves one move.
    fn advance(&self, game: &Game, slave_symbol: &Symbol) -> Game;
}

/// A rock-paper-scissors hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum Hand {
    /// Beats scissors.
    Rock,
    /// Beats rock.
    Paper,
    /// Beats paper.
    Scissors,
}

impl Hand {
    /// Returns the hand that beats this one.
    pub fn beaten_by(self) -> Self {
        match self {
            Hand::Rock => Hand::Paper,
            Hand::Paper => Hand::Scissors,
            Hand::Scissors => Hand::Rock,
        }
    }

    /// Returns true if this hand beats `other`.
    pub fn beats(self, other: Self) -> bool {
        other.beaten_by() == self
    }

    /// Parses a symbol, returning `None` for anything outside the alphabet.
    pub fn from_symbol(symbol: &Symbol) -> Option<Self> {
        Hand::from_str(symbol.as_str()).ok()
    }

    /// Canonical symbol for this hand.
    pub fn symbol(self) -> Symbol {
        Symbol::new(self.to_string())
    }
}

/// Rock-paper-scissors where the master counters the slave's previous hand.
///
/// The master opens with rock. A round's winner scores one point, a tie
/// scores nothing, and a symbol outside the alphabet is recorded verbatim as
/// a void round.
#[derive(Debug, Clone, Copy, Default)]
pub struct RockPaperScissors;

impl RockPaperScissors {
    /// Picks the master's hand for the next round.
    fn master_hand(game: &Game) -> Hand {
        game.last_entry()
            .and_then(|entry| Hand::from_symbol(&entry.slave_symbol))
            .map(Hand::beaten_by)
            .unwrap_or(Hand::Rock)
    }
}

impl ResultEngine for RockPaperScissors {
    #[instrument(skip(self, game), fields(board_id = %game.board_id, round = game.history.len() + 1))]
    fn advance(&self, game: &Game, slave_symbol: &Symbol) -> Game {
        let master = Self::master_hand(game);
        let mut next = game.clone();

        match Hand::from_symbol(slave_symbol) {
            Some(slave) if master.beats(slave) => next.master_score += 1,
            Some(slave) if slave.beats(master) => next.slave_score += 1,
            Some(_) => debug!("Tie"),
            None => debug!(%slave_symbol, "Unrecognised symbol, void round"),
        }

        next.history.push(HistoryEntry::new(master.symbol(), slave_symbol.clone()));
        debug!(
            master = %master,
            master_score = next.master_score,
            slave_score = next.slave_score,
            "Round resolved"
        );
        next
    }
}
