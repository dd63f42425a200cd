//! In-memory registry of active games.

use crate::error::GameError;
use crate::game::Game;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use strum::{Display, EnumString};
use tracing::{debug, info, instrument, warn};

/// What to do when a board ID is registered twice.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Replace the existing game (last writer wins).
    #[default]
    Overwrite,
    /// Keep the existing game and report a conflict.
    Reject,
}

/// Outcome of a successful registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registered {
    /// The board ID was new.
    Created,
    /// An existing game under the same board ID was replaced.
    Replaced,
}

/// Thread-safe store of all games, keyed by board ID.
///
/// Cloning is cheap and every clone shares the same games. All mutation goes
/// through [`GameRegistry::update`], which is atomic per registry: concurrent
/// updates to one board serialize and none are lost.
#[derive(Debug, Clone, Default)]
pub struct GameRegistry {
    games: Arc<RwLock<HashMap<String, Game>>>,
    policy: DuplicatePolicy,
}

impl GameRegistry {
    /// Creates an empty registry that overwrites duplicate registrations.
    #[instrument]
    pub fn new() -> Self {
        Self::with_policy(DuplicatePolicy::default())
    }

    /// Creates an empty registry with the given duplicate policy.
    #[instrument]
    pub fn with_policy(policy: DuplicatePolicy) -> Self {
        info!(%policy, "Creating game registry");
        Self {
            games: Arc::new(RwLock::new(HashMap::new())),
            policy,
        }
    }

    /// Returns the duplicate registration policy.
    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    // Writers only ever swap in fully built values, so a poisoned lock still
    // guards a consistent map.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Game>> {
        self.games.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Game>> {
        self.games.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts a game under its board ID.
    #[instrument(skip(self, game), fields(board_id = %game.board_id))]
    pub fn create(&self, game: Game) -> Result<Registered, GameError> {
        let mut games = self.write();

        if games.contains_key(&game.board_id) {
            match self.policy {
                DuplicatePolicy::Reject => {
                    warn!("Board already registered, rejecting");
                    return Err(GameError::conflict(&game.board_id));
                }
                DuplicatePolicy::Overwrite => {
                    warn!("Board already registered, replacing existing game");
                    games.insert(game.board_id.clone(), game);
                    return Ok(Registered::Replaced);
                }
            }
        }

        games.insert(game.board_id.clone(), game);
        info!("Game registered");
        Ok(Registered::Created)
    }

    /// Returns a copy of the game for a board.
    #[instrument(skip(self))]
    pub fn get(&self, board_id: &str) -> Result<Game, GameError> {
        let game = self.read().get(board_id).cloned();
        game.ok_or_else(|| {
            debug!("Game not found");
            GameError::not_found(board_id)
        })
    }

    /// Returns a copy of every game, ordered by board ID.
    #[instrument(skip(self))]
    pub fn list(&self) -> BTreeMap<String, Game> {
        let games: BTreeMap<_, _> = self
            .read()
            .iter()
            .map(|(id, game)| (id.clone(), game.clone()))
            .collect();
        debug!(count = games.len(), "Listed games");
        games
    }

    /// Atomically replaces the game for a board with `f` applied to it.
    ///
    /// The write lock is held for the whole read-modify-write, so `f` must
    /// not block. If `f` fails nothing is written. Returns the stored value.
    #[instrument(skip(self, f))]
    pub fn update<F>(&self, board_id: &str, f: F) -> Result<Game, GameError>
    where
        F: FnOnce(&Game) -> Result<Game, GameError>,
    {
        let mut games = self.write();
        let current = games
            .get(board_id)
            .ok_or_else(|| GameError::not_found(board_id))?;

        let next = f(current)?;
        if next.board_id != board_id {
            warn!(new_board_id = %next.board_id, "Update attempted to change board ID");
            return Err(GameError::internal(format!(
                "Update changed board ID from '{}' to '{}'",
                board_id, next.board_id
            )));
        }

        games.insert(board_id.to_string(), next.clone());
        debug!(moves = next.history.len(), "Game updated");
        Ok(next)
    }

    /// Number of registered games.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns true if no game is registered.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
