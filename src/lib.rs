//! Board Master library - coordination server for turn-based board games
//!
//! A master process owns the state of every active game. Slave clients
//! register boards and submit moves over HTTP; the master resolves each move
//! with a rule engine, answers with the new scores and forwards them to an
//! external score collector in the background.
//!
//! # Architecture
//!
//! - **Registry**: thread-safe map of board ID to game, with atomic updates
//! - **Engine**: rules turning a submitted symbol into the next game state
//! - **Coordinator**: register, list, fetch and submit operations
//! - **Propagator**: queue and worker delivering scores to the collector
//! - **HTTP**: axum router exposing the coordinator
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use board_master::{Coordinator, DiscardCollector, GameRegistry, Propagator, RockPaperScissors};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let (propagator, _worker) = Propagator::spawn(Arc::new(DiscardCollector), 16);
//! let coordinator = Coordinator::new(GameRegistry::new(), Arc::new(RockPaperScissors), propagator);
//! let app = board_master::router(coordinator);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod advertise;
mod config;
mod coordinator;
mod engine;
mod error;
mod game;
mod http;
mod propagator;
mod registry;

// Crate-level exports - Address advertisement
pub use advertise::{
    choose_host, discover_host, interface_addresses, local_address, matches_prefix,
    select_address,
};

// Crate-level exports - Configuration
pub use config::{ConfigError, MasterConfig};

// Crate-level exports - Coordinator
pub use coordinator::{Coordinator, Registration, game_location, validate_board_id};

// Crate-level exports - Rules
pub use engine::{Hand, ResultEngine, RockPaperScissors};

// Crate-level exports - Errors
pub use error::{GameError, GameErrorKind};

// Crate-level exports - Game types
pub use game::{BoardId, Game, HistoryEntry, ResultSnapshot, ScoreUpdate, Symbol};

// Crate-level exports - HTTP surface
pub use http::{CREATED_BODY, router};

// Crate-level exports - Propagation
pub use propagator::{
    DiscardCollector, HttpCollector, PendingJobs, PropagationError, PropagationJob, Propagator,
    SCORES_PATH, ScoreCollector, drain_worker,
};

// Crate-level exports - Registry
pub use registry::{DuplicatePolicy, GameRegistry, Registered};
