//! Live games, one per chat user.
//!
//! Every game runs in its own tokio task (its *driver*), which owns the
//! `GameState` and applies gravity on the level's fall interval. The
//! [`SessionRegistry`] maps user ids to those tasks, enforces one game per
//! user and a global cap, forwards player actions, and keeps per-player
//! stats once games finish.
//!
//! ```no_run
//! use chat_tetris_session::{SessionId, SessionRegistry};
//! use chat_tetris_types::GameAction;
//! use tokio::sync::mpsc;
//!
//! # async fn demo() -> chat_tetris_session::Result<()> {
//! let registry = SessionRegistry::new();
//! let (events_tx, mut events) = mpsc::unbounded_channel();
//!
//! registry.open(SessionId(42), 7, events_tx).await?;
//! registry.dispatch(SessionId(42), GameAction::HardDrop).await?;
//! let update = events.recv().await;
//! let summary = registry.end(SessionId(42)).await?;
//! # let _ = (update, summary);
//! # Ok(())
//! # }
//! ```

use std::fmt;

pub mod config;
pub mod driver;
pub mod error;
pub mod registry;
pub mod stats;

pub use config::SessionConfig;
pub use driver::{
    ActionBatch, FinishReason, GameSummary, SessionCommand, SessionEvent, MAX_BATCH,
};
pub use error::{Result, SessionError};
pub use registry::SessionRegistry;
pub use stats::{PlayerStats, StatsBook};

/// Chat user id owning a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SessionId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}
