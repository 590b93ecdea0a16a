/// Error types for the session layer
use thiserror::Error;

use crate::SessionId;

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors that can occur while managing games
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The user already has a live game
    #[error("user {0} already has a game in progress")]
    AlreadyActive(SessionId),

    /// The registry is at `max_sessions`
    #[error("too many games in progress (limit {0})")]
    Capacity(usize),

    /// No live game for the user
    #[error("user {0} has no game in progress")]
    NotFound(SessionId),

    /// The game's command queue is full
    #[error("command queue for user {0} is full")]
    Backpressure(SessionId),

    /// The game's driver exited before the command was delivered
    #[error("game for user {0} has already finished")]
    Closed(SessionId),
}
