use std::time::Duration;

/// Limits applied by a [`SessionRegistry`](crate::SessionRegistry)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Live games allowed at once
    pub max_sessions: usize,
    /// Pending commands per game before dispatch reports backpressure
    pub command_buffer: usize,
    /// A game with no command for this long is abandoned
    pub idle_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: 64,
            command_buffer: 16,
            idle_timeout: Duration::from_secs(300),
        }
    }
}
