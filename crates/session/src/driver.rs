//! Fall loop for one game.
//!
//! A driver owns its `GameState` outright and is the only code that touches
//! it. Player input arrives over a bounded channel; gravity is a deadline the
//! driver sleeps towards. Both wait in the same `select!`, so a command never
//! races a fall.

use std::time::Duration;

use arrayvec::ArrayVec;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

use chat_tetris_core::{GameSnapshot, GameState, StepOutcome};
use chat_tetris_types::GameAction;

use crate::SessionId;

/// Most actions carried by one [`SessionCommand::Batch`]
pub const MAX_BATCH: usize = 32;

/// Actions applied together, in order, as one queued command
pub type ActionBatch = ArrayVec<GameAction, MAX_BATCH>;

/// Message to a running game
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Action(GameAction),
    Batch(ActionBatch),
    End,
}

/// Why a game stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FinishReason {
    /// The next piece could not spawn
    ToppedOut,
    /// Ended on request, or every command sender went away
    Ended,
    /// No command arrived within the idle timeout
    Abandoned,
}

impl FinishReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinishReason::ToppedOut => "topped_out",
            FinishReason::Ended => "ended",
            FinishReason::Abandoned => "abandoned",
        }
    }
}

/// Final figures of a finished game
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameSummary {
    pub session: SessionId,
    pub reason: FinishReason,
    pub score: u32,
    pub level: u32,
    pub lines: u32,
    pub pieces_placed: u32,
    pub seed: u32,
}

/// Published by a driver to whoever opened the game
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Updated {
        session: SessionId,
        snapshot: GameSnapshot,
    },
    Finished {
        session: SessionId,
        summary: GameSummary,
    },
}

impl SessionEvent {
    pub fn session(&self) -> SessionId {
        match self {
            SessionEvent::Updated { session, .. } | SessionEvent::Finished { session, .. } => {
                *session
            }
        }
    }
}

pub(crate) struct Driver {
    id: SessionId,
    state: GameState,
    commands: mpsc::Receiver<SessionCommand>,
    events: mpsc::UnboundedSender<SessionEvent>,
    idle_timeout: Duration,
}

impl Driver {
    pub(crate) fn new(
        id: SessionId,
        state: GameState,
        commands: mpsc::Receiver<SessionCommand>,
        events: mpsc::UnboundedSender<SessionEvent>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            id,
            state,
            commands,
            events,
            idle_timeout,
        }
    }

    /// Run until the game finishes
    pub(crate) async fn run(&mut self) -> GameSummary {
        let mut next_fall = Instant::now() + self.state.fall_interval();
        let mut idle_deadline = Instant::now() + self.idle_timeout;

        let reason = loop {
            if self.state.game_over() {
                break FinishReason::ToppedOut;
            }
            let running = self.state.is_running();

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(SessionCommand::Action(action)) => {
                        idle_deadline = Instant::now() + self.idle_timeout;
                        if self.apply(action, &mut next_fall) {
                            self.publish_update();
                        }
                    }
                    Some(SessionCommand::Batch(actions)) => {
                        idle_deadline = Instant::now() + self.idle_timeout;
                        let mut changed = false;
                        for action in actions {
                            changed |= self.apply(action, &mut next_fall);
                        }
                        if changed {
                            self.publish_update();
                        }
                    }
                    Some(SessionCommand::End) | None => break FinishReason::Ended,
                },
                _ = sleep_until(next_fall), if running => {
                    match self.state.step_down() {
                        StepOutcome::Locked { lines_cleared } if lines_cleared > 0 => {
                            debug!(
                                user = %self.id,
                                lines = lines_cleared,
                                level = self.state.level(),
                                "lines cleared"
                            );
                        }
                        _ => {}
                    }
                    next_fall = Instant::now() + self.state.fall_interval();
                    self.publish_update();
                }
                _ = sleep_until(idle_deadline) => break FinishReason::Abandoned,
            }
        };

        self.state.end();
        let summary = self.summary(reason);
        info!(
            user = %self.id,
            reason = reason.as_str(),
            score = summary.score,
            lines = summary.lines,
            "game finished"
        );
        summary
    }

    /// Apply one action; a resumed game restarts its fall clock
    fn apply(&mut self, action: GameAction, next_fall: &mut Instant) -> bool {
        let was_paused = self.state.paused();
        if !self.state.apply_action(action) {
            return false;
        }
        if was_paused && self.state.is_running() {
            *next_fall = Instant::now() + self.state.fall_interval();
        }
        true
    }

    /// Send the closing event; consumes the driver
    pub(crate) fn finish(self, summary: GameSummary) {
        let _ = self.events.send(SessionEvent::Finished {
            session: self.id,
            summary,
        });
    }

    fn publish_update(&self) {
        // Observers may have gone away; the game keeps running regardless.
        let _ = self.events.send(SessionEvent::Updated {
            session: self.id,
            snapshot: self.state.snapshot(),
        });
    }

    fn summary(&self, reason: FinishReason) -> GameSummary {
        GameSummary {
            session: self.id,
            reason,
            score: self.state.score(),
            level: self.state.level(),
            lines: self.state.lines(),
            pieces_placed: self.state.pieces_placed(),
            seed: self.state.seed(),
        }
    }
}
