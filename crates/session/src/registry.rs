//! Registry of live games keyed by user.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use chat_tetris_core::{GameSnapshot, GameState};
use chat_tetris_types::GameAction;

use crate::config::SessionConfig;
use crate::driver::{ActionBatch, Driver, GameSummary, SessionCommand, SessionEvent};
use crate::error::{Result, SessionError};
use crate::stats::{PlayerStats, StatsBook};
use crate::SessionId;

struct SessionHandle {
    generation: u64,
    commands: mpsc::Sender<SessionCommand>,
    join: JoinHandle<GameSummary>,
}

struct Inner {
    config: SessionConfig,
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
    stats: Mutex<StatsBook>,
    next_generation: AtomicU64,
}

/// Shared handle to every live game
///
/// Cloning is cheap; all clones see the same games.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<Inner>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    pub fn with_config(config: SessionConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                sessions: RwLock::new(HashMap::new()),
                stats: Mutex::new(StatsBook::new()),
                next_generation: AtomicU64::new(1),
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Start a game for `id` and return its first snapshot
    ///
    /// Updates and the final summary are published on `events`.
    pub async fn open(
        &self,
        id: SessionId,
        seed: u32,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<GameSnapshot> {
        let config = self.inner.config;
        let mut sessions = self.inner.sessions.write().await;
        if sessions.contains_key(&id) {
            return Err(SessionError::AlreadyActive(id));
        }
        if sessions.len() >= config.max_sessions {
            return Err(SessionError::Capacity(config.max_sessions));
        }

        let mut state = GameState::new(seed);
        state.start();
        let snapshot = state.snapshot();

        let (cmd_tx, cmd_rx) = mpsc::channel(config.command_buffer.max(1));
        let mut driver = Driver::new(id, state, cmd_rx, events, config.idle_timeout);
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let registry = self.clone();
        let join = tokio::spawn(async move {
            let summary = driver.run().await;
            registry.retire(id, generation, &summary).await;
            driver.finish(summary);
            summary
        });

        sessions.insert(
            id,
            SessionHandle {
                generation,
                commands: cmd_tx,
                join,
            },
        );
        info!(user = %id, seed, active = sessions.len(), "game started");
        Ok(snapshot)
    }

    /// Queue a player action for `id`'s game
    pub async fn dispatch(&self, id: SessionId, action: GameAction) -> Result<()> {
        self.try_send(id, SessionCommand::Action(action)).await
    }

    /// Queue several actions for `id`'s game as one command
    ///
    /// The batch takes a single queue slot, so it is either applied in full
    /// or rejected without touching the game.
    pub async fn dispatch_batch(&self, id: SessionId, actions: ActionBatch) -> Result<()> {
        self.try_send(id, SessionCommand::Batch(actions)).await
    }

    async fn try_send(&self, id: SessionId, command: SessionCommand) -> Result<()> {
        let sessions = self.inner.sessions.read().await;
        let handle = sessions.get(&id).ok_or(SessionError::NotFound(id))?;
        handle.commands.try_send(command).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SessionError::Backpressure(id),
            mpsc::error::TrySendError::Closed(_) => SessionError::Closed(id),
        })
    }

    /// Stop `id`'s game and wait for its summary
    pub async fn end(&self, id: SessionId) -> Result<GameSummary> {
        let handle = self
            .inner
            .sessions
            .write()
            .await
            .remove(&id)
            .ok_or(SessionError::NotFound(id))?;

        // A closed channel means the driver is already on its way out.
        let _ = handle.commands.send(SessionCommand::End).await;
        handle.join.await.map_err(|e| {
            warn!(user = %id, error = %e, "game task failed");
            SessionError::Closed(id)
        })
    }

    /// End every live game, returning the summaries collected
    pub async fn end_all(&self) -> Vec<GameSummary> {
        let ids: Vec<SessionId> = self.inner.sessions.read().await.keys().copied().collect();
        let mut summaries = Vec::with_capacity(ids.len());
        for id in ids {
            if let Ok(summary) = self.end(id).await {
                summaries.push(summary);
            }
        }
        summaries
    }

    pub async fn stats(&self, id: SessionId) -> PlayerStats {
        self.inner.stats.lock().await.get(id)
    }

    pub async fn active_count(&self) -> usize {
        self.inner.sessions.read().await.len()
    }

    pub async fn contains(&self, id: SessionId) -> bool {
        self.inner.sessions.read().await.contains_key(&id)
    }

    /// Bookkeeping for a finished driver
    async fn retire(&self, id: SessionId, generation: u64, summary: &GameSummary) {
        {
            let mut sessions = self.inner.sessions.write().await;
            if sessions
                .get(&id)
                .is_some_and(|handle| handle.generation == generation)
            {
                sessions.remove(&id);
            }
        }
        self.inner.stats.lock().await.record(summary);
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::driver::FinishReason;

    fn registry(max_sessions: usize, command_buffer: usize) -> SessionRegistry {
        SessionRegistry::with_config(SessionConfig {
            max_sessions,
            command_buffer,
            idle_timeout: Duration::from_secs(300),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn one_game_per_user() {
        let reg = registry(4, 4);
        let (tx, _rx) = mpsc::unbounded_channel();
        reg.open(SessionId(1), 3, tx.clone()).await.unwrap();

        let err = reg.open(SessionId(1), 3, tx).await.unwrap_err();
        assert_eq!(err, SessionError::AlreadyActive(SessionId(1)));
        assert_eq!(reg.active_count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn capacity_is_enforced() {
        let reg = registry(1, 4);
        let (tx, _rx) = mpsc::unbounded_channel();
        reg.open(SessionId(1), 3, tx.clone()).await.unwrap();

        let err = reg.open(SessionId(2), 3, tx).await.unwrap_err();
        assert_eq!(err, SessionError::Capacity(1));
    }

    #[tokio::test(start_paused = true)]
    async fn full_queue_reports_backpressure() {
        let reg = registry(4, 1);
        let (tx, _rx) = mpsc::unbounded_channel();
        reg.open(SessionId(1), 3, tx).await.unwrap();

        // The driver has not been polled yet, so the single slot stays taken.
        reg.dispatch(SessionId(1), GameAction::MoveLeft).await.unwrap();
        let err = reg
            .dispatch(SessionId(1), GameAction::MoveLeft)
            .await
            .unwrap_err();
        assert_eq!(err, SessionError::Backpressure(SessionId(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn batch_takes_one_queue_slot() {
        let reg = registry(4, 1);
        let (tx, mut rx) = mpsc::unbounded_channel();
        reg.open(SessionId(1), 3, tx).await.unwrap();

        let batch: ActionBatch = std::iter::repeat(GameAction::MoveLeft)
            .take(crate::driver::MAX_BATCH)
            .collect();
        reg.dispatch_batch(SessionId(1), batch.clone()).await.unwrap();
        assert_eq!(
            reg.dispatch_batch(SessionId(1), batch).await,
            Err(SessionError::Backpressure(SessionId(1)))
        );

        match rx.recv().await {
            Some(SessionEvent::Updated { snapshot, .. }) => {
                assert_eq!(snapshot.active.unwrap().x, 0);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_user_is_not_found() {
        let reg = registry(4, 4);
        assert_eq!(
            reg.dispatch(SessionId(9), GameAction::HardDrop).await,
            Err(SessionError::NotFound(SessionId(9)))
        );
        assert_eq!(
            reg.end(SessionId(9)).await,
            Err(SessionError::NotFound(SessionId(9)))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn end_records_stats_and_frees_slot() {
        let reg = registry(4, 4);
        let (tx, _rx) = mpsc::unbounded_channel();
        reg.open(SessionId(5), 5, tx.clone()).await.unwrap();

        let summary = reg.end(SessionId(5)).await.unwrap();
        assert_eq!(summary.reason, FinishReason::Ended);
        assert!(!reg.contains(SessionId(5)).await);
        assert_eq!(reg.stats(SessionId(5)).await.games_played, 1);

        reg.open(SessionId(5), 5, tx).await.unwrap();
        assert!(reg.contains(SessionId(5)).await);
    }
}
