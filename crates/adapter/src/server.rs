//! TCP server for the host surface
//!
//! Handles incoming connections and manages client lifecycle.
//! Uses tokio for async networking; games themselves live in the
//! [`SessionRegistry`] and report back through a per-connection event channel.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::protocol::*;
use crate::session::{SessionConfig, SessionError, SessionEvent, SessionId, SessionRegistry};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Queued commands per game before `backpressure` is reported
    pub max_pending_commands: usize,
    pub max_sessions: usize,
    pub idle_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let session = SessionConfig::default();
        Self {
            host: "127.0.0.1".to_string(),
            port: 7878,
            max_pending_commands: session.command_buffer,
            max_sessions: session.max_sessions,
            idle_timeout: session.idle_timeout,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl ServerConfig {
    /// Create from `TETRIS_BOT_*` environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env_or("TETRIS_BOT_HOST", defaults.host),
            port: env_or("TETRIS_BOT_PORT", defaults.port),
            max_pending_commands: env_or("TETRIS_BOT_MAX_PENDING", defaults.max_pending_commands),
            max_sessions: env_or("TETRIS_BOT_MAX_SESSIONS", defaults.max_sessions),
            idle_timeout: Duration::from_secs(env_or(
                "TETRIS_BOT_IDLE_SECS",
                defaults.idle_timeout.as_secs(),
            )),
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            max_sessions: self.max_sessions,
            command_buffer: self.max_pending_commands.max(1),
            idle_timeout: self.idle_timeout,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ClientOutbound {
    Welcome(WelcomeMessage),
    Ack(AckMessage),
    Error(ErrorMessage),
    Observation(Box<ObservationMessage>),
    GameOver(GameOverMessage),
    Stats(StatsMessage),
}

/// Start the TCP server
///
/// Sends the bound address on `ready_tx` once listening, which lets callers
/// bind port 0.
pub async fn run_server(
    config: ServerConfig,
    registry: SessionRegistry,
    ready_tx: Option<oneshot::Sender<SocketAddr>>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?;
    let bound = listener.local_addr()?;
    info!(addr = %bound, "host server listening");
    if let Some(tx) = ready_tx {
        let _ = tx.send(bound);
    }

    let mut client_id_counter = 0u64;

    loop {
        let (socket, addr) = listener.accept().await?;
        client_id_counter += 1;
        let client_id = client_id_counter;

        info!(client = client_id, %addr, "client connected");

        let registry = registry.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_client(socket, client_id, registry).await {
                error!(client = client_id, error = %e, "client error");
            }
            info!(client = client_id, "client disconnected");
        });
    }
}

/// Per-connection protocol state
struct Connection {
    client_id: u64,
    handshaken: bool,
    last_seq: Option<u64>,
    push_seq: u64,
    /// Games started on this connection that have not finished
    owned: HashSet<SessionId>,
    tx: mpsc::UnboundedSender<ClientOutbound>,
}

impl Connection {
    fn new(client_id: u64, tx: mpsc::UnboundedSender<ClientOutbound>) -> Self {
        Self {
            client_id,
            handshaken: false,
            last_seq: None,
            push_seq: 0,
            owned: HashSet::new(),
            tx,
        }
    }

    /// Enforce strictly increasing `seq`
    fn accept_seq(&mut self, seq: u64) -> bool {
        match self.last_seq {
            Some(prev) if seq <= prev => false,
            _ => {
                self.last_seq = Some(seq);
                true
            }
        }
    }

    fn send(&self, msg: ClientOutbound) {
        let _ = self.tx.send(msg);
    }

    fn reply_error(&self, seq: u64, code: ErrorCode, message: &str) {
        self.send(ClientOutbound::Error(create_error(seq, code, message)));
    }

    fn reply_ack(&self, seq: u64) {
        self.send(ClientOutbound::Ack(create_ack(seq)));
    }

    /// Handshake and sequencing checks shared by every game-scoped message
    fn admit(&mut self, seq: u64) -> bool {
        if !self.handshaken {
            self.reply_error(seq, ErrorCode::HandshakeRequired, "Send hello first");
            return false;
        }
        if !self.accept_seq(seq) {
            self.reply_error(
                seq,
                ErrorCode::InvalidCommand,
                "seq must be strictly increasing",
            );
            return false;
        }
        true
    }

    fn next_push_seq(&mut self) -> u64 {
        self.push_seq += 1;
        self.push_seq
    }

    fn forward_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Updated { session, snapshot } => {
                let seq = self.next_push_seq();
                let obs = create_observation(seq, session.0, &snapshot);
                self.send(ClientOutbound::Observation(Box::new(obs)));
            }
            SessionEvent::Finished { session, summary } => {
                self.owned.remove(&session);
                let seq = self.next_push_seq();
                self.send(ClientOutbound::GameOver(create_game_over(seq, &summary)));
            }
        }
    }
}

fn error_code(e: &SessionError) -> ErrorCode {
    match e {
        SessionError::AlreadyActive(_) => ErrorCode::SessionExists,
        SessionError::Capacity(_) => ErrorCode::Capacity,
        SessionError::NotFound(_) | SessionError::Closed(_) => ErrorCode::NoSession,
        SessionError::Backpressure(_) => ErrorCode::Backpressure,
    }
}

/// Seed for games started without one
fn fresh_seed() -> u32 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    (now.as_secs() as u32).wrapping_mul(2_654_435_761) ^ now.subsec_nanos()
}

/// Handle a single client connection
async fn handle_client(
    socket: TcpStream,
    client_id: u64,
    registry: SessionRegistry,
) -> anyhow::Result<()> {
    let (reader, mut writer) = tokio::io::split(socket);
    let mut lines = BufReader::new(reader).lines();

    // Channel to send messages to this client
    let (tx, mut rx) = mpsc::unbounded_channel::<ClientOutbound>();
    // Game updates for sessions started on this connection
    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<SessionEvent>();

    let write_task = tokio::spawn(async move {
        let mut buf: Vec<u8> = Vec::with_capacity(4096);
        while let Some(msg) = rx.recv().await {
            buf.clear();
            let encoded = match &msg {
                ClientOutbound::Welcome(m) => serde_json::to_writer(&mut buf, m),
                ClientOutbound::Ack(m) => serde_json::to_writer(&mut buf, m),
                ClientOutbound::Error(m) => serde_json::to_writer(&mut buf, m),
                ClientOutbound::Observation(m) => serde_json::to_writer(&mut buf, m),
                ClientOutbound::GameOver(m) => serde_json::to_writer(&mut buf, m),
                ClientOutbound::Stats(m) => serde_json::to_writer(&mut buf, m),
            };
            if encoded.is_err() {
                continue;
            }
            buf.push(b'\n');
            if writer.write_all(&buf).await.is_err() {
                break;
            }
            if writer.flush().await.is_err() {
                break;
            }
        }
    });

    let mut conn = Connection::new(client_id, tx);

    let result: anyhow::Result<()> = loop {
        tokio::select! {
            // Events first, so a finished game is forgotten before the next line
            // can start a new one for the same user.
            biased;

            Some(event) = events_rx.recv() => conn.forward_event(event),

            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break Ok(()),
                    Err(e) => break Err(e.into()),
                };
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if !handle_line(&mut conn, trimmed, &registry, &events_tx).await {
                    break Ok(());
                }
            }
        }
    };

    // Games die with the connection that started them.
    for id in conn.owned.drain().collect::<Vec<_>>() {
        match registry.end(id).await {
            Ok(summary) => {
                info!(client = client_id, user = %id, score = summary.score, "game ended on disconnect")
            }
            Err(e) => debug!(client = client_id, user = %id, error = %e, "game already gone"),
        }
    }

    drop(conn);
    let _ = write_task.await;

    result
}

/// Process one inbound line; returns false when the connection must close
async fn handle_line(
    conn: &mut Connection,
    line: &str,
    registry: &SessionRegistry,
    events_tx: &mpsc::UnboundedSender<SessionEvent>,
) -> bool {
    let parsed = match parse_message(line) {
        Ok(parsed) => parsed,
        Err(e) => {
            let seq = extract_seq(line).unwrap_or(0);
            conn.reply_error(
                seq,
                ErrorCode::InvalidCommand,
                &format!("JSON parse error: {}", e),
            );
            return true;
        }
    };

    // Everything but hello needs a completed handshake and a fresh seq.
    if !matches!(parsed, ParsedMessage::Hello(_)) && !conn.admit(parsed.seq()) {
        return true;
    }

    match parsed {
        ParsedMessage::Hello(hello) => {
            if conn.handshaken && !conn.accept_seq(hello.seq) {
                conn.reply_error(
                    hello.seq,
                    ErrorCode::InvalidCommand,
                    "seq must be strictly increasing",
                );
                return true;
            }

            if !hello.is_compatible() {
                conn.reply_error(
                    hello.seq,
                    ErrorCode::ProtocolMismatch,
                    &format!("Protocol version {} not supported", hello.protocol_version),
                );
                return false;
            }

            conn.handshaken = true;
            conn.last_seq = Some(hello.seq);
            info!(
                client = conn.client_id,
                name = %hello.client.name,
                version = %hello.client.version,
                "handshake complete"
            );
            conn.send(ClientOutbound::Welcome(create_welcome(
                hello.seq,
                conn.client_id,
            )));
        }

        ParsedMessage::Start(start) => {
            let id = SessionId(start.user);
            let seed = start.seed.unwrap_or_else(fresh_seed);
            match registry.open(id, seed, events_tx.clone()).await {
                Ok(snapshot) => {
                    conn.owned.insert(id);
                    conn.reply_ack(start.seq);
                    let seq = conn.next_push_seq();
                    let obs = create_observation(seq, start.user, &snapshot);
                    conn.send(ClientOutbound::Observation(Box::new(obs)));
                }
                Err(e) => conn.reply_error(start.seq, error_code(&e), &e.to_string()),
            }
        }

        ParsedMessage::Command(cmd) => {
            let id = SessionId(cmd.user);
            if !conn.owned.contains(&id) {
                conn.reply_error(
                    cmd.seq,
                    ErrorCode::NoSession,
                    &SessionError::NotFound(id).to_string(),
                );
                return true;
            }
            match registry.dispatch_batch(id, cmd.actions.0).await {
                Ok(()) => conn.reply_ack(cmd.seq),
                Err(e) => {
                    warn!(client = conn.client_id, user = %id, error = %e, "command rejected");
                    conn.reply_error(cmd.seq, error_code(&e), &e.to_string());
                }
            }
        }

        ParsedMessage::End(end) => {
            let id = SessionId(end.user);
            if !conn.owned.contains(&id) {
                conn.reply_error(
                    end.seq,
                    ErrorCode::NoSession,
                    &SessionError::NotFound(id).to_string(),
                );
                return true;
            }
            match registry.end(id).await {
                Ok(_) => conn.reply_ack(end.seq),
                Err(e) => conn.reply_error(end.seq, error_code(&e), &e.to_string()),
            }
        }

        ParsedMessage::Stats(req) => {
            let stats = registry.stats(SessionId(req.user)).await;
            conn.send(ClientOutbound::Stats(create_stats(req.seq, req.user, &stats)));
        }

        ParsedMessage::Unknown(msg) => {
            conn.reply_error(msg.seq, ErrorCode::InvalidCommand, "Unknown message type");
        }
    }

    true
}
