//! Protocol module - JSON message types for the host surface
//!
//! One JSON object per line. All messages have: type, seq (sequence number),
//! ts (timestamp in ms). Every game-scoped message names the chat `user` whose
//! game it targets.

use serde::{Deserialize, Serialize};

use crate::core::{ActiveSnapshot, GameSnapshot};
use crate::session::{ActionBatch, FinishReason, GameSummary, PlayerStats, MAX_BATCH};
use crate::types::{GameAction, PieceKind, BOARD_HEIGHT, BOARD_WIDTH};

/// Protocol version announced in `welcome`
pub const PROTOCOL_VERSION: &str = "1.0.0";

/// Most actions accepted in one `command`; the whole list is queued as one batch
pub const MAX_ACTIONS: usize = MAX_BATCH;

// ============== Client -> Server Messages ==============

/// Client hello message (first message to establish connection)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloMessage {
    pub seq: u64,
    pub ts: u64,
    pub client: ClientInfo,
    pub protocol_version: String,
}

impl HelloMessage {
    /// Whether the requested version shares our major version
    pub fn is_compatible(&self) -> bool {
        major_version(&self.protocol_version) == major_version(PROTOCOL_VERSION)
    }
}

fn major_version(version: &str) -> Option<&str> {
    version.split('.').next().filter(|major| !major.is_empty())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

/// Start a game for a user
#[derive(Debug, Clone, Deserialize)]
pub struct StartMessage {
    pub seq: u64,
    pub ts: u64,
    pub user: u64,
    /// Piece sequence seed; picked by the server when absent
    #[serde(default)]
    pub seed: Option<u32>,
}

/// Apply actions to a user's game, in order
#[derive(Debug, Clone, Deserialize)]
pub struct CommandMessage {
    pub seq: u64,
    pub ts: u64,
    pub user: u64,
    pub actions: ActionList,
}

/// End a user's game, or ask for their stats
#[derive(Debug, Clone, Deserialize)]
pub struct UserMessage {
    pub seq: u64,
    pub ts: u64,
    pub user: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionList(pub ActionBatch);

impl<'de> Deserialize<'de> for ActionList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;
        impl<'de> serde::de::Visitor<'de> for V {
            type Value = ActionList;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "an array of action strings")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                let mut out = ActionBatch::new();
                while let Some(name) = seq.next_element::<String>()? {
                    let action = GameAction::from_str(&name)
                        .ok_or_else(|| serde::de::Error::custom("unknown action"))?;
                    out.try_push(action)
                        .map_err(|_| serde::de::Error::custom("too many actions"))?;
                }
                Ok(ActionList(out))
            }
        }

        deserializer.deserialize_seq(V)
    }
}

#[derive(Debug, Clone)]
pub enum ParsedMessage {
    Hello(HelloMessage),
    Start(StartMessage),
    Command(CommandMessage),
    End(UserMessage),
    Stats(UserMessage),
    Unknown(UnknownMessage),
}

impl ParsedMessage {
    pub fn seq(&self) -> u64 {
        match self {
            ParsedMessage::Hello(m) => m.seq,
            ParsedMessage::Start(m) => m.seq,
            ParsedMessage::Command(m) => m.seq,
            ParsedMessage::End(m) | ParsedMessage::Stats(m) => m.seq,
            ParsedMessage::Unknown(m) => m.seq,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UnknownMessage {
    pub seq: u64,
}

const KNOWN_TYPES: [&str; 5] = ["hello", "start", "command", "end", "stats"];

/// Parse one inbound line
///
/// An unrecognized `type` is not a parse error; it comes back as
/// [`ParsedMessage::Unknown`] so the server can reply with a proper error.
pub fn parse_message(json: &str) -> Result<ParsedMessage, serde_json::Error> {
    #[derive(Debug, Deserialize)]
    #[serde(tag = "type")]
    enum InboundMessage {
        #[serde(rename = "hello")]
        Hello(HelloMessage),
        #[serde(rename = "start")]
        Start(StartMessage),
        #[serde(rename = "command")]
        Command(CommandMessage),
        #[serde(rename = "end")]
        End(UserMessage),
        #[serde(rename = "stats")]
        Stats(UserMessage),
    }

    match serde_json::from_str::<InboundMessage>(json) {
        Ok(InboundMessage::Hello(m)) => Ok(ParsedMessage::Hello(m)),
        Ok(InboundMessage::Start(m)) => Ok(ParsedMessage::Start(m)),
        Ok(InboundMessage::Command(m)) => Ok(ParsedMessage::Command(m)),
        Ok(InboundMessage::End(m)) => Ok(ParsedMessage::End(m)),
        Ok(InboundMessage::Stats(m)) => Ok(ParsedMessage::Stats(m)),
        Err(e) => {
            #[derive(Debug, Deserialize)]
            struct Envelope {
                #[serde(rename = "type")]
                msg_type: Option<String>,
                seq: Option<u64>,
            }
            let envelope = serde_json::from_str::<Envelope>(json)?;
            let msg_type = envelope.msg_type.as_deref().unwrap_or("unknown");
            if !KNOWN_TYPES.contains(&msg_type) {
                return Ok(ParsedMessage::Unknown(UnknownMessage {
                    seq: envelope.seq.unwrap_or(0),
                }));
            }
            Err(e)
        }
    }
}

/// Best-effort `seq` of a line that failed to parse, for the error reply
pub fn extract_seq(json: &str) -> Option<u64> {
    #[derive(Deserialize)]
    struct SeqOnly {
        seq: Option<u64>,
    }
    serde_json::from_str::<SeqOnly>(json).ok()?.seq
}

// ============== Server -> Client Messages ==============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WelcomeType {
    #[serde(rename = "welcome")]
    Welcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AckType {
    #[serde(rename = "ack")]
    Ack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AckStatus {
    #[serde(rename = "ok")]
    Ok,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorType {
    #[serde(rename = "error")]
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObservationType {
    #[serde(rename = "observation")]
    Observation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameOverType {
    #[serde(rename = "game_over")]
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatsType {
    #[serde(rename = "stats")]
    Stats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "handshake_required")]
    HandshakeRequired,
    #[serde(rename = "protocol_mismatch")]
    ProtocolMismatch,
    #[serde(rename = "invalid_command")]
    InvalidCommand,
    #[serde(rename = "session_exists")]
    SessionExists,
    #[serde(rename = "no_session")]
    NoSession,
    #[serde(rename = "capacity")]
    Capacity,
    #[serde(rename = "backpressure")]
    Backpressure,
}

/// Welcome message (response to hello)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelcomeMessage {
    #[serde(rename = "type")]
    pub msg_type: WelcomeType,
    pub seq: u64,
    pub ts: u64,
    pub protocol_version: String,
    pub client_id: u64,
    pub game_id: String,
}

/// Acknowledgment for command receipt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckMessage {
    #[serde(rename = "type")]
    pub msg_type: AckType,
    pub seq: u64,
    pub ts: u64,
    pub status: AckStatus,
}

/// Error message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMessage {
    #[serde(rename = "type")]
    pub msg_type: ErrorType,
    pub seq: u64,
    pub ts: u64,
    pub code: ErrorCode,
    pub message: String,
}

/// State of one user's game, sent after every change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationMessage {
    #[serde(rename = "type")]
    pub msg_type: ObservationType,
    pub seq: u64,
    pub ts: u64,
    pub user: u64,
    pub board: BoardSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<ActivePieceSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ghost_y: Option<i8>,
    pub next: PieceKindLower,
    pub score: u32,
    pub level: u32,
    pub lines: u32,
    pub paused: bool,
    pub game_over: bool,
    pub fall_interval_ms: u32,
    pub pieces_placed: u32,
    pub seed: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub width: u8,
    pub height: u8,
    pub cells: [[u8; BOARD_WIDTH as usize]; BOARD_HEIGHT as usize], // 0 = empty, 1-7 = piece kind
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivePieceSnapshot {
    pub kind: PieceKindLower,
    pub x: i8,
    pub y: i8,
    /// Current rotation as 0/1 rows, top row first
    pub shape: Vec<Vec<u8>>,
}

impl From<ActiveSnapshot> for ActivePieceSnapshot {
    fn from(value: ActiveSnapshot) -> Self {
        Self {
            kind: value.kind.into(),
            x: value.x,
            y: value.y,
            shape: value.shape.rows(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceKindLower {
    #[serde(rename = "i")]
    I,
    #[serde(rename = "o")]
    O,
    #[serde(rename = "t")]
    T,
    #[serde(rename = "s")]
    S,
    #[serde(rename = "z")]
    Z,
    #[serde(rename = "j")]
    J,
    #[serde(rename = "l")]
    L,
}

impl From<PieceKind> for PieceKindLower {
    fn from(value: PieceKind) -> Self {
        match value {
            PieceKind::I => Self::I,
            PieceKind::O => Self::O,
            PieceKind::T => Self::T,
            PieceKind::S => Self::S,
            PieceKind::Z => Self::Z,
            PieceKind::J => Self::J,
            PieceKind::L => Self::L,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FinishReasonLower {
    #[serde(rename = "topped_out")]
    ToppedOut,
    #[serde(rename = "ended")]
    Ended,
    #[serde(rename = "abandoned")]
    Abandoned,
}

impl From<FinishReason> for FinishReasonLower {
    fn from(value: FinishReason) -> Self {
        match value {
            FinishReason::ToppedOut => Self::ToppedOut,
            FinishReason::Ended => Self::Ended,
            FinishReason::Abandoned => Self::Abandoned,
        }
    }
}

/// Final result of a user's game
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameOverMessage {
    #[serde(rename = "type")]
    pub msg_type: GameOverType,
    pub seq: u64,
    pub ts: u64,
    pub user: u64,
    pub reason: FinishReasonLower,
    pub score: u32,
    pub level: u32,
    pub lines: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsMessage {
    #[serde(rename = "type")]
    pub msg_type: StatsType,
    pub seq: u64,
    pub ts: u64,
    pub user: u64,
    pub games_played: u32,
    pub best_score: u32,
    pub best_level: u32,
    pub total_lines: u32,
}

/// Create a welcome message
pub fn create_welcome(seq: u64, client_id: u64) -> WelcomeMessage {
    WelcomeMessage {
        msg_type: WelcomeType::Welcome,
        seq,
        ts: current_timestamp_ms(),
        protocol_version: PROTOCOL_VERSION.to_string(),
        client_id,
        game_id: "chat-tetris".to_string(),
    }
}

/// Create an acknowledgment
pub fn create_ack(seq: u64) -> AckMessage {
    AckMessage {
        msg_type: AckType::Ack,
        seq,
        ts: current_timestamp_ms(),
        status: AckStatus::Ok,
    }
}

/// Create an error message
pub fn create_error(seq: u64, code: ErrorCode, message: &str) -> ErrorMessage {
    ErrorMessage {
        msg_type: ErrorType::Error,
        seq,
        ts: current_timestamp_ms(),
        code,
        message: message.to_string(),
    }
}

pub fn create_observation(seq: u64, user: u64, snap: &GameSnapshot) -> ObservationMessage {
    ObservationMessage {
        msg_type: ObservationType::Observation,
        seq,
        ts: current_timestamp_ms(),
        user,
        board: BoardSnapshot {
            width: BOARD_WIDTH,
            height: BOARD_HEIGHT,
            cells: snap.board,
        },
        active: snap.active.map(ActivePieceSnapshot::from),
        ghost_y: snap.ghost_y,
        next: snap.next.into(),
        score: snap.score,
        level: snap.level,
        lines: snap.lines,
        paused: snap.paused(),
        game_over: snap.game_over(),
        fall_interval_ms: snap.fall_interval_ms,
        pieces_placed: snap.pieces_placed,
        seed: snap.seed,
    }
}

pub fn create_game_over(seq: u64, summary: &GameSummary) -> GameOverMessage {
    GameOverMessage {
        msg_type: GameOverType::GameOver,
        seq,
        ts: current_timestamp_ms(),
        user: summary.session.0,
        reason: summary.reason.into(),
        score: summary.score,
        level: summary.level,
        lines: summary.lines,
    }
}

pub fn create_stats(seq: u64, user: u64, stats: &PlayerStats) -> StatsMessage {
    StatsMessage {
        msg_type: StatsType::Stats,
        seq,
        ts: current_timestamp_ms(),
        user,
        games_played: stats.games_played,
        best_score: stats.best_score,
        best_level: stats.best_level,
        total_lines: stats.total_lines,
    }
}

/// Get current timestamp in milliseconds
pub(crate) fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
