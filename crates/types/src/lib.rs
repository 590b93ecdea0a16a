//! Core types module - shared data structures and constants
//!
//! This module defines the fundamental types used throughout the workspace.
//! All types are pure data with no external dependencies, so the engine,
//! the session driver and the host protocol can share them freely.
//!
//! # Board Dimensions
//!
//! - **Width**: 10 columns (indexed 0-9)
//! - **Height**: 20 rows (indexed 0-19, row 0 is the top)
//!
//! # Progression
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `STARTING_LEVEL` | 1 | Level of a fresh game |
//! | `LINES_PER_LEVEL` | 10 | Lines needed per level |
//! | `MAX_LEVEL` | 15 | Level cap |
//! | `LINE_CLEAR_BASE` | 100 | Multiplied by `lines² × level` |
//!
//! # Fall Speed
//!
//! One automatic downward step every `max(1000 - (level - 1) * 50, 150)` ms:
//!
//! | Level | Interval |
//! |-------|----------|
//! | 1 | 1000ms |
//! | 2 | 950ms |
//! | 10 | 550ms |
//! | 15 | 300ms |
//!
//! # Examples
//!
//! ```
//! use chat_tetris_types::{GameAction, PieceKind, BOARD_HEIGHT, BOARD_WIDTH};
//!
//! let piece = PieceKind::from_str("t").unwrap();
//! assert_eq!(piece, PieceKind::T);
//! assert_eq!(piece.color_index(), 3);
//!
//! let action = GameAction::from_str("moveLeft").unwrap();
//! assert_eq!(action, GameAction::MoveLeft);
//!
//! assert_eq!(BOARD_WIDTH, 10);
//! assert_eq!(BOARD_HEIGHT, 20);
//! ```

/// Board width in cells (10 columns)
pub const BOARD_WIDTH: u8 = 10;

/// Board height in cells (20 rows)
pub const BOARD_HEIGHT: u8 = 20;

/// Level of a freshly started game
pub const STARTING_LEVEL: u32 = 1;

/// Lines that must be cleared to advance one level
pub const LINES_PER_LEVEL: u32 = 10;

/// Highest reachable level
pub const MAX_LEVEL: u32 = 15;

/// Base points for a line clear, scaled by `lines² × level`
pub const LINE_CLEAR_BASE: u32 = 100;

/// Fall interval at level 1 (1000ms = 1 second per row)
pub const BASE_FALL_MS: u32 = 1000;

/// Fall interval reduction per level above 1
pub const FALL_STEP_MS: u32 = 50;

/// Fastest fall interval
pub const MIN_FALL_MS: u32 = 150;

/// Points per row descended by a hard drop
pub const HARD_DROP_POINTS_PER_ROW: u32 = 2;

/// Points per row descended by a player soft drop
pub const SOFT_DROP_POINTS_PER_ROW: u32 = 1;

/// The seven tetromino piece kinds
///
/// Each kind carries a color index (1-7) used in the numeric board grid:
/// - **I** (1): horizontal bar
/// - **O** (2): 2x2 square
/// - **T** (3): T-shaped
/// - **S** (4): S-shaped
/// - **Z** (5): Z-shaped (mirror of S)
/// - **J** (6): J-shaped
/// - **L** (7): L-shaped (mirror of J)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    I,
    O,
    T,
    S,
    Z,
    J,
    L,
}

impl PieceKind {
    /// All kinds, in color index order
    pub const ALL: [PieceKind; 7] = [
        PieceKind::I,
        PieceKind::O,
        PieceKind::T,
        PieceKind::S,
        PieceKind::Z,
        PieceKind::J,
        PieceKind::L,
    ];

    /// Parse piece kind from string (case-insensitive)
    ///
    /// # Examples
    ///
    /// ```
    /// use chat_tetris_types::PieceKind;
    ///
    /// assert_eq!(PieceKind::from_str("i"), Some(PieceKind::I));
    /// assert_eq!(PieceKind::from_str("O"), Some(PieceKind::O));
    /// assert_eq!(PieceKind::from_str("unknown"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "i" => Some(PieceKind::I),
            "o" => Some(PieceKind::O),
            "t" => Some(PieceKind::T),
            "s" => Some(PieceKind::S),
            "z" => Some(PieceKind::Z),
            "j" => Some(PieceKind::J),
            "l" => Some(PieceKind::L),
            _ => None,
        }
    }

    /// Convert to lowercase string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PieceKind::I => "i",
            PieceKind::O => "o",
            PieceKind::T => "t",
            PieceKind::S => "s",
            PieceKind::Z => "z",
            PieceKind::J => "j",
            PieceKind::L => "l",
        }
    }

    /// Color index stored in the numeric board grid (never 0)
    pub fn color_index(&self) -> u8 {
        match self {
            PieceKind::I => 1,
            PieceKind::O => 2,
            PieceKind::T => 3,
            PieceKind::S => 4,
            PieceKind::Z => 5,
            PieceKind::J => 6,
            PieceKind::L => 7,
        }
    }
}

/// Player actions that can be applied to a running game
///
/// Movement actions are silently rejected when the game is not running;
/// the caller never needs to pre-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameAction {
    /// Move piece one cell left
    MoveLeft,
    /// Move piece one cell right
    MoveRight,
    /// Move piece one cell down, locking it if it cannot fall
    SoftDrop,
    /// Drop piece to its resting row and lock it
    HardDrop,
    /// Rotate piece 90° clockwise
    RotateCw,
    /// Pause a running game
    Pause,
    /// Resume a paused game
    Resume,
    /// Pause or resume, whichever applies
    TogglePause,
}

impl GameAction {
    /// Parse action from string (for the host protocol)
    ///
    /// # Examples
    ///
    /// ```
    /// use chat_tetris_types::GameAction;
    ///
    /// assert_eq!(GameAction::from_str("moveLeft"), Some(GameAction::MoveLeft));
    /// assert_eq!(GameAction::from_str("rotate"), Some(GameAction::RotateCw));
    /// assert_eq!(GameAction::from_str("hardDrop"), Some(GameAction::HardDrop));
    /// assert_eq!(GameAction::from_str("hold"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "moveleft" | "left" => Some(GameAction::MoveLeft),
            "moveright" | "right" => Some(GameAction::MoveRight),
            "softdrop" | "down" => Some(GameAction::SoftDrop),
            "harddrop" | "drop" => Some(GameAction::HardDrop),
            "rotate" | "rotatecw" => Some(GameAction::RotateCw),
            "pause" => Some(GameAction::Pause),
            "resume" => Some(GameAction::Resume),
            "togglepause" => Some(GameAction::TogglePause),
            _ => None,
        }
    }

    /// Convert to camelCase string for the host protocol
    pub fn as_str(&self) -> &'static str {
        match self {
            GameAction::MoveLeft => "moveLeft",
            GameAction::MoveRight => "moveRight",
            GameAction::SoftDrop => "softDrop",
            GameAction::HardDrop => "hardDrop",
            GameAction::RotateCw => "rotate",
            GameAction::Pause => "pause",
            GameAction::Resume => "resume",
            GameAction::TogglePause => "togglePause",
        }
    }

    /// Whether this action moves the active piece (as opposed to pausing)
    pub fn is_movement(&self) -> bool {
        !matches!(
            self,
            GameAction::Pause | GameAction::Resume | GameAction::TogglePause
        )
    }
}

/// Lifecycle phase of a game
///
/// `NotStarted → Running ⇄ Paused → GameOver`. `GameOver` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GamePhase {
    NotStarted,
    Running,
    Paused,
    GameOver,
}

impl GamePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            GamePhase::NotStarted => "not_started",
            GamePhase::Running => "running",
            GamePhase::Paused => "paused",
            GamePhase::GameOver => "game_over",
        }
    }
}

/// A cell on the game board
///
/// - `None`: Empty cell (`0` in the numeric grid)
/// - `Some(PieceKind)`: Filled cell (the kind's color index in the numeric grid)
pub type Cell = Option<PieceKind>;
