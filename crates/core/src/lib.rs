//! Core game logic - pure, deterministic, and testable
//!
//! This crate holds the rules of a single game: board, pieces, scoring and
//! the state machine tying them together. It has no dependencies on timers,
//! networking or I/O. Gravity is driven from outside by calling
//! [`GameState::step_down`] on the interval reported by
//! [`GameState::fall_interval`].
//!
//! # Module Structure
//!
//! - [`board`]: 10x20 grid with collision queries and line clearing
//! - [`piece`]: tetromino bit matrices and clockwise rotation
//! - [`rng`]: seeded uniform piece generation with a one-piece preview
//! - [`scoring`]: line points, level progression and fall speed
//! - [`game_state`]: the engine operations and phase machine
//! - [`snapshot`]: owned views handed to observers
//!
//! # Game Rules
//!
//! - Pieces are drawn uniformly at random, independent of history
//! - Rotation is clockwise only and never kicks off walls
//! - A piece that cannot fall locks immediately; there is no lock delay
//! - Clearing `n` lines at level `L` scores `n² × 100 × L`
//! - Every 10 lines raise the level, capped at 15
//!
//! # Example
//!
//! ```
//! use chat_tetris_core::GameState;
//! use chat_tetris_types::GameAction;
//!
//! let mut game = GameState::new(12345);
//! game.start();
//!
//! game.apply_action(GameAction::MoveRight);
//! game.apply_action(GameAction::RotateCw);
//! game.apply_action(GameAction::HardDrop);
//!
//! assert!(game.score() > 0); // Hard drop awards points
//! ```

pub mod board;
pub mod game_state;
pub mod piece;
pub mod rng;
pub mod scoring;
pub mod snapshot;

pub use chat_tetris_types as types;

pub use board::{Board, U8Grid};
pub use game_state::{GameState, StepOutcome};
pub use piece::{Piece, Shape};
pub use rng::{PieceQueue, SimpleRng};
pub use scoring::{calculate_drop_score, calculate_level, calculate_line_score, fall_interval};
pub use snapshot::{ActiveSnapshot, GameSnapshot};
