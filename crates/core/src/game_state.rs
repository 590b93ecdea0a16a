//! Game state module - the falling-piece engine
//!
//! Ties together board, pieces, RNG and scoring. Every operation runs to
//! completion synchronously; the engine holds no timers. Whoever owns the
//! `GameState` decides when gravity happens by calling [`GameState::step_down`]
//! every [`GameState::fall_interval`].
//!
//! Invalid moves and rotations are rejected by returning `false` and leaving
//! the state untouched, so input handlers can fire and forget.

use std::time::Duration;

use crate::board::Board;
use crate::piece::Piece;
use crate::rng::PieceQueue;
use crate::scoring::{
    calculate_drop_score, calculate_level, calculate_line_score, fall_interval, fall_interval_ms,
};
use crate::snapshot::{ActiveSnapshot, GameSnapshot};
use crate::types::{GameAction, GamePhase, PieceKind, STARTING_LEVEL};

/// Result of one downward step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The game is not running (not started, paused or over)
    Ignored,
    /// The piece fell one row
    Moved,
    /// The piece could not fall, was merged and the next piece spawned
    Locked { lines_cleared: u32 },
    /// The piece was merged but the next one could not spawn
    ToppedOut,
}

/// Complete game state
#[derive(Debug, Clone)]
pub struct GameState {
    board: Board,
    active: Option<Piece>,
    piece_queue: PieceQueue,
    score: u32,
    level: u32,
    lines: u32,
    pieces_placed: u32,
    started: bool,
    paused: bool,
    game_over: bool,
}

impl GameState {
    /// Create a new game with the given RNG seed
    pub fn new(seed: u32) -> Self {
        Self::with_board(seed, Board::new())
    }

    /// Create a game over a pre-filled board (puzzles, replays, tests)
    pub fn with_board(seed: u32, board: Board) -> Self {
        Self {
            board,
            active: None,
            piece_queue: PieceQueue::new(seed),
            score: 0,
            level: STARTING_LEVEL,
            lines: 0,
            pieces_placed: 0,
            started: false,
            paused: false,
            game_over: false,
        }
    }

    /// Start the game and spawn the first piece
    ///
    /// Returns false if the game was already started or ended.
    pub fn start(&mut self) -> bool {
        if self.started || self.game_over {
            return false;
        }
        self.started = true;
        self.spawn_piece();
        true
    }

    /// End the game; any phase moves to `GameOver`
    pub fn end(&mut self) {
        self.game_over = true;
        self.paused = false;
    }

    pub fn pause(&mut self) -> bool {
        if self.phase() != GamePhase::Running {
            return false;
        }
        self.paused = true;
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.phase() != GamePhase::Paused {
            return false;
        }
        self.paused = false;
        true
    }

    pub fn toggle_pause(&mut self) -> bool {
        match self.phase() {
            GamePhase::Running => self.pause(),
            GamePhase::Paused => self.resume(),
            _ => false,
        }
    }

    pub fn phase(&self) -> GamePhase {
        if self.game_over {
            GamePhase::GameOver
        } else if !self.started {
            GamePhase::NotStarted
        } else if self.paused {
            GamePhase::Paused
        } else {
            GamePhase::Running
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase() == GamePhase::Running
    }

    pub fn started(&self) -> bool {
        self.started
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn game_over(&self) -> bool {
        self.game_over
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn lines(&self) -> u32 {
        self.lines
    }

    pub fn pieces_placed(&self) -> u32 {
        self.pieces_placed
    }

    pub fn seed(&self) -> u32 {
        self.piece_queue.seed()
    }

    pub fn next_piece(&self) -> PieceKind {
        self.piece_queue.peek()
    }

    pub fn active(&self) -> Option<Piece> {
        self.active
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Time between automatic downward steps at the current level
    pub fn fall_interval(&self) -> Duration {
        fall_interval(self.level)
    }

    pub fn snapshot_into(&self, out: &mut GameSnapshot) {
        self.board.write_u8_grid(&mut out.board);
        out.active = self.active.map(ActiveSnapshot::from);
        out.ghost_y = self.ghost_y();
        out.next = self.piece_queue.peek();
        out.phase = self.phase();
        out.seed = self.piece_queue.seed();
        out.pieces_placed = self.pieces_placed;
        out.score = self.score;
        out.level = self.level;
        out.lines = self.lines;
        out.fall_interval_ms = fall_interval_ms(self.level);
    }

    pub fn snapshot(&self) -> GameSnapshot {
        let mut s = GameSnapshot::default();
        self.snapshot_into(&mut s);
        s
    }

    /// Spawn the next piece from the queue
    ///
    /// A piece that does not fit at its spawn position ends the game.
    pub fn spawn_piece(&mut self) -> bool {
        if self.game_over {
            return false;
        }

        let piece = Piece::spawn(self.piece_queue.draw());
        if !piece.fits(&self.board) {
            self.active = None;
            self.game_over = true;
            return false;
        }

        self.active = Some(piece);
        true
    }

    /// Translate the active piece if every resulting cell is free
    pub fn move_piece(&mut self, dx: i8, dy: i8) -> bool {
        let Some(active) = self.active else {
            return false;
        };

        let Some(moved) = active.shifted(dx, dy).filter(|p| p.fits(&self.board)) else {
            return false;
        };
        self.active = Some(moved);
        true
    }

    /// Rotate the active piece clockwise if the rotated shape fits where it is
    pub fn rotate(&mut self) -> bool {
        let Some(active) = self.active else {
            return false;
        };

        let rotated = active.rotated();
        if !rotated.fits(&self.board) {
            return false;
        }
        self.active = Some(rotated);
        true
    }

    /// Move the active piece down until it rests; returns rows descended
    ///
    /// The piece is not merged.
    pub fn hard_drop(&mut self) -> u32 {
        let mut rows = 0;
        while self.move_piece(0, 1) {
            rows += 1;
        }
        rows
    }

    /// Write the active piece into the board permanently
    pub fn merge_piece(&mut self) -> bool {
        let Some(active) = self.active.take() else {
            return false;
        };
        let locked = self.board.lock_cells(active.cells(), active.kind);
        if locked {
            self.pieces_placed = self.pieces_placed.saturating_add(1);
        }
        locked
    }

    /// Remove full rows and score them; returns the number removed
    ///
    /// Points use the level in effect before the clear.
    pub fn clear_lines(&mut self) -> u32 {
        let cleared = self.board.clear_full_rows().len() as u32;
        if cleared == 0 {
            return 0;
        }

        self.score = self
            .score
            .saturating_add(calculate_line_score(cleared, self.level));
        self.lines = self.lines.saturating_add(cleared);
        self.level = calculate_level(self.lines).max(self.level);
        cleared
    }

    /// Merge, clear and spawn: the sequence after a piece stops falling
    fn lock_and_spawn(&mut self) -> StepOutcome {
        if self.active.is_none() {
            return StepOutcome::Ignored;
        }
        self.merge_piece();
        let lines_cleared = self.clear_lines();
        if self.spawn_piece() {
            StepOutcome::Locked { lines_cleared }
        } else {
            StepOutcome::ToppedOut
        }
    }

    /// One gravity step: fall a row, or lock the piece if it cannot fall
    pub fn step_down(&mut self) -> StepOutcome {
        if !self.is_running() {
            return StepOutcome::Ignored;
        }
        if self.move_piece(0, 1) {
            StepOutcome::Moved
        } else {
            self.lock_and_spawn()
        }
    }

    /// Whether the active piece rests on the floor or the stack
    pub fn is_grounded(&self) -> bool {
        self.active
            .map(|piece| piece.is_grounded(&self.board))
            .unwrap_or(false)
    }

    /// Row the active piece would rest on after a hard drop
    pub fn ghost_y(&self) -> Option<i8> {
        let mut piece = self.active?;
        while let Some(below) = piece.shifted(0, 1).filter(|p| p.fits(&self.board)) {
            piece = below;
        }
        Some(piece.y)
    }

    /// Apply a player action
    ///
    /// Returns whether the state changed. Movement is ignored unless the game
    /// is running.
    pub fn apply_action(&mut self, action: GameAction) -> bool {
        if action.is_movement() && !self.is_running() {
            return false;
        }

        match action {
            GameAction::MoveLeft => self.move_piece(-1, 0),
            GameAction::MoveRight => self.move_piece(1, 0),
            GameAction::RotateCw => self.rotate(),
            GameAction::SoftDrop => match self.step_down() {
                StepOutcome::Moved => {
                    self.score = self.score.saturating_add(calculate_drop_score(1, false));
                    true
                }
                StepOutcome::Ignored => false,
                StepOutcome::Locked { .. } | StepOutcome::ToppedOut => true,
            },
            GameAction::HardDrop => {
                let rows = self.hard_drop();
                self.score = self.score.saturating_add(calculate_drop_score(rows, true));
                self.lock_and_spawn();
                true
            }
            GameAction::Pause => self.pause(),
            GameAction::Resume => self.resume(),
            GameAction::TogglePause => self.toggle_pause(),
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BOARD_HEIGHT, BOARD_WIDTH};

    /// Seed whose first piece is an I (then Z)
    const SEED_I_FIRST: u32 = 3;
    /// Seed whose first piece is an O (then L)
    const SEED_O_FIRST: u32 = 5;

    fn started(seed: u32) -> GameState {
        let mut state = GameState::new(seed);
        state.start();
        state
    }

    #[test]
    fn test_new_game_state() {
        let state = GameState::new(12345);
        assert_eq!(state.phase(), GamePhase::NotStarted);
        assert!(state.active().is_none());
        assert_eq!(state.score(), 0);
        assert_eq!(state.level(), 1);
        assert_eq!(state.lines(), 0);
    }

    #[test]
    fn test_game_start() {
        let mut state = GameState::new(12345);
        assert!(state.start());
        assert_eq!(state.phase(), GamePhase::Running);
        assert!(state.active().is_some());
        assert!(!state.start());
    }

    #[test]
    fn test_seeded_first_pieces() {
        assert_eq!(started(SEED_I_FIRST).active().unwrap().kind, PieceKind::I);
        assert_eq!(started(SEED_I_FIRST).next_piece(), PieceKind::Z);
        assert_eq!(started(SEED_O_FIRST).active().unwrap().kind, PieceKind::O);
    }

    #[test]
    fn test_move_piece() {
        let mut state = started(SEED_I_FIRST);
        let x = state.active().unwrap().x;

        assert!(state.move_piece(-1, 0));
        assert_eq!(state.active().unwrap().x, x - 1);
        assert!(state.move_piece(1, 0));
        assert!(state.move_piece(0, 1));
        assert_eq!(state.active().unwrap().y, 1);
    }

    #[test]
    fn test_move_piece_stops_at_walls() {
        let mut state = started(SEED_I_FIRST);
        while state.move_piece(-1, 0) {}
        assert_eq!(state.active().unwrap().x, 0);
        let before = state.active();
        assert!(!state.move_piece(-1, 0));
        assert_eq!(state.active(), before);

        while state.move_piece(1, 0) {}
        assert_eq!(state.active().unwrap().x, BOARD_WIDTH as i8 - 4);
    }

    #[test]
    fn test_move_piece_rejects_huge_offsets() {
        let mut state = started(SEED_I_FIRST);
        let before = state.snapshot();
        assert!(!state.move_piece(i8::MAX, 0));
        assert!(!state.move_piece(i8::MIN, 0));
        assert!(!state.move_piece(0, i8::MAX));
        assert!(!state.move_piece(i8::MAX - 3, 0));
        assert_eq!(state.snapshot(), before);
    }

    #[test]
    fn test_move_piece_collision() {
        let mut board = Board::new();
        board.set(3, 1, Some(PieceKind::L));
        let mut state = GameState::with_board(SEED_I_FIRST, board);
        state.start();

        let before = state.active();
        assert!(!state.move_piece(0, 1));
        assert_eq!(state.active(), before);
    }

    #[test]
    fn test_rotate_replaces_shape() {
        let mut state = started(SEED_I_FIRST);
        state.move_piece(0, 1);
        assert!(state.rotate());
        let piece = state.active().unwrap();
        assert_eq!((piece.shape.width(), piece.shape.height()), (1, 4));
    }

    #[test]
    fn test_rotate_rejected_without_kick() {
        // Vertical I needs rows 0..4; block row 2 under its column.
        let mut board = Board::new();
        board.set(3, 2, Some(PieceKind::T));
        let mut state = GameState::with_board(SEED_I_FIRST, board);
        state.start();

        let before = state.active();
        assert!(!state.rotate());
        assert_eq!(state.active(), before);
    }

    #[test]
    fn test_hard_drop_does_not_merge() {
        let mut state = started(SEED_I_FIRST);
        let rows = state.hard_drop();
        assert_eq!(rows, BOARD_HEIGHT as u32 - 1);
        assert!(state.active().is_some());
        assert!(state.is_grounded());
        assert_eq!(state.board().filled_count(), 0);
    }

    #[test]
    fn test_ghost_y() {
        let state = started(SEED_O_FIRST);
        assert_eq!(state.ghost_y(), Some(BOARD_HEIGHT as i8 - 2));
    }

    #[test]
    fn test_merge_piece() {
        let mut state = started(SEED_O_FIRST);
        state.hard_drop();
        assert!(state.merge_piece());
        assert!(state.active().is_none());
        assert_eq!(state.board().filled_count(), 4);
        assert_eq!(state.pieces_placed(), 1);
        assert!(!state.merge_piece());
    }

    #[test]
    fn test_clear_lines_scores_with_previous_level() {
        let mut board = Board::new();
        for y in 18..20 {
            for x in 0..BOARD_WIDTH as i8 {
                board.set(x, y, Some(PieceKind::J));
            }
        }
        let mut state = GameState::with_board(1, board);
        state.start();

        assert_eq!(state.clear_lines(), 2);
        assert_eq!(state.score(), 400);
        assert_eq!(state.lines(), 2);
        assert_eq!(state.level(), 1);
        assert_eq!(state.clear_lines(), 0);
        assert_eq!(state.score(), 400);
    }

    #[test]
    fn test_step_down_locks_and_spawns() {
        let mut state = started(SEED_I_FIRST);
        for _ in 0..19 {
            assert_eq!(state.step_down(), StepOutcome::Moved);
        }
        assert_eq!(state.step_down(), StepOutcome::Locked { lines_cleared: 0 });
        assert_eq!(state.active().unwrap().kind, PieceKind::Z);
        assert!(!state.game_over());
    }

    #[test]
    fn test_step_down_ignored_when_paused() {
        let mut state = started(SEED_I_FIRST);
        assert!(state.pause());
        assert_eq!(state.step_down(), StepOutcome::Ignored);
        assert!(!state.apply_action(GameAction::MoveLeft));
        assert!(state.resume());
        assert_eq!(state.step_down(), StepOutcome::Moved);
    }

    #[test]
    fn test_pause_transitions() {
        let mut state = GameState::new(1);
        assert!(!state.pause());
        state.start();
        assert!(state.apply_action(GameAction::TogglePause));
        assert_eq!(state.phase(), GamePhase::Paused);
        assert!(!state.apply_action(GameAction::Pause));
        assert!(state.apply_action(GameAction::TogglePause));
        assert_eq!(state.phase(), GamePhase::Running);
        state.end();
        assert!(!state.apply_action(GameAction::Resume));
        assert_eq!(state.phase(), GamePhase::GameOver);
    }

    #[test]
    fn test_blocked_spawn_is_game_over() {
        let mut board = Board::new();
        board.set(4, 0, Some(PieceKind::S));
        let mut state = GameState::with_board(SEED_I_FIRST, board);
        state.start();
        assert!(state.game_over());
        assert!(state.active().is_none());
        assert!(!state.start());
    }

    #[test]
    fn test_hard_drop_action_scores_rows() {
        let mut state = started(SEED_O_FIRST);
        assert!(state.apply_action(GameAction::HardDrop));
        assert_eq!(state.score(), 2 * (BOARD_HEIGHT as u32 - 2));
        assert_eq!(state.pieces_placed(), 1);
        assert_eq!(state.active().unwrap().kind, PieceKind::L);
    }

    #[test]
    fn test_soft_drop_action_scores_one() {
        let mut state = started(SEED_O_FIRST);
        assert!(state.apply_action(GameAction::SoftDrop));
        assert_eq!(state.score(), 1);
        assert_eq!(state.active().unwrap().y, 1);
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let state = started(SEED_I_FIRST);
        let snap = state.snapshot();
        assert_eq!(snap.phase, GamePhase::Running);
        assert_eq!(snap.active.unwrap().kind, PieceKind::I);
        assert_eq!(snap.next, PieceKind::Z);
        assert_eq!(snap.level, 1);
        assert_eq!(snap.fall_interval_ms, 1000);
        assert_eq!(snap.composed_board()[0][3..7], [1, 1, 1, 1]);
    }
}
