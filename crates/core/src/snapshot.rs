use crate::board::U8Grid;
use crate::piece::{Piece, Shape};
use crate::types::{GamePhase, PieceKind, BOARD_HEIGHT, BOARD_WIDTH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActiveSnapshot {
    pub kind: PieceKind,
    pub shape: Shape,
    pub x: i8,
    pub y: i8,
}

impl From<Piece> for ActiveSnapshot {
    fn from(value: Piece) -> Self {
        Self {
            kind: value.kind,
            shape: value.shape,
            x: value.x,
            y: value.y,
        }
    }
}

/// Owned, `Copy` view of a game taken between two operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GameSnapshot {
    pub board: U8Grid,
    pub active: Option<ActiveSnapshot>,
    /// Row the active piece would land on
    pub ghost_y: Option<i8>,
    pub next: PieceKind,
    pub phase: GamePhase,
    pub seed: u32,
    pub pieces_placed: u32,
    pub score: u32,
    pub level: u32,
    pub lines: u32,
    pub fall_interval_ms: u32,
}

impl GameSnapshot {
    pub fn clear(&mut self) {
        self.board = [[0u8; BOARD_WIDTH as usize]; BOARD_HEIGHT as usize];
        self.active = None;
        self.ghost_y = None;
        self.next = PieceKind::I;
        self.phase = GamePhase::NotStarted;
        self.seed = 0;
        self.pieces_placed = 0;
        self.score = 0;
        self.level = 0;
        self.lines = 0;
        self.fall_interval_ms = 0;
    }

    pub fn paused(&self) -> bool {
        self.phase == GamePhase::Paused
    }

    pub fn game_over(&self) -> bool {
        self.phase == GamePhase::GameOver
    }

    pub fn playable(&self) -> bool {
        self.phase == GamePhase::Running
    }

    /// Board grid with the active piece drawn in, for observers
    pub fn composed_board(&self) -> U8Grid {
        let mut grid = self.board;
        if let Some(active) = self.active {
            let color = active.kind.color_index();
            for (dx, dy) in active.shape.offsets() {
                let (x, y) = (active.x + dx, active.y + dy);
                if (0..BOARD_WIDTH as i8).contains(&x) && (0..BOARD_HEIGHT as i8).contains(&y) {
                    grid[y as usize][x as usize] = color;
                }
            }
        }
        grid
    }
}

impl Default for GameSnapshot {
    fn default() -> Self {
        Self {
            board: [[0u8; BOARD_WIDTH as usize]; BOARD_HEIGHT as usize],
            active: None,
            ghost_y: None,
            next: PieceKind::I,
            phase: GamePhase::NotStarted,
            seed: 0,
            pieces_placed: 0,
            score: 0,
            level: 0,
            lines: 0,
            fall_interval_ms: 0,
        }
    }
}
