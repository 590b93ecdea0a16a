//! Piece module - tetromino shapes as bit matrices
//!
//! A shape is the tight bounding matrix of a tetromino (at most 4x4). Rotation
//! is a plain clockwise matrix rotation with no wall kicks: the rotated matrix
//! is checked against the board as-is and either replaces the old one
//! wholesale or is discarded.

use crate::board::Board;
use crate::types::{PieceKind, BOARD_WIDTH};

/// Largest side of any tetromino matrix
pub const MAX_SHAPE_SIDE: usize = 4;

/// A tight bit matrix, row-major, top row first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    bits: [[bool; MAX_SHAPE_SIDE]; MAX_SHAPE_SIDE],
    width: u8,
    height: u8,
}

impl Shape {
    /// Build a shape from row strings where `#` marks a filled cell
    ///
    /// Rows must be non-empty, equally long and at most 4 wide/high.
    const fn from_rows(rows: &[&[u8]]) -> Self {
        let mut bits = [[false; MAX_SHAPE_SIDE]; MAX_SHAPE_SIDE];
        let height = rows.len();
        let width = rows[0].len();
        let mut y = 0;
        while y < height {
            let mut x = 0;
            while x < width {
                bits[y][x] = rows[y][x] == b'#';
                x += 1;
            }
            y += 1;
        }
        Self {
            bits,
            width: width as u8,
            height: height as u8,
        }
    }

    /// Spawn orientation of a piece kind
    pub fn of(kind: PieceKind) -> Self {
        match kind {
            PieceKind::I => SHAPE_I,
            PieceKind::O => SHAPE_O,
            PieceKind::T => SHAPE_T,
            PieceKind::S => SHAPE_S,
            PieceKind::Z => SHAPE_Z,
            PieceKind::J => SHAPE_J,
            PieceKind::L => SHAPE_L,
        }
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn height(&self) -> u8 {
        self.height
    }

    /// Whether the cell at (col, row) of the matrix is filled
    pub fn is_filled(&self, col: usize, row: usize) -> bool {
        col < self.width as usize && row < self.height as usize && self.bits[row][col]
    }

    /// Offsets (col, row) of the filled cells, top-left first
    pub fn offsets(&self) -> impl Iterator<Item = (i8, i8)> + Clone + '_ {
        (0..self.height as usize).flat_map(move |row| {
            (0..self.width as usize)
                .filter(move |&col| self.bits[row][col])
                .map(move |col| (col as i8, row as i8))
        })
    }

    /// Clockwise rotation: `new[r][c] = old[h - 1 - c][r]`
    pub fn rotated_cw(&self) -> Self {
        let mut bits = [[false; MAX_SHAPE_SIDE]; MAX_SHAPE_SIDE];
        let (w, h) = (self.width as usize, self.height as usize);
        for (r, row) in bits.iter_mut().enumerate().take(w) {
            for (c, bit) in row.iter_mut().enumerate().take(h) {
                *bit = self.bits[h - 1 - c][r];
            }
        }
        Self {
            bits,
            width: self.height,
            height: self.width,
        }
    }

    /// Rows as 0/1 vectors, for observers
    pub fn rows(&self) -> Vec<Vec<u8>> {
        (0..self.height as usize)
            .map(|row| {
                (0..self.width as usize)
                    .map(|col| u8::from(self.bits[row][col]))
                    .collect()
            })
            .collect()
    }
}

const SHAPE_I: Shape = Shape::from_rows(&[b"####"]);
const SHAPE_O: Shape = Shape::from_rows(&[b"##", b"##"]);
const SHAPE_T: Shape = Shape::from_rows(&[b".#.", b"###"]);
const SHAPE_S: Shape = Shape::from_rows(&[b".##", b"##."]);
const SHAPE_Z: Shape = Shape::from_rows(&[b"##.", b".##"]);
const SHAPE_J: Shape = Shape::from_rows(&[b"#..", b"###"]);
const SHAPE_L: Shape = Shape::from_rows(&[b"..#", b"###"]);

/// The active falling piece: a shape, its kind (color) and its board position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub kind: PieceKind,
    pub shape: Shape,
    pub x: i8,
    pub y: i8,
}

impl Piece {
    /// Create a piece at its spawn position (top row, horizontally centered)
    pub fn spawn(kind: PieceKind) -> Self {
        let shape = Shape::of(kind);
        Self {
            kind,
            shape,
            x: (BOARD_WIDTH / 2) as i8 - (shape.width / 2) as i8,
            y: 0,
        }
    }

    /// Absolute board coordinates of the filled cells
    pub fn cells(&self) -> impl Iterator<Item = (i8, i8)> + Clone + '_ {
        self.shape
            .offsets()
            .map(move |(dx, dy)| (self.x.saturating_add(dx), self.y.saturating_add(dy)))
    }

    /// Check that every cell is in bounds and on an empty board cell
    pub fn fits(&self, board: &Board) -> bool {
        self.cells().all(|(x, y)| board.is_valid(x, y))
    }

    /// Same piece shifted by (dx, dy), or `None` if the origin would overflow
    pub fn shifted(&self, dx: i8, dy: i8) -> Option<Self> {
        Some(Self {
            x: self.x.checked_add(dx)?,
            y: self.y.checked_add(dy)?,
            ..*self
        })
    }

    /// Same piece with its shape rotated clockwise in place (same origin)
    pub fn rotated(&self) -> Self {
        Self {
            shape: self.shape.rotated_cw(),
            ..*self
        }
    }

    /// Whether the piece cannot move one row down
    pub fn is_grounded(&self, board: &Board) -> bool {
        !self.shifted(0, 1).is_some_and(|p| p.fits(board))
    }
}
