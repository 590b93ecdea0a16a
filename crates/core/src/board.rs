//! Board module - manages the game grid
//!
//! The board is a 10x20 grid where each cell is empty or holds a piece kind.
//! Uses a flat array so a game never allocates for its grid.
//! Coordinates: (x, y) where x ranges 0..9 (left to right), y ranges 0..19 (top to bottom).

use arrayvec::ArrayVec;

use crate::types::{Cell, PieceKind, BOARD_HEIGHT, BOARD_WIDTH};

/// Total number of cells on the board
const BOARD_SIZE: usize = (BOARD_WIDTH as usize) * (BOARD_HEIGHT as usize);

/// Numeric grid form of the board: 0 = empty, 1-7 = piece color index
pub type U8Grid = [[u8; BOARD_WIDTH as usize]; BOARD_HEIGHT as usize];

/// Row indices removed by one clear
pub type ClearedRows = ArrayVec<usize, { BOARD_HEIGHT as usize }>;

/// The game board - 10 columns x 20 rows using flat array storage
#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    /// Flat array of cells, row-major order (y * WIDTH + x)
    cells: [Cell; BOARD_SIZE],
}

impl Board {
    /// Create a new empty board
    pub fn new() -> Self {
        Self {
            cells: [None; BOARD_SIZE],
        }
    }

    #[inline(always)]
    fn index(x: i8, y: i8) -> Option<usize> {
        if x < 0 || x >= BOARD_WIDTH as i8 || y < 0 || y >= BOARD_HEIGHT as i8 {
            return None;
        }
        Some((y as usize) * (BOARD_WIDTH as usize) + (x as usize))
    }

    pub fn width(&self) -> u8 {
        BOARD_WIDTH
    }

    pub fn height(&self) -> u8 {
        BOARD_HEIGHT
    }

    /// Get cell at position (x, y)
    /// Returns None if out of bounds
    pub fn get(&self, x: i8, y: i8) -> Option<Cell> {
        Self::index(x, y).map(|idx| self.cells[idx])
    }

    /// Set cell at position (x, y)
    /// Returns false if out of bounds
    pub fn set(&mut self, x: i8, y: i8, cell: Cell) -> bool {
        match Self::index(x, y) {
            Some(idx) => {
                self.cells[idx] = cell;
                true
            }
            None => false,
        }
    }

    /// Check if position is valid (within bounds and empty)
    pub fn is_valid(&self, x: i8, y: i8) -> bool {
        matches!(self.get(x, y), Some(None))
    }

    /// Check if a row has no empty cell
    pub fn is_row_full(&self, y: usize) -> bool {
        if y >= BOARD_HEIGHT as usize {
            return false;
        }
        let start = y * BOARD_WIDTH as usize;
        let end = start + BOARD_WIDTH as usize;
        self.cells[start..end].iter().all(|cell| cell.is_some())
    }

    /// Remove every full row, shift the rows above down and refill the top
    /// with empty rows.
    ///
    /// Returns the removed row indices (pre-clear coordinates, bottom to top).
    pub fn clear_full_rows(&mut self) -> ClearedRows {
        let mut cleared_rows = ArrayVec::new();
        let width = BOARD_WIDTH as usize;
        let mut write_y = BOARD_HEIGHT as usize;

        for read_y in (0..BOARD_HEIGHT as usize).rev() {
            if self.is_row_full(read_y) {
                cleared_rows.push(read_y);
            } else {
                write_y -= 1;
                if write_y != read_y {
                    let src_start = read_y * width;
                    let dst_start = write_y * width;
                    self.cells
                        .copy_within(src_start..src_start + width, dst_start);
                }
            }
        }

        for cell in &mut self.cells[..write_y * width] {
            *cell = None;
        }

        cleared_rows
    }

    /// Write the given cells permanently
    ///
    /// Returns false (and writes nothing) if any cell is out of bounds or occupied.
    pub fn lock_cells<I>(&mut self, cells: I, kind: PieceKind) -> bool
    where
        I: IntoIterator<Item = (i8, i8)> + Clone,
    {
        if !cells.clone().into_iter().all(|(x, y)| self.is_valid(x, y)) {
            return false;
        }
        for (x, y) in cells {
            self.set(x, y, Some(kind));
        }
        true
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Number of filled cells
    pub fn filled_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Clear the entire board
    pub fn clear(&mut self) {
        self.cells = [None; BOARD_SIZE];
    }

    /// Write the numeric grid form (0 = empty, 1-7 = color index)
    pub fn write_u8_grid(&self, out: &mut U8Grid) {
        let width = BOARD_WIDTH as usize;
        for (y, row) in out.iter_mut().enumerate() {
            for (x, v) in row.iter_mut().enumerate() {
                *v = self.cells[y * width + x].map_or(0, |k| k.color_index());
            }
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_index_calculation() {
        assert_eq!(Board::index(0, 0), Some(0));
        assert_eq!(Board::index(9, 0), Some(9));
        assert_eq!(Board::index(0, 1), Some(10));
        assert_eq!(Board::index(9, 19), Some(199));
        assert_eq!(Board::index(-1, 0), None);
        assert_eq!(Board::index(10, 0), None);
        assert_eq!(Board::index(0, 20), None);
    }

    #[test]
    fn test_u8_grid_uses_color_indices() {
        let mut board = Board::new();
        board.set(0, 0, Some(PieceKind::I));
        board.set(5, 10, Some(PieceKind::L));

        let mut grid = [[0u8; 10]; 20];
        board.write_u8_grid(&mut grid);
        assert_eq!(grid[0][0], 1);
        assert_eq!(grid[10][5], 7);
        assert_eq!(grid.iter().flatten().filter(|&&v| v != 0).count(), 2);
    }

    #[test]
    fn test_lock_cells_is_all_or_nothing() {
        let mut board = Board::new();
        board.set(4, 19, Some(PieceKind::O));

        let blocked = [(3, 19), (4, 19)];
        assert!(!board.lock_cells(blocked, PieceKind::T));
        assert_eq!(board.get(3, 19), Some(None));

        let free = [(3, 18), (4, 18)];
        assert!(board.lock_cells(free, PieceKind::T));
        assert_eq!(board.filled_count(), 3);
    }
}
