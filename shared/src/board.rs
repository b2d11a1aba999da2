//! The shared grid every team plays on.
//!
//! `Board` is plain state: it knows nothing about sessions or sockets. Every
//! mutation goes through [`Board::set_cell`], which hands back a
//! [`CellUpdate`] the caller may broadcast.

use crate::piece::{Cell, Piece};
use crate::{BOARD_HEIGHT, BOARD_WIDTH};
use rand::Rng;
use thiserror::Error;

/// Upper bound on rejection-sampling draws in [`Board::find_random_empty_cell`].
pub const MAX_PLACEMENT_ATTEMPTS: usize = 100_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoardError {
    #[error("no empty cell found after {attempts} random draws, board is saturated")]
    Saturated { attempts: usize },
}

/// A single square change, in the shape of the cell-update frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellUpdate {
    pub x: usize,
    pub y: usize,
    pub piece: Piece,
    pub team: u16,
}

/// Point-in-time copy of the board as two parallel grids.
///
/// Both grids are flattened with `x` as the outer index, so the value for
/// `(x, y)` lives at `x * height + y`. This is also the order of the welcome
/// frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardSnapshot {
    width: usize,
    height: usize,
    pieces: Vec<Piece>,
    teams: Vec<u16>,
}

impl BoardSnapshot {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    pub fn piece(&self, x: usize, y: usize) -> Piece {
        self.pieces[x * self.height + y]
    }

    pub fn team(&self, x: usize, y: usize) -> u16 {
        self.teams[x * self.height + y]
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn teams(&self) -> &[u16] {
        &self.teams
    }
}

#[derive(Debug, Clone)]
pub struct Board {
    width: usize,
    height: usize,
    // row-major: index = y * width + x
    cells: Vec<Cell>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// Creates an empty board with the arena dimensions.
    pub fn new() -> Self {
        Self::with_dimensions(BOARD_WIDTH, BOARD_HEIGHT)
    }

    /// Creates an empty board of arbitrary size. Coordinates must fit the
    /// 16-bit wire fields.
    pub fn with_dimensions(width: usize, height: usize) -> Self {
        assert!(width > 0 && height > 0, "board must not be empty");
        assert!(
            width <= u16::MAX as usize && height <= u16::MAX as usize,
            "board dimensions must fit in u16"
        );
        Self {
            width,
            height,
            cells: vec![Cell::EMPTY; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// True if `(x, y)` lies on the board. Untrusted coordinates must pass
    /// this before any other access.
    pub fn in_bounds(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height
    }

    fn index(&self, x: usize, y: usize) -> usize {
        assert!(
            self.in_bounds(x, y),
            "cell ({}, {}) outside {}x{} board",
            x,
            y,
            self.width,
            self.height
        );
        y * self.width + x
    }

    /// Returns the occupant of a square.
    ///
    /// # Panics
    /// If `(x, y)` is off the board.
    pub fn get_cell(&self, x: usize, y: usize) -> Cell {
        self.cells[self.index(x, y)]
    }

    /// Overwrites a square unconditionally.
    ///
    /// Returns the resulting change so the caller can decide whether to
    /// broadcast it.
    pub fn set_cell(&mut self, team: u16, piece: Piece, x: usize, y: usize) -> CellUpdate {
        let cell = Cell::new(team, piece);
        let index = self.index(x, y);
        self.cells[index] = cell;
        CellUpdate {
            x,
            y,
            piece: cell.piece,
            team: cell.team,
        }
    }

    /// Picks a uniformly random empty square by rejection sampling.
    pub fn find_random_empty_cell<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<(usize, usize), BoardError> {
        for _ in 0..MAX_PLACEMENT_ATTEMPTS {
            let x = rng.gen_range(0..self.width);
            let y = rng.gen_range(0..self.height);
            if self.get_cell(x, y).is_empty() {
                return Ok((x, y));
            }
        }

        Err(BoardError::Saturated {
            attempts: MAX_PLACEMENT_ATTEMPTS,
        })
    }

    /// Copies the whole board into x-major piece and team grids, the layout
    /// the welcome frame and the move rules read.
    pub fn snapshot(&self) -> BoardSnapshot {
        let len = self.width * self.height;
        let mut pieces = Vec::with_capacity(len);
        let mut teams = Vec::with_capacity(len);

        for x in 0..self.width {
            for y in 0..self.height {
                let cell = self.get_cell(x, y);
                pieces.push(cell.piece);
                teams.push(cell.team);
            }
        }

        BoardSnapshot {
            width: self.width,
            height: self.height,
            pieces,
            teams,
        }
    }

    /// Every piece owned by `team` as `(piece, x, y)`.
    ///
    /// This is a full scan of the grid, O(width * height) per call.
    pub fn pieces_of(&self, team: u16) -> Vec<(Piece, usize, usize)> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| !cell.is_empty() && cell.team == team)
            .map(|(index, cell)| (cell.piece, index % self.width, index / self.width))
            .collect()
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|cell| !cell.is_empty()).count()
    }

    /// Text dump of the grid, one line per row.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity((self.width + 1) * self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                out.push(self.get_cell(x, y).piece.symbol());
            }
            out.push('\n');
        }
        out
    }
}
