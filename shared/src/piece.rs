//! Piece kinds and the contents of a single board square.

use crate::NEUTRAL_TEAM;

/// The six piece kinds plus the empty marker.
///
/// The discriminants are the values used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u16)]
pub enum Piece {
    #[default]
    None = 0,
    Pawn = 1,
    Knight = 2,
    Bishop = 3,
    Rook = 4,
    Queen = 5,
    King = 6,
}

impl Piece {
    /// Every real piece kind, in wire order.
    pub const ALL: [Piece; 6] = [
        Piece::Pawn,
        Piece::Knight,
        Piece::Bishop,
        Piece::Rook,
        Piece::Queen,
        Piece::King,
    ];

    /// Maps a wire value back to a piece. Unknown values are treated as empty.
    pub fn from_u16(value: u16) -> Self {
        match value {
            1 => Piece::Pawn,
            2 => Piece::Knight,
            3 => Piece::Bishop,
            4 => Piece::Rook,
            5 => Piece::Queen,
            6 => Piece::King,
            _ => Piece::None,
        }
    }

    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn is_none(self) -> bool {
        self == Piece::None
    }

    /// Single character used by the debug board dump.
    pub fn symbol(self) -> char {
        match self {
            Piece::None => '.',
            Piece::Pawn => 'p',
            Piece::Knight => 'n',
            Piece::Bishop => 'b',
            Piece::Rook => 'r',
            Piece::Queen => 'q',
            Piece::King => 'k',
        }
    }
}

/// Occupant of one square: owning team and piece kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cell {
    pub team: u16,
    pub piece: Piece,
}

impl Cell {
    pub const EMPTY: Cell = Cell {
        team: NEUTRAL_TEAM,
        piece: Piece::None,
    };

    /// Builds a cell, forcing empty squares to be unowned.
    pub fn new(team: u16, piece: Piece) -> Self {
        if piece.is_none() {
            Self::EMPTY
        } else {
            Self { team, piece }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.piece.is_none()
    }
}
