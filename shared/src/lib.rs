//! Types and rules shared by the arena server and its clients.
//!
//! Everything here is pure: the board grid, the per-piece movement rules and
//! the binary frame codec. Nothing in this crate performs I/O.

pub mod board;
pub mod piece;
pub mod protocol;
pub mod rules;

pub use board::{Board, BoardError, BoardSnapshot, CellUpdate};
pub use piece::{Cell, Piece};
pub use protocol::{ClientFrame, ServerFrame};
pub use rules::{is_legal_move, legal_moves};

use std::time::Duration;

pub const BOARD_WIDTH: usize = 64;
pub const BOARD_HEIGHT: usize = 64;

/// Minimum time between two accepted moves of the same team.
pub const MOVE_COOLDOWN: Duration = Duration::from_millis(800);
/// Delay before a dead team gets a new king.
pub const RESPAWN_TIME: Duration = Duration::from_millis(5000);
pub const LEADERBOARD_INTERVAL: Duration = Duration::from_millis(1000);
/// Number of neutral pieces scattered over the board at startup.
pub const NEUTRAL_PIECE_COUNT: usize = 300;
/// Maximum number of squares a bishop, rook or queen may slide.
pub const MAX_SLIDE_RANGE: usize = 22;

/// Team id 0 marks unowned cells, so real teams are drawn from `1..=MAX_TEAM_ID`.
pub const NEUTRAL_TEAM: u16 = 0;
pub const MAX_TEAM_ID: u16 = 9999;
