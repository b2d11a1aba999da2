//! Per-piece movement rules.
//!
//! All rules work on a [`BoardSnapshot`] and treat the team owning the source
//! square as "self": a destination is never a square owned by that team.
//! Pieces move independently of any turn order and there is no check or
//! checkmate, so only geometry and occupancy matter.

use crate::board::BoardSnapshot;
use crate::piece::Piece;
use crate::MAX_SLIDE_RANGE;

const ORTHOGONAL: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const DIAGONAL: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
const KNIGHT_JUMPS: [(i32, i32); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

/// Lists every square the piece at `(x, y)` may move to.
///
/// An empty source square yields no moves. Out-of-range sources are a caller
/// bug and panic.
pub fn legal_moves(x: usize, y: usize, board: &BoardSnapshot) -> Vec<(usize, usize)> {
    let origin = Origin {
        x: x as i32,
        y: y as i32,
        team: board.team(x, y),
    };
    let mut moves = Vec::new();

    match board.piece(x, y) {
        Piece::None => {}
        Piece::Pawn => {
            steps(&mut moves, &origin, &ORTHOGONAL, board, false);
            steps(&mut moves, &origin, &DIAGONAL, board, true);
        }
        Piece::Knight => steps(&mut moves, &origin, &KNIGHT_JUMPS, board, false),
        Piece::Bishop => {
            for dir in DIAGONAL {
                slide(&mut moves, &origin, dir, board, MAX_SLIDE_RANGE);
            }
        }
        Piece::Rook => {
            for dir in ORTHOGONAL {
                slide(&mut moves, &origin, dir, board, MAX_SLIDE_RANGE);
            }
        }
        Piece::Queen => {
            for dir in DIAGONAL.into_iter().chain(ORTHOGONAL) {
                slide(&mut moves, &origin, dir, board, MAX_SLIDE_RANGE);
            }
        }
        Piece::King => {
            steps(&mut moves, &origin, &ORTHOGONAL, board, false);
            steps(&mut moves, &origin, &DIAGONAL, board, false);
        }
    }

    moves
}

/// True if `(nx, ny)` is among the legal destinations of the piece at
/// `(sx, sy)`. Coordinates outside the board are never legal.
pub fn is_legal_move(sx: usize, sy: usize, nx: usize, ny: usize, board: &BoardSnapshot) -> bool {
    if sx >= board.width() || sy >= board.height() {
        return false;
    }
    legal_moves(sx, sy, board).contains(&(nx, ny))
}

struct Origin {
    x: i32,
    y: i32,
    team: u16,
}

/// Single-square offsets. With `capture_only` the target must hold a piece.
fn steps(
    moves: &mut Vec<(usize, usize)>,
    origin: &Origin,
    offsets: &[(i32, i32)],
    board: &BoardSnapshot,
    capture_only: bool,
) {
    for &(dx, dy) in offsets {
        let (tx, ty) = (origin.x + dx, origin.y + dy);
        if !board.in_bounds(tx, ty) {
            continue;
        }
        let (tx, ty) = (tx as usize, ty as usize);
        if board.team(tx, ty) == origin.team {
            continue;
        }
        if capture_only && board.piece(tx, ty).is_none() {
            continue;
        }
        moves.push((tx, ty));
    }
}

/// Walks a ray until it leaves the board, meets a friendly piece, captures
/// or runs out of range.
fn slide(
    moves: &mut Vec<(usize, usize)>,
    origin: &Origin,
    (dx, dy): (i32, i32),
    board: &BoardSnapshot,
    max_range: usize,
) {
    let (mut cx, mut cy) = (origin.x + dx, origin.y + dy);

    for _ in 0..max_range {
        if !board.in_bounds(cx, cy) {
            break;
        }
        let (tx, ty) = (cx as usize, cy as usize);
        if board.team(tx, ty) == origin.team {
            break;
        }

        moves.push((tx, ty));

        if !board.piece(tx, ty).is_none() {
            break;
        }

        cx += dx;
        cy += dy;
    }
}
