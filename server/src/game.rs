//! Authoritative game coordinator.
//!
//! `GameState` owns the board and the team registry and is the only place
//! either is mutated. Every inbound frame, timer and connection event ends
//! up in one of its methods, which validate the request, apply it and queue
//! the resulting frames for the affected connections.

use crate::client_manager::{ClientManager, FrameSender};
use crate::config::ServerConfig;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::protocol::{is_verification, ClientFrame, ServerFrame};
use shared::{is_legal_move, Board, BoardError, CellUpdate, Piece, NEUTRAL_TEAM};
use std::time::{Duration, Instant};

/// Result of handling one inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Unknown sender, unverified sender, or a shape nobody handles.
    Ignored,
    Verified,
    /// The team reported its death; a king respawn should be scheduled.
    Died,
    Chat,
    Moved { captured: Piece },
    Rejected(MoveRejection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveRejection {
    Cooldown,
    OutOfBounds,
    Illegal,
    NotOwner,
}

pub struct GameState {
    pub board: Board,
    pub clients: ClientManager,
    move_cooldown: Duration,
    max_chat_units: usize,
    rng: StdRng,
}

impl GameState {
    pub fn new(config: &ServerConfig) -> Self {
        Self::with_board(Board::new(), config, StdRng::from_entropy())
    }

    pub fn with_board(board: Board, config: &ServerConfig, rng: StdRng) -> Self {
        Self {
            board,
            clients: ClientManager::new(config.max_clients),
            move_cooldown: config.move_cooldown(),
            max_chat_units: config.max_chat_units,
            rng,
        }
    }

    fn broadcast(&self, frame: ServerFrame) {
        self.clients.broadcast(&frame.encode());
    }

    fn broadcast_update(&self, update: CellUpdate) {
        self.broadcast(ServerFrame::from(update));
    }

    /// Drops `count` neutral pieces of random kinds on random empty squares.
    pub fn scatter_neutral_pieces(&mut self, count: usize) -> Result<(), BoardError> {
        for _ in 0..count {
            let (x, y) = self.board.find_random_empty_cell(&mut self.rng)?;
            let piece = Piece::ALL[self.rng.gen_range(0..Piece::ALL.len())];
            let update = self.board.set_cell(NEUTRAL_TEAM, piece, x, y);
            self.broadcast_update(update);
        }
        info!("Scattered {} neutral pieces", count);
        Ok(())
    }

    /// Registers a new connection, sends it the board and spawns its king.
    ///
    /// Returns `Ok(None)` when the server is full.
    pub fn connect(
        &mut self,
        sender: FrameSender,
        now: Instant,
    ) -> Result<Option<u16>, BoardError> {
        let Some(team) = self.clients.add_client(sender, &mut self.rng, now) else {
            return Ok(None);
        };

        let welcome = ServerFrame::welcome(team, &self.board.snapshot());
        self.clients.send_to(team, welcome.encode());

        if let Err(err) = self.spawn_king(team) {
            self.clients.remove_client(team);
            return Err(err);
        }
        Ok(Some(team))
    }

    /// Places a king for `team` on a random empty square.
    ///
    /// Does nothing if the team is gone or still has a king, so a stale
    /// respawn timer is harmless. Returns whether a king was placed.
    pub fn spawn_king(&mut self, team: u16) -> Result<bool, BoardError> {
        if !self.clients.contains(team) {
            debug!("Skipping king spawn for departed team {}", team);
            return Ok(false);
        }
        if self.has_king(team) {
            return Ok(false);
        }

        let (x, y) = self.board.find_random_empty_cell(&mut self.rng)?;
        let update = self.board.set_cell(team, Piece::King, x, y);
        self.broadcast_update(update);
        debug!("Spawned king of team {} at ({}, {})", team, x, y);
        Ok(true)
    }

    /// True if `team` owns at least one king on the board.
    pub fn has_king(&self, team: u16) -> bool {
        self.board
            .pieces_of(team)
            .iter()
            .any(|&(piece, _, _)| piece == Piece::King)
    }

    /// Releases every piece of `team`: kings are removed, everything else
    /// becomes neutral where it stands. Cells are not broadcast one by one;
    /// the departure notice tells clients to do the same locally.
    ///
    /// Returns the number of squares changed.
    pub fn neutralize(&mut self, team: u16) -> usize {
        let pieces = self.board.pieces_of(team);
        for &(piece, x, y) in &pieces {
            let piece = if piece == Piece::King { Piece::None } else { piece };
            self.board.set_cell(NEUTRAL_TEAM, piece, x, y);
        }

        self.broadcast(ServerFrame::Departure { team_id: team });
        pieces.len()
    }

    /// Tears down a team after its connection closed. Safe to call twice.
    pub fn disconnect(&mut self, team: u16) -> bool {
        if !self.clients.contains(team) {
            return false;
        }
        let released = self.neutralize(team);
        self.clients.remove_client(team);
        debug!("Team {} left, released {} pieces", team, released);
        true
    }

    /// Handles one raw frame from `team`.
    ///
    /// Until the team is verified only the verification text is accepted.
    /// Afterwards the frame's shape decides between death report, chat and
    /// move; anything else is ignored without closing the connection.
    pub fn handle_frame(&mut self, team: u16, data: &[u8], now: Instant) -> FrameOutcome {
        let Some(client) = self.clients.get_mut(team) else {
            return FrameOutcome::Ignored;
        };

        if !client.is_verified() {
            if is_verification(data) {
                client.verify();
                info!("Team {} verified", team);
                return FrameOutcome::Verified;
            }
            return FrameOutcome::Ignored;
        }

        match ClientFrame::decode(data) {
            ClientFrame::DisconnectIntent => {
                info!("Team {} died", team);
                self.neutralize(team);
                FrameOutcome::Died
            }
            ClientFrame::Chat(text) => {
                debug!("Team {} says {:?}", team, text);
                self.broadcast(ServerFrame::chat(team, &text, self.max_chat_units));
                FrameOutcome::Chat
            }
            ClientFrame::Move { sx, sy, nx, ny } => {
                let (from_x, from_y) = (sx as usize, sy as usize);
                match self.apply_move(team, from_x, from_y, nx as usize, ny as usize, now) {
                    Ok(captured) => FrameOutcome::Moved { captured },
                    Err(reason) => {
                        debug!(
                            "Rejected move of team {} ({}, {}) -> ({}, {}): {:?}",
                            team, sx, sy, nx, ny, reason
                        );
                        FrameOutcome::Rejected(reason)
                    }
                }
            }
            ClientFrame::Unknown => {
                debug!("Ignoring {}-byte frame from team {}", data.len(), team);
                FrameOutcome::Ignored
            }
        }
    }

    /// Validates and applies one move, returning the captured piece.
    ///
    /// The source square is only cleared when the destination was empty.
    /// Capturing anything but a king converts the captured piece: it is
    /// placed on the source square under the mover's team. Capturing a king
    /// scores a kill and leaves the source square as it was.
    pub fn apply_move(
        &mut self,
        team: u16,
        sx: usize,
        sy: usize,
        nx: usize,
        ny: usize,
        now: Instant,
    ) -> Result<Piece, MoveRejection> {
        let cooldown = self.move_cooldown;
        let client = self.clients.get_mut(team).ok_or(MoveRejection::NotOwner)?;
        if !client.try_start_move(now, cooldown) {
            return Err(MoveRejection::Cooldown);
        }

        if !self.board.in_bounds(sx, sy) || !self.board.in_bounds(nx, ny) {
            return Err(MoveRejection::OutOfBounds);
        }
        if !is_legal_move(sx, sy, nx, ny, &self.board.snapshot()) {
            return Err(MoveRejection::Illegal);
        }

        let start = self.board.get_cell(sx, sy);
        let end = self.board.get_cell(nx, ny);
        if start.team != team || end.team == team {
            return Err(MoveRejection::NotOwner);
        }

        if end.is_empty() {
            self.board.set_cell(NEUTRAL_TEAM, Piece::None, sx, sy);
        }
        self.board.set_cell(team, start.piece, nx, ny);
        self.broadcast(ServerFrame::Move {
            sx: sx as u16,
            sy: sy as u16,
            nx: nx as u16,
            ny: ny as u16,
        });

        match end.piece {
            Piece::None => {}
            Piece::King => {
                if let Some(client) = self.clients.get_mut(team) {
                    client.kills += 1;
                    info!("Team {} captured the king of team {}", team, end.team);
                }
            }
            captured => {
                let update = self.board.set_cell(team, captured, sx, sy);
                self.broadcast_update(update);
            }
        }

        Ok(end.piece)
    }

    /// Sends the current standings to every connection.
    pub fn broadcast_leaderboard(&self) {
        if self.clients.is_empty() {
            return;
        }
        self.broadcast(ServerFrame::Leaderboard(self.clients.leaderboard()));
    }
}
