//! Team sessions of the arena server
//!
//! This module owns everything the server knows about connected teams:
//! - Team id assignment and capacity limits
//! - Verification stage, kill count and move cooldown per team
//! - The outbound frame queue of each connection
//! - Leaderboard listing
//!
//! It never touches the board. The game coordinator combines the two.

use log::{info, warn};
use rand::Rng;
use shared::protocol::LeaderboardEntry;
use shared::MAX_TEAM_ID;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Encoded frames waiting to be written to one connection.
pub type FrameSender = mpsc::Sender<Vec<u8>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Unverified,
    Verified,
}

/// One connected team
#[derive(Debug)]
pub struct Client {
    /// Team id, also the owner id of the team's board pieces
    pub id: u16,
    pub verification: Verification,
    /// Enemy kings captured by this team
    pub kills: u32,
    /// Last time a move passed the cooldown gate
    pub last_move: Instant,
    sender: FrameSender,
}

impl Client {
    /// Creates an unverified team. The cooldown clock starts at `now`, so a
    /// move right after connecting is rejected too.
    pub fn new(id: u16, sender: FrameSender, now: Instant) -> Self {
        Self {
            id,
            verification: Verification::Unverified,
            kills: 0,
            last_move: now,
            sender,
        }
    }

    pub fn is_verified(&self) -> bool {
        self.verification == Verification::Verified
    }

    pub fn verify(&mut self) {
        self.verification = Verification::Verified;
    }

    /// Passes the move cooldown gate, stamping `now` on success.
    ///
    /// The stamp happens before the move itself is validated, so an illegal
    /// move still starts a new cooldown.
    pub fn try_start_move(&mut self, now: Instant, cooldown: Duration) -> bool {
        if now.saturating_duration_since(self.last_move) < cooldown {
            return false;
        }
        self.last_move = now;
        true
    }

    /// Queues a frame without waiting. Returns false if it was dropped.
    pub fn send(&self, frame: Vec<u8>) -> bool {
        match self.sender.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Outbound queue of team {} is full, dropping frame", self.id);
                false
            }
            // The connection task is gone; its disconnect is already on the way.
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

/// Registry of connected teams, ordered by team id
pub struct ClientManager {
    clients: BTreeMap<u16, Client>,
    max_clients: usize,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: BTreeMap::new(),
            max_clients: max_clients.min(MAX_TEAM_ID as usize - 1),
        }
    }

    /// Registers a new team under a random id.
    ///
    /// Ids are drawn from `1..=MAX_TEAM_ID` so they fit the 16-bit wire field
    /// and never collide with the neutral team 0. A draw that hits a live team
    /// is retried. Returns `None` when the server is full.
    pub fn add_client<R: Rng + ?Sized>(
        &mut self,
        sender: FrameSender,
        rng: &mut R,
        now: Instant,
    ) -> Option<u16> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let id = loop {
            let candidate = rng.gen_range(1..=MAX_TEAM_ID);
            if !self.clients.contains_key(&candidate) {
                break candidate;
            }
        };

        info!("Team {} connected", id);
        self.clients.insert(id, Client::new(id, sender, now));
        Some(id)
    }

    pub fn remove_client(&mut self, id: u16) -> Option<Client> {
        let client = self.clients.remove(&id);
        if client.is_some() {
            info!("Team {} disconnected", id);
        }
        client
    }

    pub fn get(&self, id: u16) -> Option<&Client> {
        self.clients.get(&id)
    }

    pub fn get_mut(&mut self, id: u16) -> Option<&mut Client> {
        self.clients.get_mut(&id)
    }

    pub fn contains(&self, id: u16) -> bool {
        self.clients.contains_key(&id)
    }

    #[cfg(test)]
    pub fn ids(&self) -> Vec<u16> {
        self.clients.keys().copied().collect()
    }

    /// Standings in ascending team id order. Labels are the decimal id until
    /// teams get real names.
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        self.clients
            .values()
            .map(|client| LeaderboardEntry {
                team_id: client.id,
                kills: client.kills,
                label: client.id.to_string(),
            })
            .collect()
    }

    /// Queues a frame for a single team.
    pub fn send_to(&self, id: u16, frame: Vec<u8>) -> bool {
        self.clients.get(&id).is_some_and(|client| client.send(frame))
    }

    /// Queues a frame for every team, verified or not. Returns how many
    /// queues accepted it.
    pub fn broadcast(&self, frame: &[u8]) -> usize {
        self.clients
            .values()
            .filter(|client| client.send(frame.to_vec()))
            .count()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
