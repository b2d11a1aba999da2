//! # Arena Server Library
//!
//! This library provides the authoritative server for the shared-board chess
//! arena. Every connected client controls one team of pieces on a single
//! grid; the server alone decides which moves are legal, applies them and
//! broadcasts the resulting changes to everyone.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative State
//! The board and the team registry live only here. Clients send intents
//! (moves, chat, death reports) and render whatever the server broadcasts.
//!
//! ### Team Management
//! Handles the lifecycle of every team:
//! - Random team ids and capacity limits
//! - The verification handshake gating all other input
//! - Move cooldowns and kill counts
//! - Releasing a team's pieces when it dies or leaves
//!
//! ### Broadcasting
//! Every accepted change is encoded once and queued to each connection's
//! bounded outbound queue. A slow client only loses its own frames.
//!
//! ## Architecture Design
//!
//! ### Single Game Loop
//! All board and registry mutation happens on one task that consumes a
//! command channel. Connection tasks only decode socket messages into
//! commands and write already-encoded frames, so no locks guard the game
//! state.
//!
//! ### Game Variant Rules
//! Pieces move like their chess counterparts with a few twists: there are no
//! turns, only a per-team cooldown; pawns step orthogonally in any direction
//! and capture diagonally; sliding pieces reach at most 22 squares. A
//! captured piece that is not a king switches sides and lands on the square
//! the capturer left. Capturing a king scores a kill.
//!
//! ## Module Organization
//!
//! ### Client Manager Module (`client_manager`)
//! Team sessions, outbound queues and the leaderboard listing.
//!
//! ### Config Module (`config`)
//! Server settings with defaults, JSON loading and validation.
//!
//! ### Game Module (`game`)
//! The coordinator: frame dispatch, move validation and application,
//! spawning, neutralization.
//!
//! ### Network Module (`network`)
//! WebSocket accept loop, per-connection tasks, respawn timers and the
//! leaderboard tick.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), server::network::BoxError> {
//!     let server = Server::new(ServerConfig::default()).await?;
//!     server.run().await
//! }
//! ```

pub mod client_manager;
pub mod config;
pub mod game;
pub mod network;
