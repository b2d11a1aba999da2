//! Server network layer handling WebSocket connections and the game loop

use crate::client_manager::FrameSender;
use crate::config::ServerConfig;
use crate::game::{FrameOutcome, GameState};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Capacity of the channel feeding the game loop.
const COMMAND_QUEUE: usize = 4096;

/// Messages sent from connection tasks and timers to the game loop
#[derive(Debug)]
pub enum ServerMessage {
    Connected {
        sender: FrameSender,
        reply: oneshot::Sender<Option<u16>>,
    },
    FrameReceived {
        team_id: u16,
        data: Vec<u8>,
    },
    Disconnected {
        team_id: u16,
    },
    RespawnKing {
        team_id: u16,
    },
    Shutdown,
}

/// Main server coordinating connections, timers and the game state
pub struct Server {
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    game_state: GameState,
    config: ServerConfig,
    respawns: HashMap<u16, JoinHandle<()>>,

    server_tx: mpsc::Sender<ServerMessage>,
    server_rx: mpsc::Receiver<ServerMessage>,
}

impl Server {
    /// Binds the listener and prepares the board, scattering the neutral
    /// pieces before anyone can connect.
    pub async fn new(config: ServerConfig) -> Result<Self, BoxError> {
        config.validate()?;

        let listener = TcpListener::bind(config.address()).await?;
        let local_addr = listener.local_addr()?;
        info!("Server listening on {}", local_addr);

        let mut game_state = GameState::new(&config);
        game_state.scatter_neutral_pieces(config.neutral_pieces)?;

        let (server_tx, server_rx) = mpsc::channel(COMMAND_QUEUE);

        Ok(Server {
            listener: Some(listener),
            local_addr,
            game_state,
            config,
            respawns: HashMap::new(),
            server_tx,
            server_rx,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn game_state(&self) -> &GameState {
        &self.game_state
    }

    /// Handle for posting messages into the game loop, e.g. `Shutdown`.
    pub fn sender(&self) -> mpsc::Sender<ServerMessage> {
        self.server_tx.clone()
    }

    /// Spawns task that accepts connections and starts a task per client
    fn spawn_acceptor(
        listener: TcpListener,
        server_tx: mpsc::Sender<ServerMessage>,
        outbound_queue: usize,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        let server_tx = server_tx.clone();
                        tokio::spawn(async move {
                            if let Err(e) =
                                handle_connection(stream, addr, server_tx, outbound_queue).await
                            {
                                debug!("Connection from {} ended with error: {}", addr, e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        })
    }

    /// Starts a timer that posts a respawn request for `team_id`,
    /// replacing any pending one.
    fn schedule_respawn(&mut self, team_id: u16) {
        self.cancel_respawn(team_id);

        let delay = self.config.respawn_delay();
        let server_tx = self.server_tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = server_tx.send(ServerMessage::RespawnKing { team_id }).await;
        });
        self.respawns.insert(team_id, handle);
    }

    fn cancel_respawn(&mut self, team_id: u16) {
        if let Some(handle) = self.respawns.remove(&team_id) {
            handle.abort();
        }
    }

    /// Applies one message to the game state. Returns false on shutdown.
    fn handle_message(&mut self, message: ServerMessage) -> bool {
        match message {
            ServerMessage::Connected { sender, reply } => {
                let team_id = match self.game_state.connect(sender, Instant::now()) {
                    Ok(Some(team_id)) => Some(team_id),
                    Ok(None) => {
                        warn!("Server full, rejecting connection");
                        None
                    }
                    Err(e) => {
                        error!("Failed to place new team: {}", e);
                        None
                    }
                };
                let _ = reply.send(team_id);
            }

            ServerMessage::FrameReceived { team_id, data } => {
                let outcome = self.game_state.handle_frame(team_id, &data, Instant::now());
                if outcome == FrameOutcome::Died {
                    self.schedule_respawn(team_id);
                }
            }

            ServerMessage::Disconnected { team_id } => {
                self.cancel_respawn(team_id);
                self.game_state.disconnect(team_id);
            }

            ServerMessage::RespawnKing { team_id } => {
                self.respawns.remove(&team_id);
                if let Err(e) = self.game_state.spawn_king(team_id) {
                    error!("Failed to respawn king of team {}: {}", team_id, e);
                }
            }

            ServerMessage::Shutdown => {
                info!("Server shutting down");
                return false;
            }
        }
        true
    }

    /// Main server loop: accepts connections, applies their frames in
    /// arrival order and broadcasts the leaderboard on a fixed interval.
    pub async fn run(mut self) -> Result<(), BoxError> {
        let listener = self.listener.take().ok_or("server is already running")?;
        let acceptor =
            Self::spawn_acceptor(listener, self.server_tx.clone(), self.config.outbound_queue);

        let mut leaderboard_interval = interval(self.config.leaderboard_interval());
        leaderboard_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(message) => {
                            if !self.handle_message(message) {
                                break;
                            }
                        }
                        None => break,
                    }
                },

                _ = leaderboard_interval.tick() => {
                    self.game_state.broadcast_leaderboard();
                },
            }
        }

        acceptor.abort();
        for (_, handle) in self.respawns.drain() {
            handle.abort();
        }
        Ok(())
    }
}

/// Runs one client connection: registers it with the game loop, then pumps
/// inbound messages into the loop and queued frames out to the socket.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    server_tx: mpsc::Sender<ServerMessage>,
    outbound_queue: usize,
) -> Result<(), BoxError> {
    let ws = accept_async(stream).await?;
    let (mut sink, mut source) = ws.split();

    let (frame_tx, mut frame_rx) = mpsc::channel::<Vec<u8>>(outbound_queue);
    let (reply_tx, reply_rx) = oneshot::channel();
    server_tx
        .send(ServerMessage::Connected {
            sender: frame_tx,
            reply: reply_tx,
        })
        .await
        .map_err(|_| "game loop closed")?;

    let Some(team_id) = reply_rx.await? else {
        sink.close().await?;
        return Ok(());
    };
    info!("Team {} joined from {}", team_id, addr);

    // Ends when the team is removed from the registry and its sender dropped.
    let writer = tokio::spawn(async move {
        while let Some(frame) = frame_rx.recv().await {
            if sink.send(Message::Binary(frame)).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(message) = source.next().await {
        let data = match message {
            Ok(Message::Binary(data)) => data,
            Ok(Message::Text(text)) => text.into_bytes(),
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!("Read error from team {}: {}", team_id, e);
                break;
            }
        };

        if server_tx
            .send(ServerMessage::FrameReceived { team_id, data })
            .await
            .is_err()
        {
            break;
        }
    }

    let _ = server_tx.send(ServerMessage::Disconnected { team_id }).await;
    writer.abort();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::protocol::{ClientFrame, ServerFrame};
    use shared::{Piece, BOARD_HEIGHT, BOARD_WIDTH};

    fn test_config() -> ServerConfig {
        ServerConfig {
            port: 0,
            respawn_time_ms: 200,
            ..ServerConfig::default()
        }
    }

    async fn connect(server: &mut Server) -> (u16, mpsc::Receiver<Vec<u8>>) {
        let (tx, rx) = mpsc::channel(4096);
        let (reply_tx, reply_rx) = oneshot::channel();
        assert!(server.handle_message(ServerMessage::Connected {
            sender: tx,
            reply: reply_tx,
        }));
        (reply_rx.await.unwrap().unwrap(), rx)
    }

    #[tokio::test]
    async fn test_new_server_scatters_pieces() {
        let server = tokio_test::assert_ok!(Server::new(test_config()).await);
        assert_eq!(server.game_state().board.occupied_count(), 300);
        assert!(server.local_addr().port() > 0);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let config = ServerConfig {
            outbound_queue: 0,
            ..test_config()
        };
        assert!(Server::new(config).await.is_err());
    }

    #[tokio::test]
    async fn test_connect_message_replies_with_team() {
        let mut server = Server::new(test_config()).await.unwrap();
        let (team_id, mut rx) = connect(&mut server).await;

        let welcome = rx.try_recv().unwrap();
        match ServerFrame::decode(&welcome, BOARD_WIDTH * BOARD_HEIGHT) {
            Some(ServerFrame::Welcome { team_id: id, .. }) => assert_eq!(id, team_id),
            other => panic!("Unexpected frame: {:?}", other),
        }
        assert!(server.game_state().has_king(team_id));
    }

    #[tokio::test]
    async fn test_death_schedules_and_disconnect_cancels_respawn() {
        let mut server = Server::new(test_config()).await.unwrap();
        let (team_id, _rx) = connect(&mut server).await;

        server.handle_message(ServerMessage::FrameReceived {
            team_id,
            data: b"0.1".to_vec(),
        });
        server.handle_message(ServerMessage::FrameReceived {
            team_id,
            data: ClientFrame::DisconnectIntent.encode(),
        });
        assert!(!server.game_state().has_king(team_id));
        assert!(server.respawns.contains_key(&team_id));

        server.handle_message(ServerMessage::Disconnected { team_id });
        assert!(server.respawns.is_empty());
        assert!(!server.game_state().clients.contains(team_id));
    }

    #[tokio::test]
    async fn test_respawn_timer_fires() {
        let mut server = Server::new(test_config()).await.unwrap();
        let (team_id, _rx) = connect(&mut server).await;

        server.handle_message(ServerMessage::FrameReceived {
            team_id,
            data: b"0.1".to_vec(),
        });
        server.handle_message(ServerMessage::FrameReceived {
            team_id,
            data: Vec::new(),
        });

        let message = tokio::time::timeout(Duration::from_secs(2), server.server_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(message, ServerMessage::RespawnKing { team_id: id } if id == team_id));
        server.handle_message(message);

        assert!(server.game_state().has_king(team_id));
        let kings = server
            .game_state()
            .board
            .pieces_of(team_id)
            .into_iter()
            .filter(|&(piece, _, _)| piece == Piece::King)
            .count();
        assert_eq!(kings, 1);
    }

    #[tokio::test]
    async fn test_stale_respawn_is_noop() {
        let mut server = Server::new(test_config()).await.unwrap();
        assert!(server.handle_message(ServerMessage::RespawnKing { team_id: 4242 }));
        assert!(server.game_state().board.pieces_of(4242).is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_message() {
        let mut server = Server::new(test_config()).await.unwrap();
        assert!(!server.handle_message(ServerMessage::Shutdown));
    }
}
