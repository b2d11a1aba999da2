use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use shared::protocol::{ClientFrame, ServerFrame};
use shared::{legal_moves, Board, Piece, BOARD_HEIGHT, BOARD_WIDTH, MOVE_COOLDOWN};
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

#[derive(Parser, Debug)]
#[command(author, version, about = "Connects to an arena server, verifies and walks the king")]
struct Args {
    /// WebSocket URL of the server
    #[arg(short, long, default_value = "ws://127.0.0.1:2388")]
    server: String,

    /// Number of king moves to attempt before leaving
    #[arg(short, long, default_value = "5")]
    moves: usize,
}

/// Local mirror of the board, kept up to date from server frames.
struct Mirror {
    team_id: Option<u16>,
    board: Board,
}

impl Mirror {
    fn apply(&mut self, frame: &ServerFrame) {
        match frame {
            ServerFrame::Welcome {
                team_id,
                pieces,
                teams,
            } => {
                self.team_id = Some(*team_id);
                for x in 0..BOARD_WIDTH {
                    for y in 0..BOARD_HEIGHT {
                        let i = x * BOARD_HEIGHT + y;
                        self.board.set_cell(teams[i], Piece::from_u16(pieces[i]), x, y);
                    }
                }
            }
            ServerFrame::CellUpdate { x, y, piece, team } => {
                self.board
                    .set_cell(*team, Piece::from_u16(*piece), *x as usize, *y as usize);
            }
            ServerFrame::Move { sx, sy, nx, ny } => {
                let (sx, sy, nx, ny) = (*sx as usize, *sy as usize, *nx as usize, *ny as usize);
                let moved = self.board.get_cell(sx, sy);
                // A capture keeps the source square; a cell update follows
                // when a converted piece lands there.
                if self.board.get_cell(nx, ny).is_empty() {
                    self.board.set_cell(0, Piece::None, sx, sy);
                }
                self.board.set_cell(moved.team, moved.piece, nx, ny);
            }
            ServerFrame::Departure { team_id } => {
                for (piece, x, y) in self.board.pieces_of(*team_id) {
                    let piece = if piece == Piece::King { Piece::None } else { piece };
                    self.board.set_cell(0, piece, x, y);
                }
            }
            ServerFrame::Chat { .. } | ServerFrame::Leaderboard(_) => {}
        }
    }

    fn king(&self) -> Option<(usize, usize)> {
        let team_id = self.team_id?;
        self.board
            .pieces_of(team_id)
            .into_iter()
            .find(|&(piece, _, _)| piece == Piece::King)
            .map(|(_, x, y)| (x, y))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    println!("Connecting to {}", args.server);
    let (ws, _) = connect_async(args.server.as_str()).await?;
    let (mut sink, mut source) = ws.split();

    sink.send(Message::Text("0.5".to_string())).await?;
    println!("Sent verification");

    let mut mirror = Mirror {
        team_id: None,
        board: Board::new(),
    };
    let mut moves_left = args.moves;

    while moves_left > 0 {
        let deadline = sleep(MOVE_COOLDOWN + Duration::from_millis(50));
        tokio::pin!(deadline);

        // Drain frames until the cooldown has passed
        loop {
            tokio::select! {
                message = source.next() => {
                    let Some(message) = message else {
                        println!("Server closed the connection");
                        return Ok(());
                    };
                    if let Message::Binary(data) = message? {
                        match ServerFrame::decode(&data, BOARD_WIDTH * BOARD_HEIGHT) {
                            Some(frame) => {
                                if let ServerFrame::Welcome { team_id, .. } = &frame {
                                    println!("Welcome, team {}", team_id);
                                } else {
                                    println!("Received {:?}", frame);
                                }
                                mirror.apply(&frame);
                            }
                            None => println!("Undecodable {}-byte frame", data.len()),
                        }
                    }
                }
                _ = &mut deadline => break,
            }
        }

        moves_left -= 1;
        let Some((kx, ky)) = mirror.king() else {
            println!("No king on the board yet");
            continue;
        };
        let snapshot = mirror.board.snapshot();
        let Some(&(nx, ny)) = legal_moves(kx, ky, &snapshot).first() else {
            println!("King at ({}, {}) is boxed in", kx, ky);
            continue;
        };

        let frame = ClientFrame::Move {
            sx: kx as u16,
            sy: ky as u16,
            nx: nx as u16,
            ny: ny as u16,
        };
        println!("Moving king ({}, {}) -> ({}, {})", kx, ky, nx, ny);
        sink.send(Message::Binary(frame.encode())).await?;
    }

    let chat = ClientFrame::Chat("gg".to_string()).encode();
    sink.send(Message::Binary(chat)).await?;

    // Give the server a moment to echo the chat before closing
    let _ = timeout(Duration::from_millis(500), source.next()).await;
    sink.close().await?;
    println!("Done");
    Ok(())
}
