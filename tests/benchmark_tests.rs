//! Performance benchmarks for critical game systems

use rand::rngs::StdRng;
use rand::SeedableRng;
use server::client_manager::ClientManager;
use server::config::ServerConfig;
use server::game::GameState;
use shared::protocol::ServerFrame;
use shared::{legal_moves, Board, Piece, BOARD_HEIGHT, BOARD_WIDTH};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

fn scattered_game(seed: u64) -> GameState {
    let mut game = GameState::with_board(
        Board::new(),
        &ServerConfig::default(),
        StdRng::seed_from_u64(seed),
    );
    game.scatter_neutral_pieces(300).unwrap();
    game
}

/// Benchmarks move generation for every square of a populated board
#[test]
fn benchmark_move_generation() {
    let mut game = scattered_game(1);
    game.board.set_cell(7, Piece::Queen, 32, 32);
    let snapshot = game.board.snapshot();

    let iterations = 100;
    let start = Instant::now();
    let mut total = 0;

    for _ in 0..iterations {
        for x in 0..BOARD_WIDTH {
            for y in 0..BOARD_HEIGHT {
                total += legal_moves(x, y, &snapshot).len();
            }
        }
    }

    let duration = start.elapsed();
    println!(
        "Move generation: {} boards ({} moves) in {:?} ({:.2} μs/board)",
        iterations,
        total,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(total > 0);
    // Should complete in under 5 seconds
    assert!(duration.as_millis() < 5000);
}

/// Benchmarks the snapshot and welcome encoding done on every connect
#[test]
fn benchmark_welcome_encoding() {
    let game = scattered_game(2);

    let iterations = 1_000;
    let start = Instant::now();
    let mut bytes = 0;

    for i in 0..iterations {
        let frame = ServerFrame::welcome(i as u16, &game.board.snapshot());
        bytes += frame.encode().len();
    }

    let duration = start.elapsed();
    println!(
        "Welcome encoding: {} frames ({} bytes) in {:?} ({:.2} μs/frame)",
        iterations,
        bytes,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert_eq!(bytes, iterations * 2 * (1 + 2 * BOARD_WIDTH * BOARD_HEIGHT));
    // Should complete in under 5 seconds
    assert!(duration.as_millis() < 5000);
}

/// Stress tests broadcasting to a full house of teams
#[test]
fn stress_test_broadcast() {
    let mut clients = ClientManager::new(256);
    let mut rng = StdRng::seed_from_u64(3);
    let now = Instant::now();
    let mut receivers = Vec::new();

    for _ in 0..256 {
        let (tx, rx) = mpsc::channel(1024);
        assert!(clients.add_client(tx, &mut rng, now).is_some());
        receivers.push(rx);
    }

    let frame = ServerFrame::Move {
        sx: 1,
        sy: 2,
        nx: 3,
        ny: 4,
    }
    .encode();

    let iterations = 1_000;
    let start = Instant::now();
    let mut delivered = 0;

    for _ in 0..iterations {
        delivered += clients.broadcast(&frame);
    }

    let duration = start.elapsed();
    println!(
        "Broadcast: {} frames to {} teams in {:?}",
        iterations,
        clients.len(),
        duration
    );

    // Queues hold 1024 frames, so every broadcast lands
    assert_eq!(delivered, iterations * 256);
    // Should complete in under 5 seconds
    assert!(duration.as_millis() < 5000);
}

/// Benchmarks a long stream of king moves through the coordinator
#[test]
fn benchmark_move_processing() {
    let mut game = scattered_game(4);
    let (tx, _rx) = mpsc::channel(16);
    let start_time = Instant::now();
    let team = game.connect(tx, start_time).unwrap().unwrap();
    game.handle_frame(team, b"0.1", start_time);

    let iterations = 2_000;
    let start = Instant::now();
    let mut at = start_time;
    let mut applied = 0;

    for _ in 0..iterations {
        at += Duration::from_millis(800);
        let Some((_, kx, ky)) = game
            .board
            .pieces_of(team)
            .into_iter()
            .find(|&(piece, _, _)| piece == Piece::King)
        else {
            break;
        };
        let snapshot = game.board.snapshot();
        let Some(&(nx, ny)) = legal_moves(kx, ky, &snapshot).first() else {
            break;
        };
        if game.apply_move(team, kx, ky, nx, ny, at).is_ok() {
            applied += 1;
        }
    }

    let duration = start.elapsed();
    println!(
        "Move processing: {} moves applied in {:?} ({:.2} μs/move)",
        applied,
        duration,
        duration.as_micros() as f64 / applied.max(1) as f64
    );

    assert!(applied > 0);
    // Should complete in under 10 seconds
    assert!(duration.as_millis() < 10_000);
}
