use clap::Parser;
use log::{error, info};
use server::config::ServerConfig;
use server::network::{BoxError, Server, ServerMessage};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON file with server settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server IP address to bind to
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// Server port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Maximum number of connected teams
    #[arg(short, long)]
    max_clients: Option<usize>,

    /// Minimum milliseconds between two moves of a team
    #[arg(long)]
    move_cooldown_ms: Option<u64>,

    /// Number of neutral pieces scattered at startup
    #[arg(long)]
    neutral_pieces: Option<usize>,

    /// Print the effective settings as JSON and exit
    #[arg(long)]
    print_config: bool,

    /// Print the board after the neutral pieces are scattered
    #[arg(long)]
    dump_board: bool,
}

impl Args {
    fn into_config(self) -> Result<ServerConfig, BoxError> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_file(path)?,
            None => ServerConfig::default(),
        };

        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(max_clients) = self.max_clients {
            config.max_clients = max_clients;
        }
        if let Some(cooldown) = self.move_cooldown_ms {
            config.move_cooldown_ms = cooldown;
        }
        if let Some(count) = self.neutral_pieces {
            config.neutral_pieces = count;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let print_config = args.print_config;
    let dump_board = args.dump_board;
    let config = args.into_config()?;

    if print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let server = Server::new(config).await?;
    if dump_board {
        print!("{}", server.game_state().board.render());
    }

    let shutdown = server.sender();
    let server_handle = tokio::spawn(server.run());

    tokio::select! {
        result = server_handle => {
            match result {
                Ok(Err(e)) => error!("Server stopped with error: {}", e),
                Err(e) => error!("Server task panicked: {}", e),
                Ok(Ok(())) => {}
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
            let _ = shutdown.send(ServerMessage::Shutdown).await;
        }
    }

    Ok(())
}
