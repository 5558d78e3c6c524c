// Binary entry point for the Outpost game server.

use std::thread;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing::{error, info};

use outpost_server::config::ServerConfig;
use outpost_server::server::start_server;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    /// 1:1 turn-based number guessing.
    Baseball,
    /// Real-time tile conquest, up to 8 players.
    Conquest,
}

#[derive(Parser)]
#[command(author, version, about = "Authoritative TCP server for the Outpost games", long_about = None)]
struct Args {
    /// Port to listen on (0 lets the OS pick one).
    #[arg(short, long, default_value_t = 7878)]
    port: u16,

    /// Which game to host.
    #[arg(short, long, value_enum, default_value_t = ModeArg::Baseball)]
    mode: ModeArg,

    /// Override the mode's default player capacity.
    #[arg(long)]
    max_players: Option<usize>,

    /// Dispatcher tick in milliseconds.
    #[arg(long, default_value_t = 1000)]
    tick_ms: u64,
}

fn main() {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let mut config = match args.mode {
        ModeArg::Baseball => ServerConfig::baseball(),
        ModeArg::Conquest => ServerConfig::conquest(),
    };
    config.port = args.port;
    if let Some(max_players) = args.max_players {
        config.max_players = max_players;
    }
    config.tick = Duration::from_millis(args.tick_ms);

    match start_server(config) {
        Ok((_handle, addr)) => {
            info!(%addr, "outpost server running, ctrl-c to stop");
            loop {
                thread::park();
            }
        }
        Err(e) => {
            error!("failed to start server: {e}");
            std::process::exit(1);
        }
    }
}
