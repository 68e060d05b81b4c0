use clap::Parser;
use std::path::PathBuf;

/// Runtime settings, read from flags or the environment (a `.env` file is honoured).
#[derive(Debug, Clone, Parser)]
#[command(name = "tic_tac_toe_server", version, about = "Two-player tic-tac-toe server")]
pub struct Config {
    #[arg(long, env = "BIND_ADDRESS", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// SQLite database holding the saved game.
    #[arg(long, env = "DATABASE_URL", default_value = "data.db")]
    pub database_url: String,

    /// Directory served for any path without a route, e.g. `tictactoe.html`.
    #[arg(long, env = "STATIC_DIR", default_value = "public")]
    pub static_dir: PathBuf,

    /// Board updates a viewer may fall behind by before it is disconnected.
    #[arg(long, env = "VIEWER_BUFFER", default_value_t = 32)]
    pub viewer_buffer: usize,
}
