//! Command-line interface for board_master.

use board_master::DuplicatePolicy;
use clap::{Parser, Subcommand};

/// Board Master - coordination server for turn-based board games
#[derive(Parser, Debug)]
#[command(name = "board_master")]
#[command(about = "Master server arbitrating moves from slave boards", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP master server
    Serve {
        /// Path to a TOML configuration file
        #[arg(short, long)]
        config: Option<std::path::PathBuf>,

        /// Port to bind to (falls back to $PORT, then the config file)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Base URL of the score collector (falls back to $COLLECTOR_URL)
        #[arg(long)]
        collector_url: Option<String>,

        /// Network prefix the advertised address must match (e.g. 192.168.201)
        #[arg(long)]
        network_prefix: Option<String>,

        /// What to do when a board registers twice
        #[arg(long)]
        duplicate_policy: Option<DuplicatePolicy>,
    },
}
