use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "community-translator",
    about = "Bidirectional Discord channel translator with webhook mirroring",
    version
)]
pub struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, env = "TRANSLATOR_CONFIG", default_value = "config.yaml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the mirror engine (the default when no subcommand is given).
    Run,
    /// Print chat-log entries and exit.
    Logs {
        /// Only entries authored by this Discord user id.
        #[arg(long)]
        user: Option<String>,
        /// Maximum number of entries to print, newest first.
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}
