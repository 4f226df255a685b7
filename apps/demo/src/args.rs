//! Command-line arguments of the demo.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "bindery-demo")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Binds a sample server configuration and edits it through typed accessors")]
pub struct Cli {
    /// Settings file layered under `BINDERY__*` environment variables
    #[arg(long, short)]
    pub settings: Option<PathBuf>,

    /// Overrides the configuration directory from the settings
    #[arg(long, short)]
    pub directory: Option<PathBuf>,

    /// Log filter directives (falls back to `RUST_LOG`, then `info`)
    #[arg(long)]
    pub log: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print every field of the server configuration (default)
    Show,
    /// Change the listen port
    SetPort { port: u16 },
    /// Change the game mode
    SetMode { mode: String },
    /// Claim ownership with a fresh id, or clear it
    Claim {
        #[arg(long)]
        clear: bool,
    },
    /// Re-read the file from disk and validate it again
    Reload,
}
