//! Command-line surface for `estuaryd`, in the same shape as
//! `turbomcp-proxy::cli`'s `Cli`/global-flags/subcommand split, scaled down
//! to what a background daemon needs: start it, print the operator-facing
//! pairing code, and scaffold a config file.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(
    name = "estuaryd",
    version,
    about = "Unified MCP context daemon: aggregates MCP servers behind one endpoint",
    author
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Config directory override; defaults to the OS-appropriate location.
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    /// Enable verbose logging (-v, -vv, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    pub fn init_tracing(&self) {
        let level = if self.quiet {
            Level::ERROR
        } else {
            match self.verbose {
                0 => Level::WARN,
                1 => Level::INFO,
                2 => Level::DEBUG,
                _ => Level::TRACE,
            }
        };
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .init();
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the daemon: loads config, binds the control surface, and (if
    /// configured) the slave listener or outbound slave connection.
    Run,

    /// Write a starter config file if one doesn't already exist.
    InitConfig,

    /// Print the current 6-digit client pairing code (spec 4.4.1).
    PairingCode,
}
