//! Server command implementations.

pub mod config;
pub mod serve;

use clap::{Args, Subcommand};

/// Arguments for the serve command.
#[derive(Args)]
pub struct ServeArgs {
    /// Bind address (overrides server.host).
    #[arg(long)]
    pub host: Option<String>,

    /// Bind port (overrides server.port).
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Use the process-local store instead of Redis.
    #[arg(long)]
    pub memory: bool,

    /// Seconds between sweeps of expired entries in the memory store.
    #[arg(long, default_value = "60")]
    pub purge_interval: u64,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration.
    Show,
    /// Write a default config file.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,

        /// Where to write the file (default: ./lease.toml).
        #[arg(long)]
        path: Option<String>,
    },
    /// Validate the effective configuration.
    Validate,
}
