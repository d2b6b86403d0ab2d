//! Command-line interface for pairmatch.

use clap::{Parser, Subcommand};

/// Pairmatch - memory-matching card game
#[derive(Parser, Debug)]
#[command(name = "pairmatch")]
#[command(about = "Memory-matching card game with a remote match authority", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: CliCommand,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Run the local match authority (HTTP)
    Serve {
        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Play in the terminal against a match authority
    Play {
        /// Match authority base URL
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        server_url: String,

        /// Card environment (fruits, birds, cars, clothes, electronics,
        /// animals, nature)
        #[arg(long, default_value = "fruits")]
        environment: String,
    },
}
