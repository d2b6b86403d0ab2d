//! Pairmatch binary: local match authority or terminal client.

use anyhow::Result;
use clap::Parser;
use pairmatch::cli::{Cli, CliCommand};
use pairmatch::server::Authority;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        CliCommand::Serve { port, host } => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| EnvFilter::new("info")),
                )
                .init();

            let app = Authority::new().router();
            let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
            info!(host = %host, port, "match authority listening");
            axum::serve(listener, app).await?;
        }
        CliCommand::Play {
            server_url,
            environment,
        } => {
            // The TUI sets up its own file-backed tracing
            pairmatch::tui::run_tui(server_url, environment).await?;
        }
    }

    Ok(())
}
