//! Relay server daemon.
//!
//! Reads its configuration from `COIL_*` environment variables, logs
//! through `RUST_LOG` (default `info`), and runs until terminated.

use coil_server::{CoilServer, ServerConfig, ServerError};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = ServerConfig::from_env();
    tracing::info!(
        bind = %config.bind_addr,
        max_players = config.room.max_players,
        "starting coil relay"
    );

    let server = CoilServer::builder().config(config).build().await?;
    server.run().await
}
