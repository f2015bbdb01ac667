//! `CoilServer` builder and accept loop.
//!
//! This is the entry point for running a relay server. It binds the
//! WebSocket transport, wires the health probe to the room gauge, spawns
//! the idle-room janitor, and hands every accepted connection to its own
//! session task.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use coil_protocol::JsonCodec;
use coil_room::RoomRegistry;
use coil_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::session::handle_connection;
use crate::{ServerConfig, ServerError, health};

/// Shared server state passed to each session task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks.
pub(crate) struct ServerState {
    /// All live rooms. Locked for lobby operations and the janitor sweep;
    /// per-frame gameplay goes through cached room handles instead.
    pub(crate) rooms: Mutex<RoomRegistry>,
    pub(crate) codec: JsonCodec,
}

/// Builder for configuring and starting a coil server.
///
/// # Example
///
/// ```rust,no_run
/// # async fn run() -> Result<(), coil_server::ServerError> {
/// use coil_server::{CoilServer, ServerConfig};
///
/// let server = CoilServer::builder()
///     .config(ServerConfig::from_env())
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct CoilServerBuilder {
    config: ServerConfig,
}

impl CoilServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Replaces the entire configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Binds the listener and assembles the server.
    pub async fn build(self) -> Result<CoilServer, ServerError> {
        let registry = RoomRegistry::new(self.config.room);
        let transport = WebSocketTransport::bind(&self.config.bind_addr)
            .await?
            .with_health_probe(health::probe(registry.active_rooms()));

        let state = Arc::new(ServerState {
            rooms: Mutex::new(registry),
            codec: JsonCodec,
        });

        Ok(CoilServer {
            transport,
            state,
            idle_timeout: self.config.idle_timeout,
            sweep_interval: self.config.sweep_interval,
        })
    }
}

impl Default for CoilServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running coil server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct CoilServer {
    transport: WebSocketTransport,
    state: Arc<ServerState>,
    idle_timeout: Duration,
    sweep_interval: Duration,
}

impl CoilServer {
    /// Creates a new builder.
    pub fn builder() -> CoilServerBuilder {
        CoilServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.transport.local_addr()?)
    }

    /// Runs the accept loop and the idle-room janitor.
    ///
    /// Accepts incoming connections and spawns a session task for each
    /// connected player. Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), ServerError> {
        self.spawn_janitor();
        tracing::info!("coil server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(
                                error = %e,
                                "session ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }

    /// Spawns the background task that periodically reclaims rooms that
    /// emptied or never started.
    fn spawn_janitor(&self) {
        let state = Arc::clone(&self.state);
        let idle_timeout = self.idle_timeout;
        let sweep_interval = self.sweep_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            loop {
                ticker.tick().await;
                let reaped = {
                    let mut rooms = state.rooms.lock().await;
                    rooms.sweep(idle_timeout).await
                };
                if !reaped.is_empty() {
                    tracing::info!(rooms = reaped.len(), "reclaimed idle rooms");
                }
            }
        });
    }
}
