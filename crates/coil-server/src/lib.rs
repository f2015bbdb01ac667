//! # coil-server
//!
//! Server loop and per-connection session layer for the coil relay.
//!
//! This crate ties the layers together: transport → protocol → session →
//! room. The server accepts WebSocket connections, runs one session task
//! per connection, and keeps the room registry behind a mutex for lobby
//! operations. Gameplay traffic never touches that mutex; each session
//! relays through the room handle it cached when it entered the room.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # async fn run() -> Result<(), coil_server::ServerError> {
//! use coil_server::CoilServer;
//!
//! let server = CoilServer::builder().bind("0.0.0.0:8080").build().await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod health;
mod server;
mod session;

pub use config::ServerConfig;
pub use error::ServerError;
pub use server::{CoilServer, CoilServerBuilder};
