//! Room lifecycle and relay fan-out for coil.
//!
//! Each room runs as an isolated Tokio task (actor model) owning its
//! membership, host identity, and per-player relay state. All mutation of
//! one room is serialized through the actor's mailbox; different rooms
//! never share state, so they proceed fully in parallel.
//!
//! # Key types
//!
//! - [`RoomRegistry`] — creates/destroys rooms, looks up codes, sweeps
//!   the idle and the empty
//! - [`RoomHandle`] — sends commands to a running room actor
//! - [`GameplayEvent`] — in-game reports a member asks the room to fan out
//! - [`RoomConfig`] — capacity and start policy

mod code;
mod config;
mod error;
mod player;
mod registry;
mod room;

pub use config::RoomConfig;
pub use error::RoomError;
pub use registry::RoomRegistry;
pub use room::{
    GameplayEvent, LeaveOutcome, PlayerSender, RoomHandle, RoomInfo,
    RoomWelcome,
};
