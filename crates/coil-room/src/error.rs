//! Error types for the room layer.
//!
//! The `Display` strings of the user-facing variants are sent verbatim in
//! `joinError`/`error` acknowledgements, so they are wire surface and must
//! not be reworded casually.

use coil_protocol::{PlayerId, RoomCode};

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// No live room under this code.
    #[error("Room not found!")]
    NotFound(RoomCode),

    /// The room started before the join landed.
    #[error("Game already in progress!")]
    GameInProgress(RoomCode),

    /// No free slots left.
    #[error("Room is full!")]
    RoomFull(RoomCode),

    /// A start request from a member that is not the host.
    #[error("Only the host can start the game!")]
    NotHost(PlayerId),

    /// A start request below the configured member minimum.
    #[error("Need at least {0} players to start!")]
    NotEnoughPlayers(usize),

    /// The room's command channel is closed (actor gone or shutting
    /// down). The registry translates this into `NotFound` before it can
    /// reach a client.
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),
}
