//! Unified error type for the server crate.

use coil_protocol::ProtocolError;
use coil_room::RoomError;
use coil_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (full, not found, not host).
    #[error(transparent)]
    Room(#[from] RoomError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use coil_protocol::RoomCode;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::SendFailed(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "gone",
        ));
        let server_err: ServerError = err.into();
        assert!(matches!(server_err, ServerError::Transport(_)));
    }

    #[test]
    fn test_from_room_error_keeps_client_message() {
        let err = RoomError::RoomFull(RoomCode::new("K7QX3B"));
        let server_err: ServerError = err.into();
        assert!(matches!(server_err, ServerError::Room(_)));
        assert_eq!(server_err.to_string(), "Room is full!");
    }
}
