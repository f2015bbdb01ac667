//! Per-connection session: decode, route, fan out.
//!
//! Each accepted connection gets its own Tokio task running
//! [`handle_connection`]. The task drives two directions at once:
//!   - inbound: frames off the socket, decoded into [`ClientEvent`]s and
//!     routed to the registry or to the session's cached room handle
//!   - outbound: [`ServerEvent`]s queued for this player by its room,
//!     encoded and written back to the socket
//!
//! A session is always in exactly one of three states: idle, waiting in a
//! lobby, or inside a running game. Lobby operations go through the shared
//! registry; gameplay relays go straight to the cached handle, so the
//! per-frame hot path never takes the registry lock.

use std::sync::Arc;

use coil_protocol::{ClientEvent, Codec, PlayerId, RoomCode, ServerEvent};
use coil_room::{GameplayEvent, PlayerSender, RoomError, RoomHandle};
use coil_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::ServerError;
use crate::server::ServerState;

/// Where a session stands in the room lifecycle.
///
/// The room handle is carried inside the in-room states, so "in a room"
/// and "has a handle" cannot drift apart.
enum SessionState {
    /// Connected, not in any room.
    Idle,
    /// Member of a room whose game has not started.
    Lobby { code: RoomCode, room: RoomHandle },
    /// Member of a room whose game is running.
    Active { code: RoomCode, room: RoomHandle },
}

impl SessionState {
    fn room(&self) -> Option<&RoomHandle> {
        match self {
            SessionState::Idle => None,
            SessionState::Lobby { room, .. }
            | SessionState::Active { room, .. } => Some(room),
        }
    }

    fn code(&self) -> Option<&RoomCode> {
        match self {
            SessionState::Idle => None,
            SessionState::Lobby { code, .. }
            | SessionState::Active { code, .. } => Some(code),
        }
    }

    fn is_in_room(&self) -> bool {
        !matches!(self, SessionState::Idle)
    }
}

/// State and event routing for one connected player.
struct SessionHandler {
    player_id: PlayerId,
    state: SessionState,
    /// Sender half of this session's outbound queue. A clone is handed to
    /// the room on create/join so broadcasts land in the same queue as
    /// this session's own acks.
    outbound: PlayerSender,
    server: Arc<ServerState>,
}

impl SessionHandler {
    fn new(
        player_id: PlayerId,
        outbound: PlayerSender,
        server: Arc<ServerState>,
    ) -> Self {
        Self {
            player_id,
            state: SessionState::Idle,
            outbound,
            server,
        }
    }

    /// Queues an event for this session's own socket. Failure means the
    /// outbound pump already stopped and the connection is tearing down.
    fn push(&self, event: ServerEvent) {
        let _ = self.outbound.send(event);
    }

    /// Advances lobby state when the room announces a start. Every member
    /// sees the `gameStarted` broadcast, so every member's session
    /// advances the same way, host included.
    fn observe(&mut self, event: &ServerEvent) {
        if matches!(event, ServerEvent::GameStarted { .. }) {
            let state =
                std::mem::replace(&mut self.state, SessionState::Idle);
            self.state = match state {
                SessionState::Lobby { code, room } => {
                    SessionState::Active { code, room }
                }
                other => other,
            };
        }
    }

    async fn handle_event(
        &mut self,
        event: ClientEvent,
        out_rx: &mut mpsc::UnboundedReceiver<ServerEvent>,
    ) {
        match event {
            ClientEvent::CreateRoom { username, color } => {
                self.handle_create(username, color).await;
            }
            ClientEvent::JoinRoom {
                code,
                username,
                color,
            } => {
                self.handle_join(code, username, color).await;
            }
            ClientEvent::StartGame => self.handle_start().await,
            ClientEvent::LeaveRoom => {
                self.leave_current_room().await;
                self.discard_stale_room_events(out_rx);
            }
            ClientEvent::PlayerUpdate {
                x,
                y,
                angle,
                segments,
                length,
                score,
            } => {
                self.relay(GameplayEvent::Update {
                    x,
                    y,
                    angle,
                    segments,
                    length,
                    score,
                })
                .await;
            }
            ClientEvent::FoodEaten {
                food_index,
                new_food,
            } => {
                self.relay(GameplayEvent::FoodEaten {
                    food_index,
                    new_food,
                })
                .await;
            }
            ClientEvent::PowerupPickup { powerup_index } => {
                self.relay(GameplayEvent::PowerupPickup { powerup_index })
                    .await;
            }
            ClientEvent::DuelChallenge { opponent_id } => {
                self.relay(GameplayEvent::DuelChallenge { opponent_id })
                    .await;
            }
            ClientEvent::DuelResult {
                winner_id,
                loser_id,
            } => {
                self.relay(GameplayEvent::DuelResult { winner_id, loser_id })
                    .await;
            }
            ClientEvent::PlayerDied { segments, x, y } => {
                self.relay(GameplayEvent::Died { segments, x, y }).await;
            }
        }
    }

    async fn handle_create(&mut self, username: String, color: String) {
        if self.state.is_in_room() {
            self.push(ServerEvent::Error {
                message: "Already in a room!".to_string(),
            });
            return;
        }

        // Lock scope covers code allocation and registration only.
        let (room, welcome) = {
            let mut rooms = self.server.rooms.lock().await;
            rooms.create(self.player_id, username, color, self.outbound.clone())
        };

        self.push(ServerEvent::RoomCreated {
            code: welcome.code.clone(),
            is_host: true,
            host_id: welcome.host_id,
            players: welcome.players,
            max_players: welcome.max_players,
        });
        self.state = SessionState::Lobby {
            code: welcome.code,
            room,
        };
    }

    async fn handle_join(
        &mut self,
        code: String,
        username: String,
        color: String,
    ) {
        if self.state.is_in_room() {
            self.push(ServerEvent::JoinError {
                message: "Already in a room!".to_string(),
            });
            return;
        }

        let code = RoomCode::new(&code);
        let result = {
            let mut rooms = self.server.rooms.lock().await;
            rooms
                .join(
                    &code,
                    self.player_id,
                    username,
                    color,
                    self.outbound.clone(),
                )
                .await
        };

        match result {
            Ok((room, welcome)) => {
                self.push(ServerEvent::RoomJoined {
                    code: welcome.code.clone(),
                    is_host: welcome.host_id == self.player_id,
                    host_id: welcome.host_id,
                    players: welcome.players,
                    max_players: welcome.max_players,
                });
                self.state = SessionState::Lobby {
                    code: welcome.code,
                    room,
                };
            }
            Err(e) => {
                self.push(ServerEvent::JoinError {
                    message: e.to_string(),
                });
            }
        }
    }

    async fn handle_start(&mut self) {
        let Some(code) = self.state.code().cloned() else {
            tracing::debug!(
                player = %self.player_id,
                "startGame outside a room, ignoring"
            );
            return;
        };

        let result = {
            let mut rooms = self.server.rooms.lock().await;
            rooms.start(&code, self.player_id).await
        };

        match result {
            Ok(()) => {
                // The `gameStarted` broadcast is the ack; observe() flips
                // this session to Active when it comes through the queue.
            }
            Err(e @ RoomError::NotFound(_)) => {
                // The room was reclaimed under this session. Tell the
                // requester and reset so it can create or join afresh.
                tracing::debug!(
                    player = %self.player_id,
                    error = %e,
                    "room gone, resetting session"
                );
                self.push(ServerEvent::Error {
                    message: e.to_string(),
                });
                self.state = SessionState::Idle;
            }
            Err(e) => {
                self.push(ServerEvent::Error {
                    message: e.to_string(),
                });
            }
        }
    }

    /// Hands a gameplay report to the session's room. Chatter from a
    /// roomless client is dropped without a reply.
    async fn relay(&mut self, event: GameplayEvent) {
        let Some(room) = self.state.room() else {
            return;
        };

        if room.relay(self.player_id, event).await.is_err() {
            tracing::debug!(
                player = %self.player_id,
                "room gone, resetting session"
            );
            self.state = SessionState::Idle;
        }
    }

    /// Leaves whatever room the session is in. Covers both an explicit
    /// `leaveRoom` and the implicit leave on disconnect; neither gets an
    /// ack, only the remaining members hear about it.
    async fn leave_current_room(&mut self) {
        match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::Idle => {}
            SessionState::Lobby { code, .. }
            | SessionState::Active { code, .. } => {
                let mut rooms = self.server.rooms.lock().await;
                rooms.leave(&code, self.player_id).await;
            }
        }
    }

    /// Purges room broadcasts still queued from a room this session has
    /// just left, so none of them (a `gameStarted` especially) can bleed
    /// into a room joined afterwards. The room removed this session's
    /// sender while processing the leave, so once the leave call returns
    /// everything it ever queued is already here. Direct acks survive
    /// the purge.
    fn discard_stale_room_events(
        &self,
        out_rx: &mut mpsc::UnboundedReceiver<ServerEvent>,
    ) {
        let mut kept = Vec::new();
        while let Ok(event) = out_rx.try_recv() {
            if matches!(
                event,
                ServerEvent::RoomCreated { .. }
                    | ServerEvent::RoomJoined { .. }
                    | ServerEvent::JoinError { .. }
                    | ServerEvent::Error { .. }
            ) {
                kept.push(event);
            }
        }
        for event in kept {
            let _ = self.outbound.send(event);
        }
    }
}

/// Drives a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    server: Arc<ServerState>,
) -> Result<(), ServerError> {
    let conn_id = conn.id();
    // A player's identity is its connection: no accounts, no reconnect.
    let player_id = PlayerId(conn_id.into_inner());
    tracing::debug!(%conn_id, %player_id, "session opened");

    let (out_tx, mut out_rx) = mpsc::unbounded_channel();
    let mut session =
        SessionHandler::new(player_id, out_tx, Arc::clone(&server));

    let result = drive(&conn, &server, &mut session, &mut out_rx).await;

    // The implicit leave must run no matter how the loop ended.
    session.leave_current_room().await;
    let _ = conn.close().await;
    tracing::debug!(%player_id, "session closed");

    result
}

/// Session loop: multiplexes inbound frames and outbound events.
async fn drive(
    conn: &WebSocketConnection,
    server: &Arc<ServerState>,
    session: &mut SessionHandler,
    out_rx: &mut mpsc::UnboundedReceiver<ServerEvent>,
) -> Result<(), ServerError> {
    let player_id = session.player_id;

    loop {
        tokio::select! {
            incoming = conn.recv() => match incoming {
                Ok(Some(data)) => {
                    let event: ClientEvent = match server.codec.decode(&data) {
                        Ok(event) => event,
                        Err(e) => {
                            // Malformed frames are dropped, never fatal.
                            tracing::debug!(
                                %player_id,
                                error = %e,
                                "undecodable frame"
                            );
                            continue;
                        }
                    };
                    session.handle_event(event, out_rx).await;
                }
                Ok(None) => {
                    tracing::info!(%player_id, "connection closed");
                    return Ok(());
                }
                Err(e) => {
                    tracing::debug!(%player_id, error = %e, "recv error");
                    return Ok(());
                }
            },
            outgoing = out_rx.recv() => {
                // The session holds the sender, so the queue cannot end
                // before this loop does.
                let Some(event) = outgoing else {
                    return Ok(());
                };
                session.observe(&event);
                let bytes = server.codec.encode(&event)?;
                if let Err(e) = conn.send(&bytes).await {
                    tracing::debug!(%player_id, error = %e, "send failed");
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use coil_protocol::JsonCodec;
    use coil_room::{RoomConfig, RoomRegistry};
    use tokio::sync::Mutex;

    fn test_state() -> Arc<ServerState> {
        Arc::new(ServerState {
            rooms: Mutex::new(RoomRegistry::new(RoomConfig::default())),
            codec: JsonCodec,
        })
    }

    fn session_with_queue(
        id: u64,
        server: Arc<ServerState>,
    ) -> (SessionHandler, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (SessionHandler::new(PlayerId(id), tx, server), rx)
    }

    fn create_event(name: &str) -> ClientEvent {
        ClientEvent::CreateRoom {
            username: name.to_string(),
            color: "#ff5500".to_string(),
        }
    }

    #[tokio::test]
    async fn test_leave_discards_queued_room_traffic() {
        let (mut session, mut rx) = session_with_queue(1, test_state());

        session.handle_event(create_event("Alice"), &mut rx).await;
        let created = rx.try_recv().unwrap();
        assert!(matches!(created, ServerEvent::RoomCreated { .. }));

        // Start queues a gameStarted broadcast the connection has not
        // flushed yet.
        session.handle_event(ClientEvent::StartGame, &mut rx).await;

        // Leaving must throw that broadcast away; a frame from the old
        // room must never reach the next one.
        session.handle_event(ClientEvent::LeaveRoom, &mut rx).await;
        session.handle_event(create_event("Alice"), &mut rx).await;

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(events.len(), 1, "stale broadcast survived: {events:?}");
        assert!(matches!(events[0], ServerEvent::RoomCreated { .. }));

        // Feeding the survivors through observe leaves the fresh lobby
        // in its lobby state.
        for event in &events {
            session.observe(event);
        }
        assert!(matches!(session.state, SessionState::Lobby { .. }));
    }

    #[tokio::test]
    async fn test_leave_keeps_unflushed_acks() {
        let (mut session, mut rx) = session_with_queue(1, test_state());

        // createRoom and leaveRoom land back to back, before the
        // outbound pump flushes the ack.
        session.handle_event(create_event("Alice"), &mut rx).await;
        session.handle_event(ClientEvent::LeaveRoom, &mut rx).await;

        let kept = rx.try_recv().unwrap();
        assert!(matches!(kept, ServerEvent::RoomCreated { .. }));
        assert!(rx.try_recv().is_err());
    }
}
