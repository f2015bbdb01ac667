//! Room registry: creates, looks up, and destroys rooms.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use coil_protocol::{PlayerId, RoomCode};

use crate::code::{allocate_code, generate_code};
use crate::player::spawn_player;
use crate::room::{
    LeaveOutcome, PlayerSender, RoomHandle, RoomWelcome, spawn_room,
};
use crate::{RoomConfig, RoomError};

/// Command channel size for room actors.
const ROOM_CHANNEL_SIZE: usize = 64;

/// Owns every live room, keyed by canonical code.
///
/// Constructed once at process start and accessed only through these
/// operations. The server keeps it behind a mutex that is held for
/// lookups and lifecycle changes; gameplay relays go through cached
/// [`RoomHandle`]s and never come back here.
pub struct RoomRegistry {
    rooms: HashMap<RoomCode, RoomHandle>,
    config: RoomConfig,
    /// Live-room gauge shared with the health probe.
    active_rooms: Arc<AtomicUsize>,
}

impl RoomRegistry {
    /// Creates an empty registry applying `config` to every future room.
    pub fn new(config: RoomConfig) -> Self {
        Self {
            rooms: HashMap::new(),
            config,
            active_rooms: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared counter of live rooms, readable without the registry lock.
    pub fn active_rooms(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.active_rooms)
    }

    /// Opens a room with the requester as host and sole member.
    ///
    /// Cannot fail: the code is allocated fresh while the caller holds
    /// the registry, and a one-member room is never full or started.
    pub fn create(
        &mut self,
        host_id: PlayerId,
        username: String,
        color: String,
        sender: PlayerSender,
    ) -> (RoomHandle, RoomWelcome) {
        let code = allocate_code(&self.rooms, generate_code);
        let host = spawn_player(host_id, username, color);
        let (handle, welcome) = spawn_room(
            code.clone(),
            self.config,
            host,
            sender,
            ROOM_CHANNEL_SIZE,
        );
        self.rooms.insert(code.clone(), handle.clone());
        self.active_rooms.fetch_add(1, Ordering::Relaxed);
        tracing::info!(room = %code, host = %host_id, "room created");
        (handle, welcome)
    }

    /// Adds a player to the room under `code`.
    ///
    /// # Errors
    /// `NotFound` for an unknown (or just-reclaimed) code,
    /// `GameInProgress` once the room started, `RoomFull` at capacity.
    pub async fn join(
        &mut self,
        code: &RoomCode,
        player_id: PlayerId,
        username: String,
        color: String,
        sender: PlayerSender,
    ) -> Result<(RoomHandle, RoomWelcome), RoomError> {
        let handle = self
            .rooms
            .get(code)
            .cloned()
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;

        match handle.join(player_id, username, color, sender).await {
            Ok(welcome) => Ok((handle, welcome)),
            Err(RoomError::Unavailable(_)) => {
                // The actor died without deregistering; evict the stale
                // entry and report the room as gone.
                self.remove(code).await;
                Err(RoomError::NotFound(code.clone()))
            }
            Err(e) => Err(e),
        }
    }

    /// Starts the game in the room under `code` on the host's request.
    ///
    /// # Errors
    /// `NotFound` for an unknown or dead room, `NotHost` when the
    /// requester is not the host, `NotEnoughPlayers` below the configured
    /// minimum. Starting an already-started room is a no-op.
    pub async fn start(
        &mut self,
        code: &RoomCode,
        player_id: PlayerId,
    ) -> Result<(), RoomError> {
        let handle = self
            .rooms
            .get(code)
            .cloned()
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;

        match handle.start(player_id).await {
            Err(RoomError::Unavailable(_)) => {
                self.remove(code).await;
                Err(RoomError::NotFound(code.clone()))
            }
            other => other,
        }
    }

    /// Removes a player from the room under `code`, destroying the room
    /// when it empties. A no-op for unknown codes or non-members.
    pub async fn leave(&mut self, code: &RoomCode, player_id: PlayerId) {
        let Some(handle) = self.rooms.get(code).cloned() else {
            return;
        };

        match handle.leave(player_id).await {
            Ok(LeaveOutcome {
                now_empty: true, ..
            })
            | Err(_) => {
                self.remove(code).await;
            }
            Ok(_) => {}
        }
    }

    /// Destroys every room that is empty or has sat unstarted for longer
    /// than `idle_after`. Returns the reclaimed codes.
    ///
    /// Eligibility is decided inside each room actor, so a concurrent
    /// join is ordered before or after the reap, never interleaved with
    /// it.
    pub async fn sweep(&mut self, idle_after: Duration) -> Vec<RoomCode> {
        let targets: Vec<(RoomCode, RoomHandle)> = self
            .rooms
            .iter()
            .map(|(code, handle)| (code.clone(), handle.clone()))
            .collect();

        let mut reaped = Vec::new();
        for (code, handle) in targets {
            match handle.reap(idle_after).await {
                Ok(true) | Err(_) => {
                    self.remove(&code).await;
                    reaped.push(code);
                }
                Ok(false) => {}
            }
        }
        reaped
    }

    /// Number of live rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// True when `code` refers to a live room.
    pub fn contains(&self, code: &RoomCode) -> bool {
        self.rooms.contains_key(code)
    }

    async fn remove(&mut self, code: &RoomCode) {
        if let Some(handle) = self.rooms.remove(code) {
            let _ = handle.shutdown().await;
            self.active_rooms.fetch_sub(1, Ordering::Relaxed);
            tracing::info!(room = %code, "room destroyed");
        }
    }
}
