//! The named events of the relay protocol.
//!
//! Every message on the wire is a single JSON object tagged by its
//! `"event"` field: `{"event": "joinRoom", "code": "K7QX3B", ...}`.
//! [`ClientEvent`] enumerates everything a client may send,
//! [`ServerEvent`] everything the server may deliver. The tag values and
//! field names are consumed verbatim by the browser client, so both enums
//! rename to camelCase wholesale.
//!
//! Fan-out is part of the contract and differs per event; each outbound
//! variant documents who receives it. The one deliberate asymmetry:
//! `playerUpdate` is never echoed to its sender (the sender already holds
//! its own authoritative state, and pose traffic dominates bandwidth),
//! while every other gameplay event is echoed as the server-ordered
//! confirmation.

use serde::{Deserialize, Serialize};

use crate::types::{Player, PlayerId, RoomCode, SegmentPoint};

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Everything a client may send.
///
/// Payload fields are trusted as reported; anything that fails to
/// deserialize into one of these variants is dropped at the decode
/// boundary without touching room state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// Open a fresh room with the sender as host and sole member.
    CreateRoom { username: String, color: String },

    /// Join an existing room by its code. The code is matched
    /// case-insensitively.
    JoinRoom {
        code: String,
        username: String,
        color: String,
    },

    /// Host-only: flip the room into its started state.
    StartGame,

    /// High-frequency pose report. `segments` replaces the stored trail
    /// wholesale.
    PlayerUpdate {
        x: f64,
        y: f64,
        angle: f64,
        segments: Vec<SegmentPoint>,
        length: f64,
        score: f64,
    },

    /// The sender ate food item `food_index` and spawned `new_food` in its
    /// place. The replacement is opaque to the server and relayed verbatim.
    FoodEaten {
        food_index: u32,
        new_food: serde_json::Value,
    },

    /// The sender picked up powerup `powerup_index`.
    PowerupPickup { powerup_index: u32 },

    /// The sender challenges another member to a duel.
    DuelChallenge { opponent_id: PlayerId },

    /// A duel concluded on the clients' side; the server keeps no duel
    /// state and just relays the verdict.
    DuelResult {
        winner_id: PlayerId,
        loser_id: PlayerId,
    },

    /// The sender's snake died; the payload carries its final trail and
    /// position for the other clients' kill effects.
    PlayerDied {
        segments: Vec<SegmentPoint>,
        x: f64,
        y: f64,
    },

    /// Leave the current room. The connection stays open and may create or
    /// join again.
    LeaveRoom,
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Everything the server may deliver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Ack to `createRoom`. Sender only.
    RoomCreated {
        code: RoomCode,
        is_host: bool,
        host_id: PlayerId,
        players: Vec<Player>,
        max_players: usize,
    },

    /// Ack to a successful `joinRoom`, carrying the full membership
    /// snapshot. Sender only.
    RoomJoined {
        code: RoomCode,
        is_host: bool,
        host_id: PlayerId,
        players: Vec<Player>,
        max_players: usize,
    },

    /// Ack to a failed `joinRoom`. Sender only, never broadcast.
    JoinError { message: String },

    /// Membership delta for everyone already in the room when a new player
    /// joins. The joiner itself gets `roomJoined` instead.
    PlayerJoined {
        players: Vec<Player>,
        new_player_id: PlayerId,
        new_player_name: String,
    },

    /// The room entered its started state. All members, full snapshot.
    GameStarted { players: Vec<Player> },

    /// Non-fatal failure ack for anything that is not a join. Sender only.
    Error { message: String },

    /// Relay of one member's `playerUpdate`. Every member EXCEPT the
    /// reporting player.
    PlayerMoved {
        id: PlayerId,
        x: f64,
        y: f64,
        angle: f64,
        segments: Vec<SegmentPoint>,
        length: f64,
        score: f64,
    },

    /// Relay of `foodEaten`, stamped with the eater. All members including
    /// the sender.
    FoodEaten {
        food_index: u32,
        eaten_by: PlayerId,
        new_food: serde_json::Value,
    },

    /// Relay of `powerupPickup`, stamped with the collector. All members
    /// including the sender.
    PowerupPickup {
        powerup_index: u32,
        picked_by: PlayerId,
    },

    /// Relay of a member's death. All members including the sender.
    PlayerDied {
        id: PlayerId,
        username: String,
        segments: Vec<SegmentPoint>,
        x: f64,
        y: f64,
    },

    /// Relay of a duel challenge, stamped with the challenger. All members
    /// including the sender.
    DuelChallenge {
        challenger_id: PlayerId,
        opponent_id: PlayerId,
    },

    /// Relay of a duel verdict. All members including the sender.
    DuelResult {
        winner_id: PlayerId,
        loser_id: PlayerId,
    },

    /// Membership delta after a leave or disconnect, including the host
    /// that now applies. All REMAINING members; the leaver gets nothing.
    PlayerLeft {
        id: PlayerId,
        username: String,
        players: Vec<Player>,
        new_host_id: PlayerId,
    },
}

// =========================================================================
// Tests
// =========================================================================
