//! Core types of the relay wire format.
//!
//! Everything here is serialized inside events and shared verbatim with
//! clients. The server is a trust-the-client relay: pose, segments, length
//! and score are whatever the owning client last reported, and the server
//! never validates or simulates them. That contract is part of the
//! protocol, not an accident of the implementation.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a player.
///
/// Equal to the id of the connection that owns the player. There is no
/// account system behind it; identity lives and dies with the connection.
///
/// `#[serde(transparent)]` keeps it a plain number on the wire, so a
/// `PlayerId(42)` serializes as `42`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A room's short human-typable code, canonical uppercase.
///
/// Codes are case-insensitive on input: construct through [`RoomCode::new`]
/// so every stored or compared code is already canonical. On the wire a
/// code is a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Canonicalizes client input: surrounding whitespace is dropped and
    /// the code is uppercased.
    pub fn new(input: &str) -> Self {
        Self(input.trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Player state
// ---------------------------------------------------------------------------

/// One point of a snake's body trail.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentPoint {
    pub x: f64,
    pub y: f64,
}

/// A member of a room, as stored by the room and as sent in `players[]`.
///
/// The room keeps exactly the fields the clients need, so the in-memory
/// state and the wire snapshot are the same type. All numeric fields are
/// client-reported and relayed untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    /// Identifier of the owning connection.
    pub id: PlayerId,
    /// Display name supplied by the client at create/join time.
    pub username: String,
    /// Display color supplied by the client.
    pub color: String,
    /// Shaded variant of `color`, derived once when the player joins and
    /// never re-derived.
    pub darker_color: String,
    /// Latest reported pose. Starts as a random placeholder and keeps that
    /// value until the first `playerUpdate` arrives; there is no reset when
    /// the game starts.
    pub x: f64,
    pub y: f64,
    pub angle: f64,
    /// Body trail, fully replaced (never diffed) on each update.
    pub segments: Vec<SegmentPoint>,
    /// Latest reported stats.
    pub length: f64,
    pub score: f64,
    /// True until the client reports its own death. Monotonic for the
    /// lifetime of the membership; rejoining is the only resurrection.
    pub alive: bool,
}

// =========================================================================
// Tests
// =========================================================================
