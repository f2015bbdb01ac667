//! Wire protocol for coil.
//!
//! This crate defines the language clients and the relay speak:
//!
//! - **Types** ([`Player`], [`PlayerId`], [`RoomCode`], [`SegmentPoint`]) -
//!   the structures that travel inside events.
//! - **Events** ([`ClientEvent`], [`ServerEvent`]) - every named message of
//!   the relay protocol with its exact wire field set.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) - how events are converted
//!   to and from bytes.
//! - **Errors** ([`ProtocolError`]) - what can go wrong during encoding or
//!   decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw frames) and the room
//! layer (membership and relay state). It knows nothing about connections
//! or rooms, only about the shape of messages.
//!
//! ```text
//! Transport (frames) → Protocol (events) → Rooms (membership + fan-out)
//! ```
//!
//! Field names and event tags are camelCase on the wire because the
//! browser client consumes them directly; they are part of the
//! compatibility surface and must not drift.

mod codec;
mod error;
mod events;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use events::{ClientEvent, ServerEvent};
pub use types::{Player, PlayerId, RoomCode, SegmentPoint};
