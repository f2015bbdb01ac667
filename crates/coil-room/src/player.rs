//! Player construction.

use coil_protocol::{Player, PlayerId};
use rand::Rng;

/// Arena bounds the clients render; placeholder spawns keep a margin so
/// nobody materializes half out of bounds.
const WORLD_SIZE: f64 = 2000.0;
const SPAWN_MARGIN: f64 = 200.0;

/// Reported stats of a fresh snake.
const INITIAL_LENGTH: f64 = 30.0;

/// Builds the membership entry for a joining connection.
///
/// The pose is a random placeholder that stands until the client's first
/// `playerUpdate`; starting the game does not reset it. `darker_color` is
/// derived here, once, and never re-derived.
pub(crate) fn spawn_player(
    id: PlayerId,
    username: String,
    color: String,
) -> Player {
    let mut rng = rand::rng();
    let darker_color = darker_variant(&color);
    Player {
        id,
        username,
        color,
        darker_color,
        x: rng.random_range(SPAWN_MARGIN..WORLD_SIZE - SPAWN_MARGIN),
        y: rng.random_range(SPAWN_MARGIN..WORLD_SIZE - SPAWN_MARGIN),
        angle: rng.random_range(0.0..std::f64::consts::TAU),
        segments: Vec::new(),
        length: INITIAL_LENGTH,
        score: 0.0,
        alive: true,
    }
}

/// Shaded variant of a display color: the client's hex color with a fixed
/// alpha channel appended.
fn darker_variant(color: &str) -> String {
    format!("{color}80")
}
