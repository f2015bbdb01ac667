//! Room configuration.

use serde::{Deserialize, Serialize};

/// Tunables applied to every room the registry spawns.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Maximum members per room.
    pub max_players: usize,

    /// Members required before the host may start. 1 means no minimum;
    /// deployments that dislike solo games run with 2.
    pub min_players_to_start: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_players: 8,
            min_players_to_start: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_config_default() {
        let config = RoomConfig::default();
        assert_eq!(config.max_players, 8);
        assert_eq!(config.min_players_to_start, 1);
    }
}
