//! Server configuration.

use std::time::Duration;

use coil_room::RoomConfig;

/// Top-level configuration for a coil server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,
    /// Settings applied to every room.
    pub room: RoomConfig,
    /// How long an unstarted room may sit before the janitor reclaims it.
    pub idle_timeout: Duration,
    /// How often the janitor sweeps for reclaimable rooms.
    pub sweep_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            room: RoomConfig::default(),
            idle_timeout: Duration::from_secs(600),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl ServerConfig {
    /// Builds a configuration from environment variables, falling back to
    /// defaults for anything unset or unparseable:
    ///
    /// - `COIL_BIND`: listener address
    /// - `COIL_MAX_PLAYERS`: room capacity
    /// - `COIL_MIN_PLAYERS`: members required to start a game
    /// - `COIL_IDLE_SECS`: idle threshold for room reclamation
    /// - `COIL_SWEEP_SECS`: janitor sweep period
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(addr) = std::env::var("COIL_BIND") {
            config.bind_addr = addr;
        }
        if let Some(max) = env_parse("COIL_MAX_PLAYERS") {
            config.room.max_players = max;
        }
        if let Some(min) = env_parse("COIL_MIN_PLAYERS") {
            config.room.min_players_to_start = min;
        }
        if let Some(secs) = env_parse("COIL_IDLE_SECS") {
            config.idle_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_parse("COIL_SWEEP_SECS") {
            config.sweep_interval = Duration::from_secs(secs);
        }
        config
    }
}

/// Parses one environment variable, warning when a value is set but
/// malformed. A bad value falls back to the default instead of refusing
/// to boot.
fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable environment variable");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.room.max_players, 8);
        assert_eq!(config.room.min_players_to_start, 1);
        assert_eq!(config.idle_timeout, Duration::from_secs(600));
        assert_eq!(config.sweep_interval, Duration::from_secs(60));
    }
}
