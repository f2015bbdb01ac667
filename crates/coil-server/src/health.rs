//! Liveness endpoint payload.
//!
//! The transport answers plain `GET /health` requests on the game port
//! before any WebSocket handshake, so orchestrators and uptime monitors
//! can probe the server without speaking the relay protocol.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use coil_transport::HealthProbe;
use serde::Serialize;

/// Body of a health response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthStatus {
    status: &'static str,
    active_rooms: usize,
    timestamp: u64,
}

/// Builds the probe closure handed to the transport.
///
/// Runs on the accept path, so it must not block: it reads the shared
/// room gauge and nothing else.
pub(crate) fn probe(active_rooms: Arc<AtomicUsize>) -> HealthProbe {
    Arc::new(move || {
        let status = HealthStatus {
            status: "ok",
            active_rooms: active_rooms.load(Ordering::Relaxed),
            timestamp: unix_millis(),
        };
        serde_json::to_string(&status)
            .unwrap_or_else(|_| r#"{"status":"ok"}"#.to_string())
    })
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_body_shape() {
        let gauge = Arc::new(AtomicUsize::new(3));
        let probe = probe(gauge);

        let body: serde_json::Value = serde_json::from_str(&probe()).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["activeRooms"], 3);
        assert!(body["timestamp"].as_u64().unwrap() > 0);
    }
}
