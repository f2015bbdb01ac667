//! Integration tests for the WebSocket transport: real sockets on an
//! ephemeral port, raw tokio-tungstenite clients on the other end.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_tungstenite::tungstenite::Message;

use coil_transport::{Connection, HealthProbe, Transport, WebSocketTransport};

// =========================================================================
// Frame round trips
// =========================================================================

#[tokio::test]
async fn test_text_frames_round_trip() {
    let mut transport = WebSocketTransport::bind("127.0.0.1:0").await.unwrap();
    let addr = transport.local_addr().unwrap();

    let client = tokio::spawn(async move {
        let (mut ws, _) =
            tokio_tungstenite::connect_async(format!("ws://{addr}"))
                .await
                .unwrap();
        ws.send(Message::text(r#"{"event":"startGame"}"#))
            .await
            .unwrap();
        let reply = ws.next().await.unwrap().unwrap();
        assert_eq!(
            reply.into_text().unwrap().as_str(),
            r#"{"event":"error","message":"nope"}"#
        );
        ws.close(None).await.unwrap();
    });

    let conn = transport.accept().await.unwrap();
    let inbound = conn.recv().await.unwrap().unwrap();
    assert_eq!(inbound, br#"{"event":"startGame"}"#);

    conn.send(br#"{"event":"error","message":"nope"}"#)
        .await
        .unwrap();

    // Client close surfaces as a clean end of stream, not an error.
    assert!(conn.recv().await.unwrap().is_none());
    client.await.unwrap();
}

#[tokio::test]
async fn test_connection_ids_are_unique() {
    let mut transport = WebSocketTransport::bind("127.0.0.1:0").await.unwrap();
    let addr = transport.local_addr().unwrap();

    let clients = tokio::spawn(async move {
        let (ws_a, _) =
            tokio_tungstenite::connect_async(format!("ws://{addr}"))
                .await
                .unwrap();
        let (ws_b, _) =
            tokio_tungstenite::connect_async(format!("ws://{addr}"))
                .await
                .unwrap();
        (ws_a, ws_b)
    });

    let first = transport.accept().await.unwrap();
    let second = transport.accept().await.unwrap();
    assert_ne!(first.id(), second.id());

    drop(clients.await.unwrap());
}

// =========================================================================
// Health probe on the same listener
// =========================================================================

#[tokio::test]
async fn test_health_probe_answers_plain_http_get() {
    let probe: HealthProbe = Arc::new(|| r#"{"status":"ok"}"#.to_string());
    let mut transport = WebSocketTransport::bind("127.0.0.1:0")
        .await
        .unwrap()
        .with_health_probe(probe);
    let addr = transport.local_addr().unwrap();

    let server = tokio::spawn(async move {
        // The probe request is absorbed inside accept(); only the real
        // WebSocket client that follows should come out.
        let conn = transport.accept().await.unwrap();
        assert!(conn.recv().await.unwrap().is_none());
    });

    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    assert!(response.starts_with("HTTP/1.1 200"), "got: {response}");
    assert!(
        response.contains("content-type: application/json"),
        "got: {response}"
    );
    assert!(response.contains(r#"{"status":"ok"}"#), "got: {response}");

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .unwrap();
    ws.close(None).await.unwrap();
    server.await.unwrap();
}
