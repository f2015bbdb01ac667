//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! Frames are text because the browser client speaks JSON strings. The
//! same listener also answers plain `GET /health` requests before any
//! upgrade, so deployments get a liveness endpoint without a second port
//! or a second HTTP stack.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;

use crate::{Connection, ConnectionId, Transport, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;

/// Callback that renders the current liveness payload.
///
/// Runs on the accept path before any WebSocket upgrade, so it must be
/// cheap and lock-free; the server feeds it from atomic gauges.
pub type HealthProbe = Arc<dyn Fn() -> String + Send + Sync>;

/// A WebSocket-based [`Transport`] that listens for incoming connections.
pub struct WebSocketTransport {
    listener: TcpListener,
    health: Option<HealthProbe>,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "WebSocket transport listening");
        Ok(Self {
            listener,
            health: None,
        })
    }

    /// Answers plain `GET /health` requests on this listener with the
    /// probe's JSON payload instead of upgrading them.
    pub fn with_health_probe(mut self, probe: HealthProbe) -> Self {
        self.health = Some(probe);
        self
    }

    /// The address the listener is bound to. Useful when binding port 0.
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.listener
            .local_addr()
            .map_err(TransportError::AcceptFailed)
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        // Health probes and failed upgrades are consumed here; only real
        // connections and listener-level failures reach the caller.
        loop {
            let (stream, addr) = self
                .listener
                .accept()
                .await
                .map_err(TransportError::AcceptFailed)?;

            // A plain HTTP probe carries no upgrade headers, so it must
            // be spotted and answered before the stream ever reaches the
            // WebSocket handshake.
            if let Some(probe) = &self.health {
                if sniff_health_request(&stream).await {
                    serve_health(stream, probe).await;
                    tracing::trace!(%addr, "answered health probe");
                    continue;
                }
            }

            let ws = match tokio_tungstenite::accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    tracing::debug!(%addr, error = %e, "WebSocket handshake failed");
                    continue;
                }
            };

            let id = ConnectionId::new(
                NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            );
            tracing::debug!(%id, %addr, "accepted WebSocket connection");

            return Ok(WebSocketConnection {
                id,
                ws: Arc::new(Mutex::new(ws)),
            });
        }
    }
}

/// Request-line prefix that marks a liveness probe.
const HEALTH_REQUEST: &[u8] = b"GET /health ";

/// Checks whether the stream opens with a health request, without
/// consuming any bytes. Upgrade requests ask for other paths, so the
/// request line alone tells the two apart.
async fn sniff_health_request(stream: &TcpStream) -> bool {
    let mut head = [0u8; HEALTH_REQUEST.len()];
    loop {
        match stream.peek(&mut head).await {
            Ok(0) | Err(_) => return false,
            Ok(n) if head[..n] != HEALTH_REQUEST[..n] => return false,
            Ok(n) if n == HEALTH_REQUEST.len() => return true,
            // The request line is still in flight; peek again once more
            // bytes arrive.
            Ok(_) => tokio::task::yield_now().await,
        }
    }
}

/// Answers a liveness probe with the payload and closes the socket.
async fn serve_health(mut stream: TcpStream, probe: &HealthProbe) {
    // Drain the request head first so closing the socket cannot reset
    // the client before it has read the response.
    let mut chunk = [0u8; 512];
    let mut head = Vec::new();
    loop {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                head.extend_from_slice(&chunk[..n]);
                if head.windows(4).any(|w| w == b"\r\n\r\n")
                    || head.len() >= 8192
                {
                    break;
                }
            }
        }
    }

    let body = probe();
    let response = format!(
        "HTTP/1.1 200 OK\r\n\
         content-type: application/json\r\n\
         content-length: {}\r\n\
         connection: close\r\n\
         \r\n\
         {body}",
        body.len(),
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

/// A single WebSocket connection.
pub struct WebSocketConnection {
    id: ConnectionId,
    ws: Arc<Mutex<WsStream>>,
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        use futures_util::SinkExt;
        // Events are JSON, so they travel as text frames; browser clients
        // read `event.data` as a string.
        let text = std::str::from_utf8(data).map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                e,
            ))
        })?;
        self.ws
            .lock()
            .await
            .send(Message::text(text))
            .await
            .map_err(|e| {
                TransportError::SendFailed(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    e,
                ))
            })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        use futures_util::StreamExt;
        loop {
            let msg = self.ws.lock().await.next().await;
            match msg {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(data.into()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // skip ping/pong/frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(
                        std::io::Error::new(
                            std::io::ErrorKind::ConnectionReset,
                            e,
                        ),
                    ));
                }
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.ws.lock().await.close(None).await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
