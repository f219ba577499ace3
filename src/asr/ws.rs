use super::connection::{CloseReason, Connection, ConnectionEvent, Connector, EventHandler};
use super::session::SessionId;
use anyhow::{anyhow, bail, Context, Result};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, Notify};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CLOSE_TIMEOUT_SECS: u64 = 5;

/// Opens one WebSocket connection per session to a FunASR server
pub struct WsConnector {
    connect_timeout: Duration,
    close_timeout: Duration,
}

impl WsConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            close_timeout: Duration::from_secs(DEFAULT_CLOSE_TIMEOUT_SECS),
        }
    }

    /// How long a locally closed connection waits for the backend's close reply
    pub fn with_close_timeout(mut self, close_timeout: Duration) -> Self {
        self.close_timeout = close_timeout;
        self
    }
}

impl Default for WsConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
    }
}

#[async_trait::async_trait]
impl Connector for WsConnector {
    async fn open(
        &self,
        url: &str,
        session_id: SessionId,
        handler: Arc<dyn EventHandler>,
    ) -> Result<()> {
        info!("Session {}: connecting to {}", session_id, url);

        let (stream, _response) = tokio::time::timeout(self.connect_timeout, connect_async(url))
            .await
            .map_err(|_| anyhow!("Timed out after {:?} connecting to {}", self.connect_timeout, url))?
            .with_context(|| format!("WebSocket handshake with {} failed", url))?;

        let (writer, reader) = stream.split();
        let connection = Arc::new(WsConnection {
            writer: Mutex::new(writer),
            open: AtomicBool::new(true),
            closing: Notify::new(),
            close_timeout: self.close_timeout,
        });

        tokio::spawn(deliver_events(session_id, connection, reader, handler));

        Ok(())
    }
}

/// Write half of a session's WebSocket
struct WsConnection {
    writer: Mutex<SplitSink<WsStream, Message>>,
    open: AtomicBool,
    /// Wakes the reader when we start the close handshake
    closing: Notify,
    close_timeout: Duration,
}

impl WsConnection {
    async fn send(&self, message: Message) -> Result<()> {
        if !self.is_open() {
            bail!("WebSocket connection is closed");
        }

        self.writer
            .lock()
            .await
            .send(message)
            .await
            .context("WebSocket send failed")
    }
}

#[async_trait::async_trait]
impl Connection for WsConnection {
    async fn send_text(&self, text: String) -> Result<()> {
        self.send(Message::Text(text)).await
    }

    async fn send_binary(&self, data: Vec<u8>) -> Result<()> {
        self.send(Message::Binary(data)).await
    }

    async fn close(&self) -> Result<()> {
        if !self.open.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        self.closing.notify_one();

        let mut writer = self.writer.lock().await;
        tokio::time::timeout(self.close_timeout, writer.close())
            .await
            .map_err(|_| anyhow!("Timed out after {:?} sending close frame", self.close_timeout))?
            .context("Failed to close WebSocket")
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

/// Read loop: forwards every frame of one connection to the handler, in order.
async fn deliver_events(
    session_id: SessionId,
    connection: Arc<WsConnection>,
    mut reader: SplitStream<WsStream>,
    handler: Arc<dyn EventHandler>,
) {
    let handle: Arc<dyn Connection> = connection.clone();
    handler.on_event(session_id, ConnectionEvent::Opened(handle)).await;

    let mut close_reason = None;

    let terminal = loop {
        // Once we have closed our side, the backend gets a bounded time to reply
        let next = if connection.is_open() {
            tokio::select! {
                next = reader.next() => next,
                _ = connection.closing.notified() => continue,
            }
        } else {
            match tokio::time::timeout(connection.close_timeout, reader.next()).await {
                Ok(next) => next,
                Err(_) => {
                    debug!("Session {}: no close reply within {:?}", session_id, connection.close_timeout);
                    break ConnectionEvent::Closed(close_reason);
                }
            }
        };

        match next {
            Some(Ok(Message::Text(text))) => {
                handler.on_event(session_id, ConnectionEvent::Text(text)).await;
            }
            Some(Ok(Message::Binary(data))) => {
                handler.on_event(session_id, ConnectionEvent::Binary(data)).await;
            }
            Some(Ok(Message::Close(frame))) => {
                // Keep reading so tungstenite can flush the close reply
                close_reason = frame.map(|frame| CloseReason {
                    code: frame.code.into(),
                    reason: frame.reason.to_string(),
                });
            }
            Some(Ok(_)) => {
                // Ping/pong handled by tungstenite
            }
            Some(Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed))
            | None => break ConnectionEvent::Closed(close_reason),
            Some(Err(e)) if close_reason.is_some() => {
                debug!("Session {}: error after close frame: {}", session_id, e);
                break ConnectionEvent::Closed(close_reason);
            }
            Some(Err(e)) => break ConnectionEvent::Error(e.to_string()),
        }
    };

    connection.open.store(false, Ordering::SeqCst);
    handler.on_event(session_id, terminal).await;
}
