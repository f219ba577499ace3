use super::session::SessionId;
use anyhow::Result;
use std::fmt;
use std::sync::Arc;

/// Why the backend closed the connection, when it said so
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReason {
    pub code: u16,
    pub reason: String,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reason.is_empty() {
            write!(f, "code {}", self.code)
        } else {
            write!(f, "code {} ({})", self.code, self.reason)
        }
    }
}

/// Event delivered by a connection to its [`EventHandler`]
pub enum ConnectionEvent {
    /// Handshake complete. Always the first event of a connection.
    Opened(Arc<dyn Connection>),
    Text(String),
    Binary(Vec<u8>),
    /// Connection ended. `None` when it ended without a close frame.
    Closed(Option<CloseReason>),
    /// Transport failure. Terminal, like `Closed`.
    Error(String),
}

impl fmt::Debug for ConnectionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionEvent::Opened(_) => f.write_str("Opened"),
            ConnectionEvent::Text(text) => f.debug_tuple("Text").field(text).finish(),
            ConnectionEvent::Binary(data) => write!(f, "Binary({} bytes)", data.len()),
            ConnectionEvent::Closed(reason) => f.debug_tuple("Closed").field(reason).finish(),
            ConnectionEvent::Error(cause) => f.debug_tuple("Error").field(cause).finish(),
        }
    }
}

/// Sending half of an open duplex connection
#[async_trait::async_trait]
pub trait Connection: Send + Sync {
    async fn send_text(&self, text: String) -> Result<()>;

    async fn send_binary(&self, data: Vec<u8>) -> Result<()>;

    /// Close the connection. Closing twice is a no-op.
    async fn close(&self) -> Result<()>;

    fn is_open(&self) -> bool;
}

/// Receives the events of connections opened through a [`Connector`]
///
/// Events of one connection are delivered one at a time, in arrival order:
/// `Opened`, then any number of `Text`/`Binary`, then at most one of
/// `Closed`/`Error`. Different connections deliver concurrently.
#[async_trait::async_trait]
pub trait EventHandler: Send + Sync {
    async fn on_event(&self, session_id: SessionId, event: ConnectionEvent);
}

/// Opens connections to the recognition backend
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    /// Establish a connection to `url` and start delivering its events to
    /// `handler`, tagged with `session_id`.
    ///
    /// Resolves once the handshake has succeeded or failed. On failure no
    /// event is delivered.
    async fn open(
        &self,
        url: &str,
        session_id: SessionId,
        handler: Arc<dyn EventHandler>,
    ) -> Result<()>;
}
