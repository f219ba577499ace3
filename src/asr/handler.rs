use super::connection::{Connection, ConnectionEvent, EventHandler};
use super::error::RecognitionError;
use super::manager::{ManagerInner, Termination};
use super::messages::{InitMessage, ServerMessage};
use super::session::{SessionId, SessionState};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Drives the FunASR sub-protocol for every connection opened by a manager
///
/// Holds no per-session state: each event is routed to its session through
/// the registry by id, and events for sessions that are gone are dropped.
pub(crate) struct ProtocolHandler {
    inner: Arc<ManagerInner>,
}

impl ProtocolHandler {
    pub(crate) fn new(inner: Arc<ManagerInner>) -> Self {
        Self { inner }
    }

    async fn on_opened(&self, id: SessionId, connection: Arc<dyn Connection>) {
        let Some(session) = self.inner.registry.lookup(&id) else {
            info!("Session {}: connection opened after cleanup, closing it", id);
            Self::close_orphan(id, connection).await;
            return;
        };

        if !session.attach(Arc::clone(&connection)) {
            info!("Session {}: settled before its connection opened, closing it", id);
            Self::close_orphan(id, connection).await;
            return;
        }

        info!("Session {}: connected to ASR backend", id);
        session.transition(SessionState::Streaming);

        let settings = &self.inner.settings;
        let init = InitMessage::new(settings.mode, settings.hot_words.as_deref());
        let sent = match serde_json::to_string(&init) {
            Ok(payload) => connection.send_text(payload).await,
            Err(e) => Err(e.into()),
        };

        if let Err(e) = sent {
            self.inner
                .finish(
                    id,
                    Termination::Failed(RecognitionError::Send(format!("init message: {:#}", e))),
                )
                .await;
            return;
        }

        tokio::spawn(Arc::clone(&self.inner).stream_audio(session, connection));
    }

    async fn on_text(&self, id: SessionId, payload: String) {
        let Some(session) = self.inner.registry.lookup(&id) else {
            debug!("Session {}: dropping message for settled session: {}", id, payload);
            return;
        };

        debug!("Session {}: received {}", id, payload);

        let message = match serde_json::from_str::<ServerMessage>(&payload) {
            Ok(message) => message,
            Err(e) => {
                warn!("Session {}: ignoring malformed message ({}): {}", id, e, payload);
                return;
            }
        };

        if let Some(text) = message.text.as_deref() {
            session.append_text(text);
        }

        if message.is_final {
            self.inner.finish(id, Termination::Completed).await;
        }
    }

    async fn close_orphan(id: SessionId, connection: Arc<dyn Connection>) {
        if let Err(e) = connection.close().await {
            warn!("Session {}: failed to close orphaned connection: {:#}", id, e);
        }
    }
}

#[async_trait::async_trait]
impl EventHandler for ProtocolHandler {
    async fn on_event(&self, session_id: SessionId, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Opened(connection) => self.on_opened(session_id, connection).await,
            ConnectionEvent::Text(payload) => self.on_text(session_id, payload).await,
            ConnectionEvent::Binary(data) => {
                debug!("Session {}: ignoring {} byte binary message", session_id, data.len());
            }
            ConnectionEvent::Error(cause) => {
                error!("Session {}: transport error: {}", session_id, cause);
                self.inner
                    .finish(session_id, Termination::Failed(RecognitionError::Transport(cause)))
                    .await;
            }
            ConnectionEvent::Closed(reason) => {
                match &reason {
                    Some(reason) => info!("Session {}: connection closed: {}", session_id, reason),
                    None => info!("Session {}: connection closed", session_id),
                }
                self.inner.finish(session_id, Termination::Disconnected).await;
            }
        }
    }
}
