use super::config::AsrSettings;
use super::connection::{Connection, Connector, EventHandler};
use super::error::RecognitionError;
use super::handler::ProtocolHandler;
use super::messages::EndMessage;
use super::registry::SessionRegistry;
use super::session::{Session, SessionId, SessionState};
use super::settlement::{RecognitionResult, SettlementReceiver};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Split an audio payload into the frames sent to the backend, in offset order.
pub fn chunk_audio(audio: &[u8], chunk_size: usize) -> std::slice::Chunks<'_, u8> {
    audio.chunks(chunk_size.max(1))
}

/// How a session ended
#[derive(Debug)]
pub(crate) enum Termination {
    /// Final marker received
    Completed,
    /// Connection closed before a final marker; the partial transcript stands
    Disconnected,
    Failed(RecognitionError),
}

/// Turns a call-and-return recognition request into a streaming conversation
/// with the backend, one connection per request.
///
/// Cheap to clone; clones share the same registry and connector.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<ManagerInner>,
}

pub(crate) struct ManagerInner {
    pub(crate) connector: Arc<dyn Connector>,
    pub(crate) registry: SessionRegistry,
    pub(crate) settings: AsrSettings,
}

/// A started recognition whose outcome has not been collected yet
pub struct PendingRecognition {
    id: SessionId,
    rx: SettlementReceiver,
}

impl PendingRecognition {
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Wait up to `timeout` for the session to settle.
    ///
    /// Timing out only stops the wait; the session keeps running.
    pub async fn wait(self, timeout: Duration) -> RecognitionResult {
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(RecognitionError::Abandoned),
            Err(_) => Err(RecognitionError::Timeout(timeout)),
        }
    }
}

impl SessionManager {
    pub fn new(connector: Arc<dyn Connector>, settings: AsrSettings) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                connector,
                registry: SessionRegistry::new(),
                settings,
            }),
        }
    }

    pub fn settings(&self) -> &AsrSettings {
        &self.inner.settings
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.inner.registry
    }

    /// Number of sessions not yet settled and cleaned up
    pub fn active_sessions(&self) -> usize {
        self.inner.registry.len()
    }

    /// Recognize 16 kHz / 16-bit / mono PCM audio.
    ///
    /// Waits at most `settings.timeout` for the backend's answer.
    pub async fn recognize(&self, audio: Vec<u8>) -> RecognitionResult {
        let timeout = self.inner.settings.timeout;
        let pending = self.start(audio);
        let id = pending.id();

        let result = pending.wait(timeout).await;

        if let Err(RecognitionError::Timeout(_)) = &result {
            warn!("Session {}: caller gave up after {:?}", id, timeout);
            if self.inner.settings.cancel_on_timeout {
                self.abort(id).await;
            }
        }

        result
    }

    /// Register a session and start connecting. Does not wait for the outcome.
    pub fn start(&self, audio: Vec<u8>) -> PendingRecognition {
        let id = SessionId::new();
        let (session, rx) = Session::new(id, audio);

        info!(
            "Session {}: registered ({} bytes of audio, mode={})",
            id,
            session.audio_len(),
            self.inner.settings.mode
        );
        self.inner.registry.register(Arc::new(session));

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.connect(id).await });

        PendingRecognition { id, rx }
    }

    /// Clean up a session as timed out. Returns `false` if it had already settled.
    pub async fn abort(&self, id: SessionId) -> bool {
        let timeout = self.inner.settings.timeout;
        self.inner
            .finish(id, Termination::Failed(RecognitionError::Timeout(timeout)))
            .await
    }
}

impl ManagerInner {
    async fn connect(self: Arc<Self>, id: SessionId) {
        let url = self.settings.server_url.clone();
        let handler: Arc<dyn EventHandler> = Arc::new(ProtocolHandler::new(Arc::clone(&self)));

        if let Err(e) = self.connector.open(&url, id, handler).await {
            error!("Session {}: failed to connect to {}: {:#}", id, url, e);
            self.finish(id, Termination::Failed(RecognitionError::Connect(format!("{:#}", e))))
                .await;
        }
    }

    /// Settle and clean up a session exactly once.
    ///
    /// Removing the session from the registry is the claim: whoever gets it
    /// settles it and closes its connection. Returns `false` for everyone else.
    pub(crate) async fn finish(&self, id: SessionId, termination: Termination) -> bool {
        let Some(session) = self.registry.remove(&id) else {
            debug!("Session {}: already cleaned up ({:?})", id, termination);
            return false;
        };

        let result = match termination {
            Termination::Completed => {
                let text = session.transcript();
                info!(
                    "Session {}: recognition complete after {}ms: {}",
                    id,
                    session.elapsed_ms(),
                    text
                );
                Ok(text)
            }
            Termination::Disconnected => {
                let text = session.transcript();
                info!(
                    "Session {}: connection closed before final result, keeping partial transcript ({} chars)",
                    id,
                    text.chars().count()
                );
                Ok(text)
            }
            Termination::Failed(e) => {
                error!("Session {}: recognition failed in state {}: {}", id, session.state(), e);
                Err(e)
            }
        };

        session.settle(result);

        if let Some(connection) = session.take_connection() {
            if let Err(e) = connection.close().await {
                warn!("Session {}: failed to close connection: {:#}", id, e);
            }
        }

        debug!("Session {}: cleaned up", id);
        true
    }

    /// Send the session's audio as binary frames followed by the end message.
    pub(crate) async fn stream_audio(
        self: Arc<Self>,
        session: Arc<Session>,
        connection: Arc<dyn Connection>,
    ) {
        let id = session.id();
        let audio = session.take_audio().unwrap_or_default();
        let chunk_size = self.settings.chunk_size.max(1);
        let interval = self.settings.chunk_interval;
        let mut sent = 0usize;

        for (index, chunk) in chunk_audio(&audio, chunk_size).enumerate() {
            if index > 0 && !interval.is_zero() {
                tokio::time::sleep(interval).await;
            }

            if session.is_settled() {
                debug!("Session {}: settled while streaming, stopping at chunk {}", id, index);
                return;
            }

            if !connection.is_open() {
                self.finish(
                    id,
                    Termination::Failed(RecognitionError::Send(
                        "connection closed while streaming audio".to_string(),
                    )),
                )
                .await;
                return;
            }

            if let Err(e) = connection.send_binary(chunk.to_vec()).await {
                self.finish(
                    id,
                    Termination::Failed(RecognitionError::Send(format!(
                        "audio chunk {} ({} bytes): {:#}",
                        index,
                        chunk.len(),
                        e
                    ))),
                )
                .await;
                return;
            }

            sent += chunk.len();
            debug!("Session {}: sent chunk {} ({} bytes, {}/{} total)", id, index, chunk.len(), sent, audio.len());
        }

        if session.is_settled() {
            return;
        }

        let end = match serde_json::to_string(&EndMessage::default()) {
            Ok(end) => end,
            Err(e) => {
                self.finish(id, Termination::Failed(RecognitionError::Send(e.to_string())))
                    .await;
                return;
            }
        };

        if let Err(e) = connection.send_text(end).await {
            self.finish(
                id,
                Termination::Failed(RecognitionError::Send(format!("end of stream: {:#}", e))),
            )
            .await;
            return;
        }

        session.transition(SessionState::AwaitingFinal);
        info!("Session {}: streamed {} bytes, awaiting final result", id, sent);
    }
}
