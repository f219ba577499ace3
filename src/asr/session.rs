use super::connection::Connection;
use super::settlement::{RecognitionResult, Settlement, SettlementReceiver};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// Correlation key for one recognition attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingConnection,
    Streaming,
    AwaitingFinal,
    Settled,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::AwaitingConnection => "awaiting-connection",
            SessionState::Streaming => "streaming",
            SessionState::AwaitingFinal => "awaiting-final",
            SessionState::Settled => "settled",
        };
        f.write_str(name)
    }
}

/// State of one in-flight recognition
///
/// Owns the connection once it is established. Every termination path goes
/// through [`Session::settle`], which assigns the outcome at most once.
pub struct Session {
    id: SessionId,
    created_at: DateTime<Utc>,
    state: Mutex<SessionState>,
    transcript: Mutex<String>,
    settlement: Settlement,
    connection: Mutex<Option<Arc<dyn Connection>>>,
    audio: Mutex<Option<Vec<u8>>>,
    audio_len: usize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Session {
    pub fn new(id: SessionId, audio: Vec<u8>) -> (Self, SettlementReceiver) {
        let (settlement, rx) = Settlement::new();
        let session = Self {
            id,
            created_at: Utc::now(),
            state: Mutex::new(SessionState::AwaitingConnection),
            transcript: Mutex::new(String::new()),
            settlement,
            connection: Mutex::new(None),
            audio_len: audio.len(),
            audio: Mutex::new(Some(audio)),
        };
        (session, rx)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Milliseconds since the session was created
    pub fn elapsed_ms(&self) -> i64 {
        Utc::now()
            .signed_duration_since(self.created_at)
            .num_milliseconds()
    }

    pub fn state(&self) -> SessionState {
        *lock(&self.state)
    }

    /// Move to `next` unless already settled.
    pub fn transition(&self, next: SessionState) {
        let mut state = lock(&self.state);
        if *state != SessionState::Settled {
            *state = next;
        }
    }

    pub fn audio_len(&self) -> usize {
        self.audio_len
    }

    /// Hand the audio payload to the streaming task. Yields `None` after the first call.
    pub fn take_audio(&self) -> Option<Vec<u8>> {
        lock(&self.audio).take()
    }

    pub fn append_text(&self, fragment: &str) {
        lock(&self.transcript).push_str(fragment);
    }

    pub fn transcript(&self) -> String {
        lock(&self.transcript).clone()
    }

    /// Store the connection handle.
    ///
    /// Returns `false` if the session settled concurrently; the handle is not
    /// kept in that case and the caller is responsible for closing it.
    pub fn attach(&self, connection: Arc<dyn Connection>) -> bool {
        *lock(&self.connection) = Some(connection);
        // Settlement happens before cleanup takes the connection, so a
        // concurrent cleanup either sees this handle or we see it settled.
        if self.is_settled() {
            lock(&self.connection).take();
            return false;
        }
        true
    }

    pub fn connection(&self) -> Option<Arc<dyn Connection>> {
        lock(&self.connection).clone()
    }

    pub fn take_connection(&self) -> Option<Arc<dyn Connection>> {
        lock(&self.connection).take()
    }

    /// Assign the outcome. Only the first call has any effect.
    pub fn settle(&self, result: RecognitionResult) -> bool {
        let won = self.settlement.settle(result);
        if won {
            *lock(&self.state) = SessionState::Settled;
        }
        won
    }

    pub fn is_settled(&self) -> bool {
        self.settlement.is_settled()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("audio_len", &self.audio_len)
            .field("created_at", &self.created_at)
            .finish()
    }
}
