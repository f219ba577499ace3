use std::time::Duration;
use thiserror::Error;

/// Why a recognition did not produce a transcript.
///
/// An abnormal close without a final marker is not represented here: it
/// settles successfully with the partial transcript.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecognitionError {
    /// Backend unreachable or handshake rejected. No audio was sent.
    #[error("Failed to connect to ASR backend: {0}")]
    Connect(String),

    /// Connection not open, closed mid-stream, or a frame could not be written.
    #[error("Failed to send to ASR backend: {0}")]
    Send(String),

    /// The connection reported an error while the session was in flight.
    #[error("ASR transport error: {0}")]
    Transport(String),

    /// The caller stopped waiting.
    #[error("Recognition timed out after {0:?}")]
    Timeout(Duration),

    /// The settlement slot was dropped without ever being assigned.
    #[error("Recognition abandoned before settlement")]
    Abandoned,
}
