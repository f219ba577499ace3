use super::messages::RecognitionMode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings shared by every session of a [`SessionManager`](super::SessionManager)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsrSettings {
    /// Backend endpoint, e.g. "ws://127.0.0.1:10095"
    pub server_url: String,

    /// Recognition mode sent in the init message
    pub mode: RecognitionMode,

    /// Hot words sent in the init message, if any
    pub hot_words: Option<String>,

    /// Size of each binary audio frame in bytes
    /// Default: 8192
    pub chunk_size: usize,

    /// Pause between consecutive audio frames
    pub chunk_interval: Duration,

    /// How long `recognize` waits for settlement
    /// Default: 60 seconds
    pub timeout: Duration,

    /// Clean up the session when the caller times out instead of letting it
    /// run until the backend closes it
    pub cancel_on_timeout: bool,
}

impl Default for AsrSettings {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:10095".to_string(),
            mode: RecognitionMode::Offline,
            hot_words: None,
            chunk_size: 8192,
            chunk_interval: Duration::from_millis(10),
            timeout: Duration::from_secs(60),
            cancel_on_timeout: true,
        }
    }
}
