use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Recognition mode requested in the init message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RecognitionMode {
    #[default]
    #[serde(rename = "offline")]
    Offline,
    #[serde(rename = "online")]
    Online,
    #[serde(rename = "2pass")]
    TwoPass,
}

impl RecognitionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecognitionMode::Offline => "offline",
            RecognitionMode::Online => "online",
            RecognitionMode::TwoPass => "2pass",
        }
    }
}

impl fmt::Display for RecognitionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecognitionMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "offline" => Ok(RecognitionMode::Offline),
            "online" => Ok(RecognitionMode::Online),
            "2pass" => Ok(RecognitionMode::TwoPass),
            other => anyhow::bail!("Unknown recognition mode: {} (expected offline, online or 2pass)", other),
        }
    }
}

/// First text frame sent once the connection is open
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitMessage {
    pub mode: RecognitionMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hot_words: Option<String>,
}

impl InitMessage {
    /// Empty hot-word lists are left out of the message entirely.
    pub fn new(mode: RecognitionMode, hot_words: Option<&str>) -> Self {
        Self {
            mode,
            hot_words: hot_words
                .filter(|words| !words.is_empty())
                .map(str::to_string),
        }
    }
}

/// End-of-stream signal sent after the last audio chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndMessage {
    pub end: bool,
}

impl Default for EndMessage {
    fn default() -> Self {
        Self { end: true }
    }
}

/// Result message received from the backend
///
/// Only `text` and `is_final` drive the session; the backend's other fields
/// (`mode`, `wav_name`, timestamps) are accepted and ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerMessage {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub is_final: bool,
}
