pub mod asr;
pub mod audio;
pub mod config;
pub mod http;

pub use asr::{
    AsrSettings, Connection, ConnectionEvent, Connector, EventHandler, PendingRecognition,
    RecognitionError, RecognitionMode, SessionId, SessionManager, WsConnector,
};
pub use audio::{AudioFile, PcmAudio};
pub use config::Config;
pub use http::{create_router, AppState};
