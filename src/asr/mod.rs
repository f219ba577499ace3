//! Streaming recognition session management
//!
//! Bridges a call-and-return `recognize(audio) -> text` API onto the FunASR
//! WebSocket sub-protocol:
//! - one connection per request, opened through a [`Connector`]
//! - init message, 8 KiB binary audio frames, `{"end": true}`
//! - `text` fragments accumulated until `is_final`, a close, or an error
//! - every session settles exactly once and is cleaned up exactly once

mod config;
mod connection;
mod error;
mod handler;
mod manager;
mod messages;
mod registry;
mod session;
mod settlement;
mod ws;

pub use config::AsrSettings;
pub use connection::{CloseReason, Connection, ConnectionEvent, Connector, EventHandler};
pub use error::RecognitionError;
pub use manager::{chunk_audio, PendingRecognition, SessionManager};
pub use messages::{EndMessage, InitMessage, RecognitionMode, ServerMessage};
pub use registry::SessionRegistry;
pub use session::{Session, SessionId, SessionState};
pub use settlement::{RecognitionResult, Settlement, SettlementReceiver};
pub use ws::WsConnector;
