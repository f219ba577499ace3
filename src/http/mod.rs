//! HTTP entry point for recognition requests
//!
//! - POST /api/asr/recognize - Upload an audio file (multipart field `file`), get its transcript
//! - GET /health - Health check with the number of in-flight sessions

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
