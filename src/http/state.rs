use crate::asr::SessionManager;
use std::path::PathBuf;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Recognition sessions
    pub manager: SessionManager,

    /// Where uploads are kept, if anywhere
    pub upload_dir: Option<PathBuf>,

    /// Sample rate uploads are converted to before streaming
    pub sample_rate: u32,

    /// Request body limit for uploads
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(manager: SessionManager) -> Self {
        Self {
            manager,
            upload_dir: None,
            sample_rate: 16000,
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }

    pub fn with_upload_dir(mut self, upload_dir: Option<PathBuf>) -> Self {
        self.upload_dir = upload_dir;
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }
}
