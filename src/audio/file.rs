use super::decode;
use super::pcm::PcmAudio;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// An audio file read from disk, not yet decoded
pub struct AudioFile {
    pub path: PathBuf,
    pub data: Vec<u8>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read audio file: {}", path.display()))?;

        Ok(Self {
            path: path.to_path_buf(),
            data,
        })
    }

    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|ext| ext.to_str())
    }

    /// Decode to interleaved 16-bit PCM at the file's own rate and layout
    pub fn decode(&self) -> Result<PcmAudio> {
        let pcm = decode::decode(&self.data, self.extension())
            .with_context(|| format!("Failed to decode audio file: {}", self.path.display()))?;

        info!(
            "Audio file decoded: {:.1}s, {}Hz, {} channels",
            pcm.duration_seconds(),
            pcm.sample_rate,
            pcm.channels
        );

        Ok(pcm)
    }

    /// The bytes to stream to the backend, converted the same way as an upload
    pub fn into_backend_audio(self, sample_rate: u32) -> Result<Vec<u8>> {
        let extension = self.extension().map(str::to_string);
        let path = self.path;
        decode::prepare(self.data, extension.as_deref(), sample_rate)
            .with_context(|| format!("Failed to convert audio file: {}", path.display()))
    }
}
