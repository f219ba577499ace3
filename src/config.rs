use crate::asr::{AsrSettings, RecognitionMode};
use anyhow::{ensure, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

const ENV_PREFIX: &str = "FUNASR_GATEWAY";

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub asr: AsrConfig,
    pub audio: AudioConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Deserialize)]
pub struct AsrConfig {
    pub server_url: String,
    pub mode: RecognitionMode,
    pub hot_words: Option<String>,
    pub chunk_size: usize,
    pub chunk_interval_ms: u64,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub cancel_on_timeout: bool,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    /// Where uploads are kept; not persisted when unset
    pub upload_dir: Option<String>,
    pub sample_rate: u32,
}

impl AsrConfig {
    pub fn settings(&self) -> AsrSettings {
        AsrSettings {
            server_url: self.server_url.clone(),
            mode: self.mode,
            hot_words: self.hot_words.clone().filter(|words| !words.is_empty()),
            chunk_size: self.chunk_size,
            chunk_interval: Duration::from_millis(self.chunk_interval_ms),
            timeout: Duration::from_secs(self.timeout_secs),
            cancel_on_timeout: self.cancel_on_timeout,
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl AudioConfig {
    pub fn upload_dir(&self) -> Option<PathBuf> {
        self.upload_dir
            .as_deref()
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
    }
}

impl Config {
    /// Defaults, then the optional file at `path`, then `FUNASR_GATEWAY__*` env vars.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("service.name", "funasr-gateway")?
            .set_default("service.http.bind", "0.0.0.0")?
            .set_default("service.http.port", 8080)?
            .set_default("service.http.max_upload_bytes", 50 * 1024 * 1024)?
            .set_default("asr.server_url", "ws://127.0.0.1:10095")?
            .set_default("asr.mode", "offline")?
            .set_default("asr.chunk_size", 8192)?
            .set_default("asr.chunk_interval_ms", 10)?
            .set_default("asr.timeout_secs", 60)?
            .set_default("asr.connect_timeout_secs", 10)?
            .set_default("asr.cancel_on_timeout", true)?
            .set_default("audio.sample_rate", 16000)?
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: Config = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        ensure!(self.asr.chunk_size > 0, "asr.chunk_size must be greater than zero");
        ensure!(self.asr.timeout_secs > 0, "asr.timeout_secs must be greater than zero");
        ensure!(self.audio.sample_rate > 0, "audio.sample_rate must be greater than zero");
        ensure!(!self.asr.server_url.is_empty(), "asr.server_url must be set");
        Ok(())
    }
}
