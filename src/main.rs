use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use funasr_gateway::{create_router, AppState, AudioFile, Config, SessionManager, WsConnector};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "funasr-gateway", version, about = "HTTP gateway to a FunASR streaming recognition server")]
struct Cli {
    /// Configuration file (extension optional)
    #[arg(long, default_value = "config/funasr-gateway")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Recognize a local audio file and print the transcript
    Recognize {
        /// Audio file in any supported format
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!("ASR backend: {} (mode={})", cfg.asr.server_url, cfg.asr.mode);

    let connector = Arc::new(WsConnector::new(cfg.asr.connect_timeout()));
    let manager = SessionManager::new(connector, cfg.asr.settings());

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(cfg, manager).await,
        Command::Recognize { file } => recognize_file(&cfg, &manager, &file).await,
    }
}

async fn serve(cfg: Config, manager: SessionManager) -> Result<()> {
    let state = AppState::new(manager)
        .with_upload_dir(cfg.audio.upload_dir())
        .with_sample_rate(cfg.audio.sample_rate)
        .with_max_upload_bytes(cfg.service.http.max_upload_bytes);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP server listening on {}", addr);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("HTTP server stopped");
    Ok(())
}

async fn recognize_file(cfg: &Config, manager: &SessionManager, file: &Path) -> Result<()> {
    let path = file.to_path_buf();
    let sample_rate = cfg.audio.sample_rate;
    let audio = tokio::task::spawn_blocking(move || {
        AudioFile::open(&path)?.into_backend_audio(sample_rate)
    })
    .await
    .context("Audio conversion task panicked")??;

    let transcript = manager
        .recognize(audio)
        .await
        .with_context(|| format!("Failed to recognize {}", file.display()))?;

    println!("{}", transcript);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
