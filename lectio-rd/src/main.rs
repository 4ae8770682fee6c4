//! Bible Reader service (lectio-rd) - Main entry point
//!
//! Hosts the verse playback engine and its HTTP + SSE control surface.
//! Chapter text and verse audio come from the Gemini API; playback goes
//! out through the default audio device.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lectio_common::config::TomlConfig;
use lectio_common::types::{default_voice, find_voice};
use lectio_rd::api::{create_router, AppContext};
use lectio_rd::audio::{AudioSink, CpalSink};
use lectio_rd::config::Config;
use lectio_rd::content::ChapterStore;
use lectio_rd::gemini::{GeminiClient, VerseAudioSource};
use lectio_rd::playback::Sequencer;
use lectio_rd::state::SharedState;

/// Command-line arguments for lectio-rd
#[derive(Parser, Debug)]
#[command(name = "lectio-rd")]
#[command(about = "Bible reading service with per-verse TTS playback")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "LECTIO_PORT")]
    port: Option<u16>,

    /// Data directory for cached chapter text
    #[arg(short, long, env = "LECTIO_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Default reading voice
    #[arg(long, env = "LECTIO_VOICE")]
    voice: Option<String>,

    /// Prefetch lookahead window in verses
    #[arg(long, env = "LECTIO_LOOKAHEAD")]
    lookahead: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lectio_rd=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!(
        "Starting lectio-rd {} ({}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_PROFILE")
    );

    let file_config = TomlConfig::load_default();
    let config = Config::resolve(
        &file_config,
        args.port,
        args.data_dir,
        args.lookahead,
        args.voice,
        args.api_key,
    );

    info!("Data directory: {}", config.data_dir.display());
    if config.api_key.is_none() {
        warn!("No Gemini API key configured; content requests will fail until one is provided");
    }

    let voice = find_voice(&config.default_voice)
        .unwrap_or_else(|| {
            warn!("Unknown voice '{}', using default", config.default_voice);
            default_voice()
        })
        .clone();

    let gemini = GeminiClient::new(config.api_key.clone());
    let store =
        Arc::new(ChapterStore::open(&config.data_dir).context("Failed to open chapter store")?);
    let state = Arc::new(SharedState::new());
    let sink = Arc::new(CpalSink::new());
    let sequencer = Sequencer::new(
        Arc::clone(&state),
        Arc::clone(&sink) as Arc<dyn AudioSink>,
        Arc::new(gemini.clone()) as Arc<dyn VerseAudioSource>,
        voice,
        config.lookahead,
    );
    info!("Playback engine initialized (lookahead {})", config.lookahead);

    let ctx = AppContext {
        state,
        sequencer: sequencer.clone(),
        gemini,
        store,
    };
    let app = create_router(ctx);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    sequencer.stop().await;
    sink.close();
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down");
        }
    }
}
