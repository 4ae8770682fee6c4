//! Router assembly

use crate::api::{handlers, sse};
use crate::content::ChapterStore;
use crate::gemini::GeminiClient;
use crate::playback::Sequencer;
use crate::state::SharedState;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared handler context
#[derive(Clone)]
pub struct AppContext {
    pub state: Arc<SharedState>,
    pub sequencer: Sequencer,
    pub gemini: GeminiClient,
    pub store: Arc<ChapterStore>,
}

pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/chapter/:book/:chapter", get(handlers::get_chapter))
        .route("/voices", get(handlers::list_voices))
        .route("/playback/play", post(handlers::play))
        .route("/playback/pause", post(handlers::pause))
        .route("/playback/resume", post(handlers::resume))
        .route("/playback/stop", post(handlers::stop))
        .route("/playback/verse", post(handlers::play_verse))
        .route("/playback/voice", post(handlers::set_voice))
        .route("/playback/state", get(handlers::playback_state))
        .route("/events", get(sse::event_stream))
        .route("/assistant", post(handlers::ask_assistant))
        .route("/cover", post(handlers::generate_cover))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
