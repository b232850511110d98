//! Router assembly and the liveness endpoint.

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::SharedState;

pub mod audio;
pub mod catalog;
pub mod cdn;
pub mod chat;
pub mod image;
pub mod media;
pub mod quote;
pub mod search;

/// Multipart framing overhead allowed on top of the file cap.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Build the application router with the given state.
pub fn create_router(state: SharedState) -> Router {
    let body_limit = state.config.upload_cap + MULTIPART_OVERHEAD;
    Router::new()
        .route("/health", get(health))
        .route("/v1/cdn", get(cdn::info).post(cdn::upload))
        .route("/v1/chat", get(chat::ask_query).post(chat::ask_body))
        .route("/v1/search", get(search::search_query).post(search::search_body))
        .route("/v1/catalog/search", get(catalog::search))
        .route("/v1/audio", get(audio::lookup_query).post(audio::lookup_body))
        .route(
            "/v1/image/generate",
            get(image::generate_query).post(image::generate_body),
        )
        .route("/v1/image/edit", post(image::edit))
        .route("/v1/media", get(media::resolve_query).post(media::resolve_body))
        .route("/v1/quote", get(quote::render_query).post(quote::render_body))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// `GET /health` — liveness probe.
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({"status": "ok"})))
}
