//! `GET|POST /v1/chat` — breaker-guarded chat relay.

use axum::{
    extract::{Query, State},
    Json,
};
use relay_core::{require_param, CleanMode, Envelope};
use serde::{Deserialize, Serialize};

use crate::{error::GatewayError, state::SharedState};

/// Accepted parameter aliases: `q`, `message`, and `text` all name the
/// message, matching the callers this endpoint inherited.
#[derive(Debug, Default, Deserialize)]
pub struct ChatParams {
    pub q: Option<String>,
    pub message: Option<String>,
    pub text: Option<String>,
    pub mode: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatData {
    pub reply: String,
    pub meta: ChatMeta,
}

#[derive(Debug, Serialize)]
pub struct ChatMeta {
    pub original_length: usize,
    pub cleaned_length: usize,
}

/// `GET /v1/chat?q=...`
///
/// # Errors
/// 400 without a message, 503 while the breaker is open, 502 when the
/// upstream keeps failing.
pub async fn ask_query(
    State(state): State<SharedState>,
    Query(params): Query<ChatParams>,
) -> Result<Json<Envelope<ChatData>>, GatewayError> {
    ask(&state, params).await
}

/// `POST /v1/chat` with a JSON body.
///
/// # Errors
/// Same as [`ask_query`].
pub async fn ask_body(
    State(state): State<SharedState>,
    Json(params): Json<ChatParams>,
) -> Result<Json<Envelope<ChatData>>, GatewayError> {
    ask(&state, params).await
}

async fn ask(
    state: &SharedState,
    params: ChatParams,
) -> Result<Json<Envelope<ChatData>>, GatewayError> {
    let message = params
        .q
        .as_deref()
        .or(params.message.as_deref())
        .or(params.text.as_deref());
    let message = require_param("q", message)?;
    let mode = params
        .mode
        .as_deref()
        .map(str::parse::<CleanMode>)
        .transpose()?;

    tracing::info!(chars = message.chars().count(), "relaying chat message");
    let reply = state.chat.ask(message, mode).await?;

    Ok(Json(Envelope::ok(ChatData {
        meta: ChatMeta {
            original_length: reply.original_len,
            cleaned_length: reply.cleaned_len,
        },
        reply: reply.text,
    })))
}
