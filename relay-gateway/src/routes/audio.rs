//! `GET|POST /v1/audio` — audio lookup with optional direct streaming.

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use relay_core::{require_param, Envelope};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{error::GatewayError, state::SharedState};

#[derive(Debug, Default, Deserialize)]
pub struct AudioParams {
    pub query: Option<String>,
    #[serde(default)]
    pub direct: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct AudioData {
    pub audio: AudioInfo,
    pub metadata: AudioMetadata,
    pub search_query: String,
}

#[derive(Debug, Serialize)]
pub struct AudioInfo {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AudioMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub views: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

/// `GET /v1/audio?query=...&direct=true`
///
/// # Errors
/// 400 without a query, 404 when the upstream has no downloadable audio,
/// 502 on upstream failure.
pub async fn lookup_query(
    State(state): State<SharedState>,
    Query(params): Query<AudioParams>,
) -> Result<Response, GatewayError> {
    lookup(&state, params).await
}

/// `POST /v1/audio` with a JSON body.
///
/// # Errors
/// Same as [`lookup_query`].
pub async fn lookup_body(
    State(state): State<SharedState>,
    Json(params): Json<AudioParams>,
) -> Result<Response, GatewayError> {
    lookup(&state, params).await
}

async fn lookup(state: &SharedState, params: AudioParams) -> Result<Response, GatewayError> {
    let query = require_param("query", params.query.as_deref())?;

    tracing::info!(query, "looking up audio");
    let value = state
        .client
        .get_json(
            &format!("{}/lookup", state.config.audio_base),
            &[("query", query)],
        )
        .await?;

    let Some(download_url) = value
        .pointer("/result/download/url")
        .and_then(Value::as_str)
        .map(str::to_owned)
    else {
        return Err(GatewayError::NotFound(
            "audio not found or download unavailable".to_owned(),
        ));
    };

    let str_at = |path: &str| -> Option<String> {
        value.pointer(path).and_then(Value::as_str).map(str::to_owned)
    };
    let title = str_at("/result/metadata/title");

    // direct=true streams the bytes back; a failed fetch falls back to the
    // JSON answer instead of erroring.
    if params.direct == Some(true) {
        match state.client.get_bytes(&download_url).await {
            Ok((bytes, content_type)) => {
                let filename = title.as_deref().unwrap_or("audio");
                let headers = [
                    (
                        header::CONTENT_TYPE,
                        content_type.unwrap_or_else(|| "audio/mpeg".to_owned()),
                    ),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("inline; filename=\"{filename}.mp3\""),
                    ),
                    (header::CACHE_CONTROL, "public, max-age=3600".to_owned()),
                ];
                return Ok((headers, bytes).into_response());
            }
            Err(e) => {
                tracing::warn!(error = %e, "direct stream failed, falling back to metadata");
            }
        }
    }

    let data = AudioData {
        audio: AudioInfo {
            url: download_url,
            quality: str_at("/result/download/quality"),
            filename: str_at("/result/download/filename"),
        },
        metadata: AudioMetadata {
            title,
            artist: str_at("/result/metadata/author/name"),
            thumbnail: str_at("/result/metadata/thumbnail"),
            duration: str_at("/result/metadata/timestamp"),
            views: value.pointer("/result/metadata/views").and_then(Value::as_u64),
            source_url: str_at("/result/metadata/url"),
        },
        search_query: query.to_owned(),
    };

    Ok(Json(Envelope::ok(data)).into_response())
}
