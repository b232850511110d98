//! `GET|POST /v1/cdn` — provider catalogue and upload with fallback.

use axum::{
    extract::{Multipart, State},
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use relay_core::Envelope;
use relay_upstream::UploadPayload;
use serde::Serialize;

use crate::{error::GatewayError, state::SharedState};

#[derive(Debug, Serialize)]
struct ProviderInfo {
    name: String,
    expires: String,
    max_file_size: String,
}

/// `GET /v1/cdn` — describe the configured providers and how to upload.
pub async fn info(State(state): State<SharedState>) -> impl IntoResponse {
    let max_mb = state.config.upload_cap / (1024 * 1024);
    let providers: Vec<ProviderInfo> = state
        .uploader
        .hosts()
        .map(|host| ProviderInfo {
            name: host.name().to_owned(),
            expires: host.expiry().to_owned(),
            max_file_size: format!("{max_mb}MB"),
        })
        .collect();
    let names: Vec<String> = providers.iter().map(|p| p.name.clone()).collect();

    Json(Envelope::ok(serde_json::json!({
        "providers": providers,
        "usage": {
            "post": "upload a file as multipart/form-data",
            "parameters": {
                "file": "the file to upload",
                "provider": format!("preferred provider (optional): {}", names.join(", ")),
            },
        },
    })))
}

#[derive(Debug, Serialize)]
pub struct UploadData {
    pub filename: String,
    pub size: usize,
    pub content_type: String,
    pub sha256: String,
    pub url: String,
    pub provider: String,
    pub expires: String,
}

/// `POST /v1/cdn` — multipart upload pushed through the fallback chain.
///
/// # Errors
/// 400 without a `file` part, 413 past the size cap, 502 when every host
/// rejects the payload.
pub async fn upload(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, GatewayError> {
    let mut file: Option<(Option<String>, String, Bytes)> = None;
    let mut preferred: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| GatewayError::BadUpload(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().map(ToOwned::to_owned);
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_owned();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| GatewayError::BadUpload(e.to_string()))?;
                file = Some((filename, content_type, bytes));
            }
            "provider" => {
                preferred = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| GatewayError::BadUpload(e.to_string()))?,
                );
            }
            _ => {}
        }
    }

    let Some((filename, content_type, bytes)) = file else {
        return Err(GatewayError::BadUpload("file field is required".to_owned()));
    };
    if bytes.len() > state.config.upload_cap {
        return Err(GatewayError::PayloadTooLarge { limit: state.config.upload_cap });
    }

    let payload = UploadPayload::new(filename, content_type, bytes);
    tracing::info!(file = %payload.filename, size = payload.size(), "uploading file");

    let hosted = state
        .uploader
        .upload(&state.client, &payload, preferred.as_deref())
        .await?;

    Ok(Json(Envelope::ok(UploadData {
        filename: payload.filename.clone(),
        size: payload.size(),
        content_type: payload.content_type.clone(),
        sha256: payload.sha256_hex(),
        url: hosted.url,
        provider: hosted.provider,
        expires: hosted.expires,
    })))
}
