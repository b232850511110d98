//! `GET|POST /v1/image/generate` and `POST /v1/image/edit`.

use axum::{
    extract::{Multipart, Query, State},
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bytes::Bytes;
use relay_core::{require_param, CoreError, Envelope};
use relay_upstream::{EditJobRequest, UploadPayload};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{error::GatewayError, state::SharedState};

/// Aspect ratios the generation upstream accepts.
const VALID_RATIOS: [&str; 3] = ["1:1", "16:9", "9:16"];

#[derive(Debug, Default, Deserialize)]
pub struct GenerateParams {
    pub prompt: Option<String>,
    pub ratio: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateData {
    pub source: Value,
    pub images: ImageLinks,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ImageLinks {
    pub url: String,
    /// Base64 data URL of the produced image; omitted when the image bytes
    /// could not be fetched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
}

/// `GET /v1/image/generate?prompt=...&ratio=16:9`
///
/// # Errors
/// 400 for a missing prompt or unknown ratio, 502 on upstream failure.
pub async fn generate_query(
    State(state): State<SharedState>,
    Query(params): Query<GenerateParams>,
) -> Result<Json<Envelope<GenerateData>>, GatewayError> {
    generate(&state, params).await
}

/// `POST /v1/image/generate` with a JSON body.
///
/// # Errors
/// Same as [`generate_query`].
pub async fn generate_body(
    State(state): State<SharedState>,
    Json(params): Json<GenerateParams>,
) -> Result<Json<Envelope<GenerateData>>, GatewayError> {
    generate(&state, params).await
}

async fn generate(
    state: &SharedState,
    params: GenerateParams,
) -> Result<Json<Envelope<GenerateData>>, GatewayError> {
    let prompt = require_param("prompt", params.prompt.as_deref())?;
    let ratio = params.ratio.as_deref().unwrap_or("1:1");
    if !VALID_RATIOS.contains(&ratio) {
        return Err(GatewayError::Invalid(CoreError::InvalidParameter {
            name: "ratio".to_owned(),
            reason: format!("must be one of: {}", VALID_RATIOS.join(", ")),
        }));
    }

    tracing::info!(ratio, "generating image");
    let value = state
        .client
        .get_json(
            &format!("{}/generate", state.config.generate_base),
            &[("prompt", prompt), ("ratio", ratio)],
        )
        .await?;

    let image_url = value
        .get("result")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| {
            GatewayError::Upstream(relay_upstream::UpstreamError::Decode(
                "generation response missing result URL".to_owned(),
            ))
        })?;
    let model = value.get("model").and_then(Value::as_str).map(str::to_owned);

    // Embedding the image is best-effort: a fetch failure degrades to
    // URL-only instead of failing the request.
    let base64 = match state.client.get_bytes(&image_url).await {
        Ok((bytes, content_type)) => Some(format!(
            "data:{};base64,{}",
            content_type.unwrap_or_else(|| "image/webp".to_owned()),
            BASE64.encode(&bytes)
        )),
        Err(e) => {
            tracing::warn!(error = %e, "could not embed generated image");
            None
        }
    };

    Ok(Json(Envelope::ok(GenerateData {
        images: ImageLinks { url: image_url, base64 },
        model,
        source: value,
    })))
}

#[derive(Debug, Serialize)]
pub struct EditData {
    pub result: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload: Option<UploadInfo>,
}

#[derive(Debug, Serialize)]
pub struct UploadInfo {
    pub url: String,
    pub provider: String,
    pub filename: String,
}

/// `POST /v1/image/edit` — multipart body with a required `prompt` and
/// either an `image` file part or an `image_url` text part. An uploaded
/// file is pushed through the CDN chain first so the edit upstream can
/// fetch it by URL.
///
/// # Errors
/// 400 for a missing prompt/image or a non-image file, 413 past the image
/// cap, 502 when the CDN chain or the edit upstream fails.
pub async fn edit(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Json<Envelope<EditData>>, GatewayError> {
    let mut prompt: Option<String> = None;
    let mut image_url: Option<String> = None;
    let mut file: Option<(Option<String>, String, Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| GatewayError::BadUpload(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            "prompt" => {
                prompt = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| GatewayError::BadUpload(e.to_string()))?,
                );
            }
            "image_url" => {
                image_url = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| GatewayError::BadUpload(e.to_string()))?,
                );
            }
            "image" => {
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
            _ => {}
        }
    }

    let prompt = require_param("prompt", prompt.as_deref())?.to_owned();

    let mut upload = None;
    let image_url = if let Some((filename, content_type, bytes)) = file {
        if !content_type.starts_with("image/") {
            return Err(GatewayError::BadUpload(format!(
                "invalid file type: {content_type}; expected an image"
            )));
        }
        if bytes.len() > state.config.image_cap {
            return Err(GatewayError::PayloadTooLarge { limit: state.config.image_cap });
        }

        let payload = UploadPayload::new(filename, content_type, bytes);
        tracing::info!(file = %payload.filename, "staging image on the CDN chain");
        let hosted = state.uploader.upload(&state.client, &payload, None).await?;
        upload = Some(UploadInfo {
            url: hosted.url.clone(),
            provider: hosted.provider,
            filename: payload.filename,
        });
        hosted.url
    } else {
        require_param("image_url", image_url.as_deref())?.to_owned()
    };

    let result = state
        .jobs
        .run(&EditJobRequest::new(image_url, prompt))
        .await?;

    Ok(Json(Envelope::ok(EditData { result, upload })))
}
