//! `GET|POST /v1/media` — resolve a share link into direct media URLs.
//!
//! The resolver site works like a form: fetch the page to pick up the
//! anti-CSRF token, post the share link back with it, then pull the
//! download links out of the result markup.

use axum::{
    extract::{Query, State},
    Json,
};
use relay_core::{require_param, CoreError, Envelope};
use relay_upstream::{form_token, media_links};
use serde::{Deserialize, Serialize};

use crate::{error::GatewayError, state::SharedState};

#[derive(Debug, Default, Deserialize)]
pub struct MediaParams {
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MediaData {
    pub links: Vec<String>,
    pub count: usize,
    pub source_url: String,
}

/// `GET /v1/media?url=...`
///
/// # Errors
/// 400 for a missing or non-HTTP url, 404 when the resolver page lacks the
/// token or yields no links, 502 when the resolver site is down.
pub async fn resolve_query(
    State(state): State<SharedState>,
    Query(params): Query<MediaParams>,
) -> Result<Json<Envelope<MediaData>>, GatewayError> {
    resolve(&state, params).await
}

/// `POST /v1/media` with a JSON body.
///
/// # Errors
/// Same as [`resolve_query`].
pub async fn resolve_body(
    State(state): State<SharedState>,
    Json(params): Json<MediaParams>,
) -> Result<Json<Envelope<MediaData>>, GatewayError> {
    resolve(&state, params).await
}

async fn resolve(
    state: &SharedState,
    params: MediaParams,
) -> Result<Json<Envelope<MediaData>>, GatewayError> {
    let url = require_param("url", params.url.as_deref())?;
    if !url.starts_with("http") {
        return Err(GatewayError::Invalid(CoreError::InvalidParameter {
            name: "url".to_owned(),
            reason: "must be an http(s) link".to_owned(),
        }));
    }

    let base = &state.config.resolver_base;

    tracing::info!(url, "resolving media link");
    let form_page = state.client.get_text(&format!("{base}/form"), &[]).await?;
    let token = form_token(&form_page)?;

    let result_page = state
        .client
        .send_text(
            state
                .client
                .raw()
                .post(format!("{base}/resolve"))
                .form(&[("url", url), ("token", token.as_str())]),
        )
        .await?;

    let links = media_links(&result_page, base);
    if links.is_empty() {
        return Err(GatewayError::NotFound(
            "no downloadable media found for the given link".to_owned(),
        ));
    }

    Ok(Json(Envelope::ok(MediaData {
        count: links.len(),
        links,
        source_url: url.to_owned(),
    })))
}
