//! `GET|POST /v1/quote` — text rendered into a quote image, streamed back
//! as raw bytes.

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{FixedOffset, Utc};
use rand::Rng;
use relay_core::require_param;
use serde::Deserialize;

use crate::{error::GatewayError, state::SharedState};

#[derive(Debug, Default, Deserialize)]
pub struct QuoteParams {
    pub text: Option<String>,
}

/// `GET /v1/quote?text=...`
///
/// # Errors
/// 400 without text, 502 when the maker upstream fails.
pub async fn render_query(
    State(state): State<SharedState>,
    Query(params): Query<QuoteParams>,
) -> Result<Response, GatewayError> {
    render(&state, params).await
}

/// `POST /v1/quote` with a JSON body.
///
/// # Errors
/// Same as [`render_query`].
pub async fn render_body(
    State(state): State<SharedState>,
    Json(params): Json<QuoteParams>,
) -> Result<Response, GatewayError> {
    render(&state, params).await
}

async fn render(state: &SharedState, params: QuoteParams) -> Result<Response, GatewayError> {
    let text = require_param("text", params.text.as_deref())?;

    // The maker renders a fake phone screenshot: wall clock in UTC+7 to
    // match the configured carrier, battery level randomised per request.
    let jakarta = FixedOffset::east_opt(7 * 3600)
        .expect("UTC+7 is a valid offset");
    let time = Utc::now().with_timezone(&jakarta).format("%H:%M").to_string();
    let battery = rand::rng().random_range(1..=100u32).to_string();

    let (bytes, content_type) = state
        .client
        .send_bytes(
            state
                .client
                .raw()
                .get(format!("{}/quote", state.config.maker_base))
                .query(&[
                    ("time", time.as_str()),
                    ("batteryPercentage", battery.as_str()),
                    ("carrierName", state.config.carrier_name.as_str()),
                    ("messageText", text),
                    ("emojiStyle", "apple"),
                ]),
        )
        .await?;

    let headers = [(
        header::CONTENT_TYPE,
        content_type.unwrap_or_else(|| "image/png".to_owned()),
    )];
    Ok((headers, bytes).into_response())
}
