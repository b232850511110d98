//! `GET|POST /v1/search` — search relay with typed reshaping.

use axum::{
    extract::{Query, State},
    Json,
};
use relay_core::{require_bounded, Envelope};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{error::GatewayError, state::SharedState};

/// Queries longer than this are rejected outright.
const MAX_QUERY_CHARS: usize = 500;

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
}

/// One reshaped search result. Unknown upstream fields are dropped; absent
/// optional fields are omitted from the response.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub title: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub views: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<SearchAuthor>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchAuthor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchData {
    pub count: usize,
    pub results: Vec<SearchResult>,
}

/// `GET /v1/search?query=...`
///
/// # Errors
/// 400 for a missing or over-long query, 404 when nothing matches, 502 on
/// upstream failure.
pub async fn search_query(
    State(state): State<SharedState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Envelope<SearchData>>, GatewayError> {
    run_search(&state, params).await
}

/// `POST /v1/search` with a JSON body.
///
/// # Errors
/// Same as [`search_query`].
pub async fn search_body(
    State(state): State<SharedState>,
    Json(params): Json<SearchParams>,
) -> Result<Json<Envelope<SearchData>>, GatewayError> {
    run_search(&state, params).await
}

async fn run_search(
    state: &SharedState,
    params: SearchParams,
) -> Result<Json<Envelope<SearchData>>, GatewayError> {
    let query = require_bounded("query", params.query.as_deref(), MAX_QUERY_CHARS)?;

    tracing::info!(query, "searching upstream");
    let value = state
        .client
        .get_json(
            &format!("{}/search", state.config.search_base),
            &[("query", query)],
        )
        .await?;

    let results: Vec<SearchResult> = value
        .get("results")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default();

    if results.is_empty() {
        return Err(GatewayError::NotFound(
            "no results found for the given query".to_owned(),
        ));
    }

    Ok(Json(Envelope::ok(SearchData { count: results.len(), results })))
}
