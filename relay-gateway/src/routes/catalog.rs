//! `GET /v1/catalog/search` — scraped catalog search.

use axum::{
    extract::{Query, State},
    Json,
};
use relay_core::{require_param, Envelope};
use relay_upstream::{catalog_items, catalog_pagination, CatalogItem, Pagination};
use serde::{Deserialize, Serialize};

use crate::{error::GatewayError, state::SharedState};

#[derive(Debug, Default, Deserialize)]
pub struct CatalogParams {
    pub query: Option<String>,
    pub page: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct CatalogData {
    pub items: Vec<CatalogItem>,
    pub pagination: Pagination,
}

/// `GET /v1/catalog/search?query=...&page=N`
///
/// An empty result list is a valid answer (an empty page, not a 404).
///
/// # Errors
/// 400 without a query, 502 when the catalog site cannot be fetched.
pub async fn search(
    State(state): State<SharedState>,
    Query(params): Query<CatalogParams>,
) -> Result<Json<Envelope<CatalogData>>, GatewayError> {
    let query = require_param("query", params.query.as_deref())?;
    let page = params.page.unwrap_or(1).max(1);

    tracing::info!(query, page, "scraping catalog search");
    let html = state
        .client
        .get_text(
            &format!("{}/search", state.config.catalog_base),
            &[("query", query), ("page", &page.to_string())],
        )
        .await?;

    let items = catalog_items(&html);
    let pagination = catalog_pagination(&html, page);

    Ok(Json(Envelope::ok(CatalogData { items, pagination })))
}
