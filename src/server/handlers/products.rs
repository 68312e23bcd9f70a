//! Product endpoints.

use axum::{
    extract::{Path, Query, State},
    response::Response,
};
use serde::Deserialize;

use super::super::AppState;
use super::helpers::{json_or_error, ForceParams, PageParams};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub category_id: Option<String>,
}

/// Products, newest first, optionally for one category.
pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<ProductListParams>,
) -> Response {
    let paging = PageParams {
        page: params.page,
        limit: params.limit,
    };
    let (page, limit) = match paging.resolve() {
        Ok(v) => v,
        Err(response) => return response,
    };
    json_or_error(
        state
            .catalog
            .products(page, limit, params.category_id.as_deref())
            .await,
    )
}

pub async fn product_by_id(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    json_or_error(state.catalog.product(&id).await)
}

/// Refresh the product's detail and return the product with its relations.
pub async fn scrape_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ForceParams>,
) -> Response {
    json_or_error(state.catalog.scrape_product(&id, params.force).await)
}
