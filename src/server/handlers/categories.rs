//! Category endpoints.

use axum::{
    extract::{Path, Query, State},
    response::Response,
};

use super::super::AppState;
use super::helpers::{json_or_error, ForceParams, PageParams};

pub async fn list_categories(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Response {
    let (page, limit) = match params.resolve() {
        Ok(v) => v,
        Err(response) => return response,
    };
    json_or_error(state.catalog.categories(page, limit).await)
}

pub async fn category_by_slug(State(state): State<AppState>, Path(slug): Path<String>) -> Response {
    json_or_error(state.catalog.category_by_slug(&slug).await)
}

pub async fn scrape_category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(params): Query<ForceParams>,
) -> Response {
    json_or_error(state.catalog.scrape_category(&slug, params.force).await)
}

/// Scrape one listing page of the category's products.
pub async fn scrape_category_products(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(params): Query<PageParams>,
) -> Response {
    let (page, limit) = match params.resolve() {
        Ok(v) => v,
        Err(response) => return response,
    };
    json_or_error(
        state
            .catalog
            .scrape_category_products(&slug, page, limit)
            .await,
    )
}
