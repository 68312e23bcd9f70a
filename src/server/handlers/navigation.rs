//! Navigation heading endpoints.

use axum::{
    extract::{Path, Query, State},
    response::Response,
};

use super::super::AppState;
use super::helpers::{json_or_error, ForceParams};

/// All headings. Scrapes the site menu when none are stored yet.
pub async fn list_navigation(State(state): State<AppState>) -> Response {
    json_or_error(state.catalog.navigation().await)
}

pub async fn navigation_by_slug(State(state): State<AppState>, Path(slug): Path<String>) -> Response {
    json_or_error(state.catalog.navigation_by_slug(&slug).await)
}

pub async fn scrape_navigation(
    State(state): State<AppState>,
    Query(params): Query<ForceParams>,
) -> Response {
    json_or_error(state.catalog.scraper().scrape_navigation(params.force).await)
}
