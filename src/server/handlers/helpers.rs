//! Shared query types and error responses for handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::error;

use crate::services::ScrapeError;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 20;
pub const MAX_LIMIT: u32 = 100;

/// `?page&limit` for listings.
#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageParams {
    /// Page and limit with defaults applied, or a 400 response.
    pub fn resolve(&self) -> Result<(u32, u32), Response> {
        let page = self.page.unwrap_or(DEFAULT_PAGE);
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT);
        if page == 0 {
            return Err(bad_request("page must be at least 1"));
        }
        if limit == 0 || limit > MAX_LIMIT {
            return Err(bad_request(&format!("limit must be between 1 and {MAX_LIMIT}")));
        }
        Ok((page, limit))
    }
}

/// `?force` for scrape triggers.
#[derive(Debug, Deserialize)]
pub struct ForceParams {
    #[serde(default)]
    pub force: bool,
}

pub fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

/// Map a service error onto a JSON error response.
pub fn error_response(e: ScrapeError) -> Response {
    let status = if e.is_not_found() {
        StatusCode::NOT_FOUND
    } else if matches!(e, ScrapeError::InvalidInput(_)) {
        StatusCode::BAD_REQUEST
    } else {
        error!("Request failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(serde_json::json!({ "error": e.to_string() }))).into_response()
}

/// Serialize a service result as JSON, or its error.
pub fn json_or_error<T: serde::Serialize>(result: Result<T, ScrapeError>) -> Response {
    match result {
        Ok(value) => Json(value).into_response(),
        Err(e) => error_response(e),
    }
}
