//! Health and scrape job audit endpoints.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use super::super::AppState;
use super::helpers::{bad_request, json_or_error};
use crate::models::ScrapeJobStatus;

const DEFAULT_JOB_LIMIT: u32 = 50;

/// Health check endpoint for container orchestration.
pub async fn health() -> impl IntoResponse {
    StatusCode::OK
}

#[derive(Debug, Deserialize)]
pub struct JobParams {
    pub limit: Option<u32>,
    pub status: Option<String>,
}

/// Recent scrape jobs, newest first.
pub async fn list_jobs(State(state): State<AppState>, Query(params): Query<JobParams>) -> Response {
    let status = match params.status.as_deref() {
        Some(s) => match ScrapeJobStatus::from_str(s) {
            Some(status) => Some(status),
            None => return bad_request(&format!("unknown job status: {s}")),
        },
        None => None,
    };
    let limit = params.limit.unwrap_or(DEFAULT_JOB_LIMIT).clamp(1, 500);

    json_or_error(state.catalog.jobs(limit, status).await)
}
