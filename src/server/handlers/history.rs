//! Browsing history endpoints.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use super::super::AppState;
use super::helpers::{bad_request, error_response, json_or_error};
use crate::models::ViewHistory;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryParams {
    pub session_id: Option<String>,
    pub user_id: Option<String>,
}

/// Last entries for a session, newest first.
pub async fn list_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Response {
    let Some(session_id) = params.session_id.filter(|s| !s.is_empty()) else {
        return bad_request("sessionId is required");
    };
    json_or_error(
        state
            .catalog
            .history(&session_id, params.user_id.as_deref())
            .await,
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHistory {
    pub session_id: String,
    pub user_id: Option<String>,
    pub path_json: serde_json::Value,
}

pub async fn record_history(
    State(state): State<AppState>,
    payload: Result<Json<CreateHistory>, JsonRejection>,
) -> Response {
    let Json(body) = match payload {
        Ok(body) => body,
        Err(rejection) => return bad_request(&rejection.body_text()),
    };
    if body.session_id.is_empty() {
        return bad_request("sessionId is required");
    }
    if !body.path_json.is_object() {
        return bad_request("pathJson must be an object");
    }

    let entry = ViewHistory::new(body.session_id, body.user_id, body.path_json);
    match state.catalog.record_history(entry).await {
        Ok(saved) => (StatusCode::CREATED, Json(saved)).into_response(),
        Err(e) => error_response(e),
    }
}
