//! Browsing history entries recorded by the frontend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single recorded navigation path for a browsing session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewHistory {
    pub id: String,
    pub session_id: String,
    pub user_id: Option<String>,
    pub path_json: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl ViewHistory {
    pub fn new(session_id: String, user_id: Option<String>, path_json: serde_json::Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id,
            user_id,
            path_json,
            created_at: Utc::now(),
        }
    }
}
