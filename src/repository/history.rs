//! View history repository.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::models::ViewHistoryRecord;
use super::pool::{DbError, DbPool};
use super::util::{format_datetime, parse_datetime};
use crate::models::ViewHistory;
use crate::schema::view_history;
use crate::with_conn;

/// Number of entries returned for a session.
pub const HISTORY_LIMIT: i64 = 50;

impl From<ViewHistoryRecord> for ViewHistory {
    fn from(record: ViewHistoryRecord) -> Self {
        ViewHistory {
            id: record.id,
            session_id: record.session_id,
            user_id: record.user_id,
            path_json: serde_json::from_str(&record.path_json).unwrap_or_default(),
            created_at: parse_datetime(&record.created_at),
        }
    }
}

#[derive(Clone)]
pub struct HistoryRepository {
    pool: DbPool,
}

impl HistoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Store a history entry.
    pub async fn record(&self, entry: &ViewHistory) -> Result<(), DbError> {
        let path_json = serde_json::to_string(&entry.path_json).unwrap_or_else(|_| "{}".to_string());
        let created_at = format_datetime(&entry.created_at);

        with_conn!(self.pool, conn => {
            diesel::insert_into(view_history::table)
                .values((
                    view_history::id.eq(&entry.id),
                    view_history::session_id.eq(&entry.session_id),
                    view_history::user_id.eq(&entry.user_id),
                    view_history::path_json.eq(&path_json),
                    view_history::created_at.eq(&created_at),
                ))
                .execute(&mut conn)
                .await
        })?;
        Ok(())
    }

    /// Latest entries for a session, newest first, optionally narrowed to a user.
    pub async fn for_session(
        &self,
        session_id: &str,
        user_id: Option<&str>,
    ) -> Result<Vec<ViewHistory>, DbError> {
        let records: Vec<ViewHistoryRecord> = with_conn!(self.pool, conn => {
            match user_id {
                Some(user) => {
                    view_history::table
                        .filter(view_history::session_id.eq(session_id))
                        .filter(view_history::user_id.eq(user))
                        .order(view_history::created_at.desc())
                        .limit(HISTORY_LIMIT)
                        .load::<ViewHistoryRecord>(&mut conn)
                        .await
                }
                None => {
                    view_history::table
                        .filter(view_history::session_id.eq(session_id))
                        .order(view_history::created_at.desc())
                        .limit(HISTORY_LIMIT)
                        .load::<ViewHistoryRecord>(&mut conn)
                        .await
                }
            }
        })?;
        Ok(records.into_iter().map(ViewHistory::from).collect())
    }
}
