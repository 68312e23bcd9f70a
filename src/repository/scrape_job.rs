//! Scrape job repository.
//!
//! Writes after the initial insert are guarded on the stored status so a job
//! that already reached a terminal state is never overwritten.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::models::ScrapeJobRecord;
use super::pool::{DbError, DbPool};
use super::util::{format_datetime, format_datetime_opt, parse_datetime, parse_datetime_opt};
use crate::models::{ScrapeJob, ScrapeJobStatus, ScrapeTargetType};
use crate::schema::scrape_job;
use crate::with_conn;

const OPEN_STATUSES: [&str; 2] = ["pending", "in_progress"];

impl From<ScrapeJobRecord> for ScrapeJob {
    fn from(record: ScrapeJobRecord) -> Self {
        ScrapeJob {
            id: record.id,
            target_url: record.target_url,
            target_type: ScrapeTargetType::from_str(&record.target_type)
                .unwrap_or(ScrapeTargetType::Navigation),
            status: ScrapeJobStatus::from_str(&record.status).unwrap_or(ScrapeJobStatus::Failed),
            started_at: parse_datetime_opt(record.started_at.as_deref()),
            finished_at: parse_datetime_opt(record.finished_at.as_deref()),
            error_log: record.error_log,
            created_at: parse_datetime(&record.created_at),
        }
    }
}

#[derive(Clone)]
pub struct ScrapeJobRepository {
    pool: DbPool,
}

impl ScrapeJobRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: &str) -> Result<Option<ScrapeJob>, DbError> {
        with_conn!(self.pool, conn => {
            scrape_job::table
                .find(id)
                .first::<ScrapeJobRecord>(&mut conn)
                .await
                .optional()
                .map(|opt| opt.map(ScrapeJob::from))
        })
    }

    pub async fn insert(&self, job: &ScrapeJob) -> Result<(), DbError> {
        let started_at = format_datetime_opt(job.started_at.as_ref());
        let finished_at = format_datetime_opt(job.finished_at.as_ref());
        let created_at = format_datetime(&job.created_at);

        with_conn!(self.pool, conn => {
            diesel::insert_into(scrape_job::table)
                .values((
                    scrape_job::id.eq(&job.id),
                    scrape_job::target_url.eq(&job.target_url),
                    scrape_job::target_type.eq(job.target_type.as_str()),
                    scrape_job::status.eq(job.status.as_str()),
                    scrape_job::started_at.eq(&started_at),
                    scrape_job::finished_at.eq(&finished_at),
                    scrape_job::error_log.eq(&job.error_log),
                    scrape_job::created_at.eq(&created_at),
                ))
                .execute(&mut conn)
                .await
        })?;
        Ok(())
    }

    /// Persist the job's lifecycle fields if the stored row is still open.
    ///
    /// Returns `false` when the stored row was already terminal (or missing)
    /// and nothing was written.
    pub async fn save_transition(&self, job: &ScrapeJob) -> Result<bool, DbError> {
        let started_at = format_datetime_opt(job.started_at.as_ref());
        let finished_at = format_datetime_opt(job.finished_at.as_ref());

        let rows = with_conn!(self.pool, conn => {
            diesel::update(
                scrape_job::table
                    .filter(scrape_job::id.eq(&job.id))
                    .filter(scrape_job::status.eq_any(OPEN_STATUSES)),
            )
            .set((
                scrape_job::status.eq(job.status.as_str()),
                scrape_job::started_at.eq(&started_at),
                scrape_job::finished_at.eq(&finished_at),
                scrape_job::error_log.eq(&job.error_log),
            ))
            .execute(&mut conn)
            .await
        })?;
        Ok(rows > 0)
    }

    /// Open jobs created before the cutoff.
    pub async fn find_stale(&self, created_before: DateTime<Utc>) -> Result<Vec<ScrapeJob>, DbError> {
        let cutoff = format_datetime(&created_before);

        with_conn!(self.pool, conn => {
            scrape_job::table
                .filter(scrape_job::status.eq_any(OPEN_STATUSES))
                .filter(scrape_job::created_at.lt(&cutoff))
                .order(scrape_job::created_at.asc())
                .load::<ScrapeJobRecord>(&mut conn)
                .await
                .map(|records| records.into_iter().map(ScrapeJob::from).collect())
        })
    }

    /// Most recent jobs, newest first, optionally restricted to one status.
    pub async fn list_recent(
        &self,
        limit: u32,
        status: Option<ScrapeJobStatus>,
    ) -> Result<Vec<ScrapeJob>, DbError> {
        let records: Vec<ScrapeJobRecord> = with_conn!(self.pool, conn => {
            match status {
                Some(status) => {
                    scrape_job::table
                        .filter(scrape_job::status.eq(status.as_str()))
                        .order(scrape_job::created_at.desc())
                        .limit(i64::from(limit))
                        .load::<ScrapeJobRecord>(&mut conn)
                        .await
                }
                None => {
                    scrape_job::table
                        .order(scrape_job::created_at.desc())
                        .limit(i64::from(limit))
                        .load::<ScrapeJobRecord>(&mut conn)
                        .await
                }
            }
        })?;
        Ok(records.into_iter().map(ScrapeJob::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::repository::test_support::test_context;

    use super::*;

    #[tokio::test]
    async fn test_terminal_row_is_not_overwritten() {
        let (ctx, _dir) = test_context().await;
        let repo = ctx.scrape_jobs();

        let mut job = ScrapeJob::new("https://example.com", ScrapeTargetType::Navigation);
        repo.insert(&job).await.unwrap();

        job.start(Utc::now()).unwrap();
        assert!(repo.save_transition(&job).await.unwrap());
        job.complete(Utc::now()).unwrap();
        assert!(repo.save_transition(&job).await.unwrap());

        // A stale in-memory copy must not resurrect the row.
        let mut stale = job.clone();
        stale.status = ScrapeJobStatus::Failed;
        stale.error_log = Some("late".to_string());
        assert!(!repo.save_transition(&stale).await.unwrap());

        let stored = repo.get(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ScrapeJobStatus::Completed);
        assert!(stored.error_log.is_none());
        assert!(stored.started_at.is_some());
        assert!(stored.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_find_stale_and_list_recent() {
        let (ctx, _dir) = test_context().await;
        let repo = ctx.scrape_jobs();

        let mut old = ScrapeJob::new("https://example.com/a", ScrapeTargetType::Category);
        old.created_at = Utc::now() - chrono::Duration::hours(2);
        repo.insert(&old).await.unwrap();

        let fresh = ScrapeJob::new("https://example.com/b", ScrapeTargetType::Category);
        repo.insert(&fresh).await.unwrap();

        let mut done = ScrapeJob::new("https://example.com/c", ScrapeTargetType::Category);
        done.created_at = Utc::now() - chrono::Duration::hours(3);
        done.complete(Utc::now()).unwrap();
        repo.insert(&done).await.unwrap();

        let stale = repo
            .find_stale(Utc::now() - chrono::Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].id, old.id);

        let recent = repo.list_recent(10, None).await.unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].id, fresh.id);

        let completed = repo
            .list_recent(10, Some(ScrapeJobStatus::Completed))
            .await
            .unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, done.id);
    }
}
