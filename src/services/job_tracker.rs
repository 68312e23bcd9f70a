//! Scrape job lifecycle bookkeeping.
//!
//! The in-memory [`ScrapeJob`] validates each transition; the repository only
//! writes rows that are still open, so a job closed elsewhere (for example by
//! the watchdog) is never reopened or overwritten.

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::error::ScrapeError;
use crate::models::{JobTransitionError, ScrapeJob, ScrapeTargetType};
use crate::repository::{DbContext, DbError, ScrapeJobRepository};

/// Error recorded on jobs failed by the watchdog.
pub const WATCHDOG_MESSAGE: &str = "abandoned: exceeded maximum job age";

#[derive(Clone)]
pub struct JobTracker {
    jobs: ScrapeJobRepository,
}

impl JobTracker {
    pub fn new(ctx: &DbContext) -> Self {
        Self {
            jobs: ctx.scrape_jobs(),
        }
    }

    /// Persist a new pending job.
    pub async fn open(
        &self,
        target_url: &str,
        target_type: ScrapeTargetType,
    ) -> Result<ScrapeJob, DbError> {
        let job = ScrapeJob::new(target_url, target_type);
        self.jobs.insert(&job).await?;
        debug!("Opened {} job {} for {}", target_type.as_str(), job.id, target_url);
        Ok(job)
    }

    pub async fn start(&self, job: &mut ScrapeJob) -> Result<(), ScrapeError> {
        self.apply(job, |next| next.start(Utc::now())).await
    }

    pub async fn complete(&self, job: &mut ScrapeJob) -> Result<(), ScrapeError> {
        self.apply(job, |next| next.complete(Utc::now())).await
    }

    pub async fn fail(&self, job: &mut ScrapeJob, message: &str) -> Result<(), ScrapeError> {
        self.apply(job, |next| next.fail(Utc::now(), message)).await
    }

    /// Run a transition on a copy and adopt it only once it is stored, so a
    /// failed write leaves `job` in its last persisted state.
    async fn apply(
        &self,
        job: &mut ScrapeJob,
        transition: impl FnOnce(&mut ScrapeJob) -> Result<(), JobTransitionError>,
    ) -> Result<(), ScrapeError> {
        let mut next = job.clone();
        transition(&mut next)?;
        self.persist(&next).await?;
        *job = next;
        Ok(())
    }

    async fn persist(&self, job: &ScrapeJob) -> Result<(), ScrapeError> {
        if !self.jobs.save_transition(job).await? {
            warn!(
                "Job {} was already closed, not recording {}",
                job.id,
                job.status.as_str()
            );
        }
        Ok(())
    }

    /// Fail every open job older than `max_age`. Returns how many were closed.
    pub async fn reap_stale(&self, max_age: Duration) -> Result<usize, ScrapeError> {
        let now = Utc::now();
        let Some(cutoff) = chrono::Duration::from_std(max_age)
            .ok()
            .and_then(|age| now.checked_sub_signed(age))
        else {
            return Ok(0);
        };

        let mut reaped = 0;
        for mut job in self.jobs.find_stale(cutoff).await? {
            job.fail(now, WATCHDOG_MESSAGE)?;
            if self.jobs.save_transition(&job).await? {
                reaped += 1;
            }
        }

        if reaped > 0 {
            info!("Watchdog failed {} stale scrape job(s)", reaped);
        }
        Ok(reaped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScrapeJobStatus;
    use crate::repository::test_support::{execute_sql, test_context};

    #[tokio::test]
    async fn test_lifecycle_is_persisted() {
        let (ctx, _dir) = test_context().await;
        let tracker = JobTracker::new(&ctx);

        let mut job = tracker
            .open("https://shop.test/", ScrapeTargetType::Navigation)
            .await
            .unwrap();
        tracker.start(&mut job).await.unwrap();
        tracker.complete(&mut job).await.unwrap();

        let stored = ctx.scrape_jobs().get(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ScrapeJobStatus::Completed);
        assert!(stored.started_at.is_some());
        assert!(stored.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_terminal_job_rejects_transition() {
        let (ctx, _dir) = test_context().await;
        let tracker = JobTracker::new(&ctx);

        let mut job = tracker
            .open("https://shop.test/c", ScrapeTargetType::Category)
            .await
            .unwrap();
        tracker.fail(&mut job, "boom").await.unwrap();

        let err = tracker.complete(&mut job).await.unwrap_err();
        assert!(matches!(err, ScrapeError::InvalidTransition(_)));

        let stored = ctx.scrape_jobs().get(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ScrapeJobStatus::Failed);
        assert_eq!(stored.error_log.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_reap_stale_fails_only_old_open_jobs() {
        let (ctx, _dir) = test_context().await;
        let tracker = JobTracker::new(&ctx);

        let mut old = ScrapeJob::new("https://shop.test/old", ScrapeTargetType::ProductList);
        old.created_at = Utc::now() - chrono::Duration::hours(2);
        ctx.scrape_jobs().insert(&old).await.unwrap();

        let mut done = ScrapeJob::new("https://shop.test/done", ScrapeTargetType::ProductList);
        done.created_at = Utc::now() - chrono::Duration::hours(2);
        done.complete(Utc::now()).unwrap();
        ctx.scrape_jobs().insert(&done).await.unwrap();

        let fresh = tracker
            .open("https://shop.test/new", ScrapeTargetType::ProductList)
            .await
            .unwrap();

        let reaped = tracker.reap_stale(Duration::from_secs(3600)).await.unwrap();
        assert_eq!(reaped, 1);

        let old = ctx.scrape_jobs().get(&old.id).await.unwrap().unwrap();
        assert_eq!(old.status, ScrapeJobStatus::Failed);
        assert_eq!(old.error_log.as_deref(), Some(WATCHDOG_MESSAGE));

        let done = ctx.scrape_jobs().get(&done.id).await.unwrap().unwrap();
        assert_eq!(done.status, ScrapeJobStatus::Completed);

        let fresh = ctx.scrape_jobs().get(&fresh.id).await.unwrap().unwrap();
        assert_eq!(fresh.status, ScrapeJobStatus::Pending);
    }

    #[tokio::test]
    async fn test_reaped_job_is_not_reopened() {
        let (ctx, _dir) = test_context().await;
        let tracker = JobTracker::new(&ctx);

        let mut job = ScrapeJob::new("https://shop.test/p", ScrapeTargetType::ProductDetail);
        job.created_at = Utc::now() - chrono::Duration::hours(2);
        ctx.scrape_jobs().insert(&job).await.unwrap();
        tracker.start(&mut job).await.unwrap();

        tracker.reap_stale(Duration::from_secs(60)).await.unwrap();

        // The worker finishes late; the stored row keeps the watchdog's verdict.
        tracker.complete(&mut job).await.unwrap();
        let stored = ctx.scrape_jobs().get(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ScrapeJobStatus::Failed);
    }

    #[tokio::test]
    async fn test_rejected_write_keeps_job_open_in_memory() {
        let (ctx, _dir) = test_context().await;
        let tracker = JobTracker::new(&ctx);
        execute_sql(
            &ctx,
            "CREATE TRIGGER block_completion BEFORE UPDATE ON scrape_job \
             WHEN NEW.status = 'completed' \
             BEGIN SELECT RAISE(ABORT, 'completion blocked'); END;",
        )
        .await;

        let mut job = tracker
            .open("https://shop.test/c", ScrapeTargetType::Category)
            .await
            .unwrap();
        tracker.start(&mut job).await.unwrap();

        let err = tracker.complete(&mut job).await.unwrap_err();
        assert!(matches!(err, ScrapeError::Database(_)));
        assert_eq!(job.status, ScrapeJobStatus::InProgress);
        assert!(job.finished_at.is_none());

        tracker.fail(&mut job, "could not complete").await.unwrap();
        let stored = ctx.scrape_jobs().get(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ScrapeJobStatus::Failed);
        assert_eq!(stored.error_log.as_deref(), Some("could not complete"));
    }
}
