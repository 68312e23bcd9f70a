//! Scrape job audit records.
//!
//! A job brackets every scrape attempt and moves through
//! `pending -> in_progress -> {completed, failed}`. A freshness skip goes
//! straight from `pending` to `completed`. Terminal jobs are never mutated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which stage a job belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrapeTargetType {
    Navigation,
    Category,
    ProductList,
    ProductDetail,
}

impl ScrapeTargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Navigation => "navigation",
            Self::Category => "category",
            Self::ProductList => "product_list",
            Self::ProductDetail => "product_detail",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "navigation" => Some(Self::Navigation),
            "category" => Some(Self::Category),
            "product_list" => Some(Self::ProductList),
            "product_detail" => Some(Self::ProductDetail),
            _ => None,
        }
    }
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrapeJobStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl ScrapeJobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Rejected state transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("scrape job {job_id}: cannot move from {from} to {to}")]
pub struct JobTransitionError {
    pub job_id: String,
    pub from: &'static str,
    pub to: &'static str,
}

/// Audit record for one scrape attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeJob {
    pub id: String,
    pub target_url: String,
    pub target_type: ScrapeTargetType,
    pub status: ScrapeJobStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error_log: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ScrapeJob {
    /// Create a new pending job.
    pub fn new(target_url: impl Into<String>, target_type: ScrapeTargetType) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            target_url: target_url.into(),
            target_type,
            status: ScrapeJobStatus::Pending,
            started_at: None,
            finished_at: None,
            error_log: None,
            created_at: Utc::now(),
        }
    }

    fn transition(&mut self, to: ScrapeJobStatus) -> Result<(), JobTransitionError> {
        let allowed = match (self.status, to) {
            (ScrapeJobStatus::Pending, ScrapeJobStatus::InProgress) => true,
            (ScrapeJobStatus::Pending | ScrapeJobStatus::InProgress, ScrapeJobStatus::Completed) => {
                true
            }
            (ScrapeJobStatus::Pending | ScrapeJobStatus::InProgress, ScrapeJobStatus::Failed) => {
                true
            }
            _ => false,
        };
        if !allowed {
            return Err(JobTransitionError {
                job_id: self.id.clone(),
                from: self.status.as_str(),
                to: to.as_str(),
            });
        }
        self.status = to;
        Ok(())
    }

    /// Mark the job as running.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), JobTransitionError> {
        self.transition(ScrapeJobStatus::InProgress)?;
        self.started_at = Some(now);
        Ok(())
    }

    /// Mark the job as finished successfully.
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<(), JobTransitionError> {
        self.transition(ScrapeJobStatus::Completed)?;
        self.finished_at = Some(now);
        Ok(())
    }

    /// Mark the job as failed, recording the error message.
    pub fn fail(
        &mut self,
        now: DateTime<Utc>,
        message: impl Into<String>,
    ) -> Result<(), JobTransitionError> {
        self.transition(ScrapeJobStatus::Failed)?;
        self.finished_at = Some(now);
        self.error_log = Some(message.into());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut job = ScrapeJob::new("https://example.com", ScrapeTargetType::Navigation);
        assert_eq!(job.status, ScrapeJobStatus::Pending);

        let now = Utc::now();
        job.start(now).unwrap();
        assert_eq!(job.status, ScrapeJobStatus::InProgress);
        assert_eq!(job.started_at, Some(now));

        job.complete(now).unwrap();
        assert_eq!(job.status, ScrapeJobStatus::Completed);
        assert!(job.finished_at.is_some());
        assert!(job.error_log.is_none());
    }

    #[test]
    fn test_skip_completes_from_pending() {
        let mut job = ScrapeJob::new("https://example.com", ScrapeTargetType::ProductDetail);
        job.complete(Utc::now()).unwrap();
        assert_eq!(job.status, ScrapeJobStatus::Completed);
        assert!(job.started_at.is_none());
    }

    #[test]
    fn test_fail_records_message() {
        let mut job = ScrapeJob::new("https://example.com/c", ScrapeTargetType::Category);
        job.start(Utc::now()).unwrap();
        job.fail(Utc::now(), "connection reset").unwrap();
        assert_eq!(job.status, ScrapeJobStatus::Failed);
        assert_eq!(job.error_log.as_deref(), Some("connection reset"));
    }

    #[test]
    fn test_terminal_jobs_are_frozen() {
        let mut job = ScrapeJob::new("https://example.com", ScrapeTargetType::ProductList);
        job.start(Utc::now()).unwrap();
        job.complete(Utc::now()).unwrap();

        let err = job.fail(Utc::now(), "late").unwrap_err();
        assert_eq!(err.from, "completed");
        assert_eq!(err.to, "failed");
        assert_eq!(job.status, ScrapeJobStatus::Completed);
        assert!(job.error_log.is_none());

        assert!(job.start(Utc::now()).is_err());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            ScrapeJobStatus::Pending,
            ScrapeJobStatus::InProgress,
            ScrapeJobStatus::Completed,
            ScrapeJobStatus::Failed,
        ] {
            assert_eq!(ScrapeJobStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(
            ScrapeTargetType::from_str("product_list"),
            Some(ScrapeTargetType::ProductList)
        );
        assert_eq!(ScrapeTargetType::from_str("bogus"), None);
    }
}
