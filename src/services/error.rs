//! Errors surfaced by the scrape and catalog services.

use std::time::Duration;

use thiserror::Error;

use crate::models::JobTransitionError;
use crate::repository::DbError;
use crate::scrapers::CrawlError;

#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The requested entity does not exist. Not retried.
    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Crawl(#[from] CrawlError),

    #[error("database error: {0}")]
    Database(#[from] DbError),

    #[error("stage timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    InvalidTransition(#[from] JobTransitionError),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ScrapeError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
            || matches!(self, Self::Database(diesel::result::Error::NotFound))
    }
}
