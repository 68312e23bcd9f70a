//! Service layer for shelfscan business logic.
//!
//! Scrape orchestration and catalog reads, separated from the HTTP and CLI
//! surfaces that drive them.

pub mod catalog;
pub mod error;
pub mod job_tracker;
pub mod orchestrator;
pub mod reconciler;

pub use catalog::{CatalogService, PageMeta, Paginated};
pub use error::ScrapeError;
pub use job_tracker::{JobTracker, WATCHDOG_MESSAGE};
pub use orchestrator::ScrapeOrchestrator;
pub use reconciler::{CategoryLinks, EntityReconciler};
