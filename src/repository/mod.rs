//! Repository layer for database persistence.
//!
//! All database access uses Diesel ORM with compile-time query checking.
//! Supports both SQLite and PostgreSQL backends.

pub mod context;
pub mod models;
pub mod pool;

// Repositories
pub mod category;
pub mod detail;
pub mod history;
pub mod navigation;
pub mod product;
pub mod review;
pub mod scrape_job;

// Utilities
pub mod util;

pub use category::CategoryRepository;
pub use context::DbContext;
pub use detail::ProductDetailRepository;
pub use history::HistoryRepository;
pub use navigation::NavigationRepository;
pub use pool::{DbError, DbPool};
pub use product::ProductRepository;
pub use review::ReviewRepository;
pub use scrape_job::ScrapeJobRepository;
pub use util::{parse_datetime, parse_datetime_opt, redact_url_password};
