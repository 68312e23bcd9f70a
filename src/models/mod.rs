//! Data models for shelfscan.

mod catalog;
mod history;
mod scrape_job;

pub use catalog::{
    Category, CategoryDetail, NavigationDetail, NavigationNode, Product, ProductDetail, ProductView,
    Review,
};
pub use history::ViewHistory;
pub use scrape_job::{JobTransitionError, ScrapeJob, ScrapeJobStatus, ScrapeTargetType};
