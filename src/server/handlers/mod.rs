//! HTTP request handlers for the web server.

mod api;
mod categories;
mod helpers;
mod history;
mod navigation;
mod products;

// Re-export handlers for use by the router
pub use api::{health, list_jobs};
pub use categories::{category_by_slug, list_categories, scrape_category, scrape_category_products};
pub use history::{list_history, record_history};
pub use navigation::{list_navigation, navigation_by_slug, scrape_navigation};
pub use products::{list_products, product_by_id, scrape_product};
