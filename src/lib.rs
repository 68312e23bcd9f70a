//! shelfscan - on-demand scraped book catalog.
//!
//! The catalog (navigation headings, categories, products, product details and
//! reviews) is populated by scraping the source site when a caller asks for it.
//! Every scrape attempt is bracketed by an auditable [`models::ScrapeJob`].

pub mod cli;
pub mod config;
pub mod models;
pub mod repository;
pub mod schema;
pub mod scrapers;
pub mod server;
pub mod services;
