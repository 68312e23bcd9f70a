//! Diesel ORM records for database tables.
//!
//! Records mirror the schema column order and store timestamps as RFC 3339
//! text. Conversions into domain models live next to each repository.

use diesel::prelude::*;

use crate::schema;

/// Navigation record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::navigation)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct NavigationRecord {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub url: String,
    pub last_scraped_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Category record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::category)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CategoryRecord {
    pub id: String,
    pub navigation_id: Option<String>,
    pub parent_id: Option<String>,
    pub title: String,
    pub slug: String,
    pub url: String,
    pub product_count: i32,
    pub last_scraped_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Product record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::product)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ProductRecord {
    pub id: String,
    pub source_id: String,
    pub category_id: Option<String>,
    pub title: String,
    pub author: Option<String>,
    pub price: Option<f64>,
    pub currency: String,
    pub image_url: Option<String>,
    pub source_url: String,
    pub last_scraped_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Product detail record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::product_detail)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ProductDetailRecord {
    pub id: String,
    pub product_id: String,
    pub description: Option<String>,
    pub specs: String,
    pub ratings_avg: Option<f64>,
    pub reviews_count: Option<i32>,
    pub recommendations: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Review record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::review)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ReviewRecord {
    pub id: String,
    pub product_id: String,
    pub author: Option<String>,
    pub rating: Option<i32>,
    pub text: Option<String>,
    pub review_date: Option<String>,
    pub created_at: String,
}

/// Scrape job record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::scrape_job)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ScrapeJobRecord {
    pub id: String,
    pub target_url: String,
    pub target_type: String,
    pub status: String,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    pub error_log: Option<String>,
    pub created_at: String,
}

/// View history record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::view_history)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ViewHistoryRecord {
    pub id: String,
    pub session_id: String,
    pub user_id: Option<String>,
    pub path_json: String,
    pub created_at: String,
}
