//! Catalog entities populated by scraping.
//!
//! The catalog is a tree: navigation headings own categories, categories own
//! products (and optionally child categories), and each product has at most one
//! detail record plus a list of reviews.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Top-level navigation heading from the site menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationNode {
    pub id: String,
    pub title: String,
    /// Unique natural key.
    pub slug: String,
    pub url: String,
    pub last_scraped_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A navigation heading with the categories filed under it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationDetail {
    #[serde(flatten)]
    pub node: NavigationNode,
    pub categories: Vec<Category>,
}

/// A product category, optionally nested under a parent category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub navigation_id: Option<String>,
    pub parent_id: Option<String>,
    pub title: String,
    pub slug: String,
    /// Unique natural key. Titles and slugs can collide across sources.
    pub url: String,
    pub product_count: u32,
    pub last_scraped_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A category together with its immediate relations.
///
/// Children are listed one level deep only.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDetail {
    #[serde(flatten)]
    pub category: Category,
    pub navigation: Option<NavigationNode>,
    pub parent: Option<Category>,
    pub children: Vec<Category>,
    pub products: Vec<Product>,
}

/// A product listed in a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    /// Identifier on the source site (last path segment of the product URL).
    pub source_id: String,
    pub category_id: Option<String>,
    pub title: String,
    pub author: Option<String>,
    pub price: Option<f64>,
    pub currency: String,
    pub image_url: Option<String>,
    /// Unique natural key.
    pub source_url: String,
    pub last_scraped_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A product with its category, detail and reviews.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub category: Option<Category>,
    pub detail: Option<ProductDetail>,
    pub reviews: Vec<Review>,
}

/// Extended information for a single product (one-to-one with [`Product`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    pub id: String,
    pub product_id: String,
    pub description: Option<String>,
    pub specs: BTreeMap<String, String>,
    pub ratings_avg: Option<f64>,
    pub reviews_count: Option<u32>,
    pub recommendations: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A customer review. Reviews carry no stable identity across scrapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub product_id: String,
    pub author: Option<String>,
    /// 1-5, or None when the page did not carry a usable rating.
    pub rating: Option<u8>,
    pub text: Option<String>,
    pub review_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
