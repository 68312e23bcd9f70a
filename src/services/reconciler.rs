//! Create-or-update of catalog entities keyed by their natural keys.
//!
//! Extracted fields always overwrite stored ones. Relation fields passed as
//! `None` leave whatever is stored untouched. There is no lock around the
//! lookup and write: concurrent upserts of the same key are last-write-wins.

use chrono::Utc;
use tracing::{debug, warn};

use super::error::ScrapeError;
use crate::models::{Category, NavigationNode, Product, ProductDetail, Review};
use crate::repository::DbContext;
use crate::scrapers::extract::{CategorySummary, DetailPage, NavigationLink, ProductCard, ReviewEntry};
use crate::scrapers::slug::slugify;

/// Optional relations of a category. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct CategoryLinks {
    pub navigation_id: Option<String>,
    pub parent_id: Option<String>,
}

#[derive(Clone)]
pub struct EntityReconciler {
    db: DbContext,
}

impl EntityReconciler {
    pub fn new(db: DbContext) -> Self {
        Self { db }
    }

    /// Upsert a navigation heading by the slug of its title.
    pub async fn upsert_navigation(&self, link: &NavigationLink) -> Result<NavigationNode, ScrapeError> {
        let slug = slugify(&link.title);
        if slug.is_empty() {
            return Err(ScrapeError::InvalidInput(format!(
                "navigation title {:?} has no usable slug",
                link.title
            )));
        }

        let repo = self.db.navigation();
        let now = Utc::now();
        match repo.get_by_slug(&slug).await? {
            Some(mut node) => {
                node.title = link.title.clone();
                node.url = link.url.clone();
                node.last_scraped_at = Some(now);
                node.updated_at = now;
                repo.update(&node).await?;
            }
            None => {
                let node = NavigationNode {
                    id: uuid::Uuid::new_v4().to_string(),
                    title: link.title.clone(),
                    slug: slug.clone(),
                    url: link.url.clone(),
                    last_scraped_at: Some(now),
                    created_at: now,
                    updated_at: now,
                };
                debug!("New navigation heading {}", slug);
                repo.insert(&node).await?;
            }
        }

        repo.get_by_slug(&slug)
            .await?
            .ok_or_else(|| ScrapeError::not_found(format!("Navigation {slug}")))
    }

    /// Upsert a category by URL.
    pub async fn upsert_category(
        &self,
        summary: &CategorySummary,
        links: CategoryLinks,
    ) -> Result<Category, ScrapeError> {
        let repo = self.db.categories();
        let now = Utc::now();
        let slug = slugify(&summary.title);

        match repo.get_by_url(&summary.url).await? {
            Some(mut cat) => {
                cat.title = summary.title.clone();
                cat.slug = slug;
                cat.product_count = summary.product_count;
                if links.navigation_id.is_some() {
                    cat.navigation_id = links.navigation_id;
                }
                if let Some(parent_id) = links.parent_id {
                    if parent_id == cat.id {
                        warn!("Ignoring self-referencing parent for category {}", cat.url);
                    } else {
                        cat.parent_id = Some(parent_id);
                    }
                }
                cat.last_scraped_at = Some(now);
                cat.updated_at = now;
                repo.update(&cat).await?;
            }
            None => {
                let cat = Category {
                    id: uuid::Uuid::new_v4().to_string(),
                    navigation_id: links.navigation_id,
                    parent_id: links.parent_id,
                    title: summary.title.clone(),
                    slug,
                    url: summary.url.clone(),
                    product_count: summary.product_count,
                    last_scraped_at: Some(now),
                    created_at: now,
                    updated_at: now,
                };
                debug!("New category {}", cat.url);
                repo.insert(&cat).await?;
            }
        }

        repo.get_by_url(&summary.url)
            .await?
            .ok_or_else(|| ScrapeError::not_found(format!("Category {}", summary.url)))
    }

    /// Upsert a product by source URL.
    pub async fn upsert_product(
        &self,
        card: &ProductCard,
        category_id: Option<&str>,
    ) -> Result<Product, ScrapeError> {
        let repo = self.db.products();
        let now = Utc::now();

        match repo.get_by_source_url(&card.source_url).await? {
            Some(mut product) => {
                product.source_id = card.source_id.clone();
                product.title = card.title.clone();
                product.author = card.author.clone();
                product.price = card.price;
                product.currency = card.currency.clone();
                product.image_url = card.image_url.clone();
                if let Some(category_id) = category_id {
                    product.category_id = Some(category_id.to_string());
                }
                product.last_scraped_at = Some(now);
                product.updated_at = now;
                repo.update(&product).await?;
            }
            None => {
                let product = Product {
                    id: uuid::Uuid::new_v4().to_string(),
                    source_id: card.source_id.clone(),
                    category_id: category_id.map(str::to_string),
                    title: card.title.clone(),
                    author: card.author.clone(),
                    price: card.price,
                    currency: card.currency.clone(),
                    image_url: card.image_url.clone(),
                    source_url: card.source_url.clone(),
                    last_scraped_at: Some(now),
                    created_at: now,
                    updated_at: now,
                };
                repo.insert(&product).await?;
            }
        }

        repo.get_by_source_url(&card.source_url)
            .await?
            .ok_or_else(|| ScrapeError::not_found(format!("Product {}", card.source_url)))
    }

    /// Write a product's detail, reusing the existing row when there is one.
    pub async fn upsert_product_detail(
        &self,
        product_id: &str,
        page: &DetailPage,
    ) -> Result<ProductDetail, ScrapeError> {
        let repo = self.db.details();
        let now = Utc::now();

        match repo.get_by_product(product_id).await? {
            Some(mut detail) => {
                detail.description = page.description.clone();
                detail.specs = page.specs.clone();
                detail.ratings_avg = page.ratings_avg;
                detail.reviews_count = page.reviews_count;
                detail.recommendations = page.recommendations.clone();
                detail.updated_at = now;
                repo.update(&detail).await?;
            }
            None => {
                let detail = ProductDetail {
                    id: uuid::Uuid::new_v4().to_string(),
                    product_id: product_id.to_string(),
                    description: page.description.clone(),
                    specs: page.specs.clone(),
                    ratings_avg: page.ratings_avg,
                    reviews_count: page.reviews_count,
                    recommendations: page.recommendations.clone(),
                    created_at: now,
                    updated_at: now,
                };
                repo.insert(&detail).await?;
            }
        }

        repo.get_by_product(product_id)
            .await?
            .ok_or_else(|| ScrapeError::not_found(format!("Detail for product {product_id}")))
    }

    /// Replace every review of a product with `entries`.
    pub async fn replace_reviews(
        &self,
        product_id: &str,
        entries: &[ReviewEntry],
    ) -> Result<usize, ScrapeError> {
        let now = Utc::now();
        let reviews: Vec<Review> = entries
            .iter()
            .map(|entry| Review {
                id: uuid::Uuid::new_v4().to_string(),
                product_id: product_id.to_string(),
                author: entry.author.clone(),
                rating: entry.rating,
                text: entry.text.clone(),
                review_date: entry.review_date,
                created_at: now,
            })
            .collect();

        Ok(self.db.reviews().replace(product_id, &reviews).await?)
    }
}
