//! Catalog reads and the scrape triggers exposed by the API.
//!
//! Reads never crawl, except that listing navigation on an empty database
//! runs a non-forced navigation scrape first.

use serde::Serialize;

use super::error::ScrapeError;
use super::orchestrator::ScrapeOrchestrator;
use crate::models::{
    Category, CategoryDetail, NavigationDetail, NavigationNode, Product, ProductView, ScrapeJob,
    ScrapeJobStatus, ViewHistory,
};
use crate::repository::DbContext;

/// Pagination block of a listing response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

impl PageMeta {
    pub fn new(total: u64, page: u32, limit: u32) -> Self {
        let total_pages = if limit == 0 {
            0
        } else {
            total.div_ceil(u64::from(limit))
        };
        Self {
            total,
            page,
            limit,
            total_pages,
        }
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

#[derive(Clone)]
pub struct CatalogService {
    db: DbContext,
    scraper: ScrapeOrchestrator,
}

impl CatalogService {
    pub fn new(db: DbContext, scraper: ScrapeOrchestrator) -> Self {
        Self { db, scraper }
    }

    pub fn scraper(&self) -> &ScrapeOrchestrator {
        &self.scraper
    }

    /// All navigation headings, scraping the site first if there are none.
    pub async fn navigation(&self) -> Result<Vec<NavigationNode>, ScrapeError> {
        let nodes = self.db.navigation().get_all().await?;
        if nodes.is_empty() {
            return self.scraper.scrape_navigation(false).await;
        }
        Ok(nodes)
    }

    pub async fn navigation_by_slug(&self, slug: &str) -> Result<NavigationDetail, ScrapeError> {
        let node = self
            .db
            .navigation()
            .get_by_slug(slug)
            .await?
            .ok_or_else(|| ScrapeError::not_found(format!("Navigation with slug \"{slug}\"")))?;
        let categories = self.db.categories().for_navigation(&node.id).await?;
        Ok(NavigationDetail { node, categories })
    }

    pub async fn categories(&self, page: u32, limit: u32) -> Result<Paginated<Category>, ScrapeError> {
        let (data, total) = self.db.categories().list(page, limit).await?;
        Ok(Paginated {
            data,
            meta: PageMeta::new(total, page, limit),
        })
    }

    /// A category with its navigation heading, parent, direct children and products.
    pub async fn category_by_slug(&self, slug: &str) -> Result<CategoryDetail, ScrapeError> {
        let category = self.find_category(slug).await?;

        let navigation = match &category.navigation_id {
            Some(id) => self.db.navigation().get(id).await?,
            None => None,
        };
        let parent = match &category.parent_id {
            Some(id) => self.db.categories().get(id).await?,
            None => None,
        };
        let children = self.db.categories().children(&category.id).await?;
        let products = self.db.products().for_category(&category.id).await?;

        Ok(CategoryDetail {
            category,
            navigation,
            parent,
            children,
            products,
        })
    }

    pub async fn products(
        &self,
        page: u32,
        limit: u32,
        category_id: Option<&str>,
    ) -> Result<Paginated<Product>, ScrapeError> {
        let (data, total) = self.db.products().list(page, limit, category_id).await?;
        Ok(Paginated {
            data,
            meta: PageMeta::new(total, page, limit),
        })
    }

    pub async fn product(&self, id: &str) -> Result<ProductView, ScrapeError> {
        let product = self
            .db
            .products()
            .get(id)
            .await?
            .ok_or_else(|| ScrapeError::not_found(format!("Product with ID \"{id}\"")))?;

        let category = match &product.category_id {
            Some(cat_id) => self.db.categories().get(cat_id).await?,
            None => None,
        };
        let detail = self.db.details().get_by_product(&product.id).await?;
        let reviews = self.db.reviews().for_product(&product.id).await?;

        Ok(ProductView {
            product,
            category,
            detail,
            reviews,
        })
    }

    /// Re-scrape a stored category.
    pub async fn scrape_category(&self, slug: &str, force: bool) -> Result<Category, ScrapeError> {
        let category = self.find_category(slug).await?;
        let scraped = self
            .scraper
            .scrape_category(&category.url, category.navigation_id.as_deref(), force)
            .await?;
        Ok(scraped.unwrap_or(category))
    }

    /// Scrape one listing page of a stored category.
    pub async fn scrape_category_products(
        &self,
        slug: &str,
        page: u32,
        limit: u32,
    ) -> Result<Vec<Product>, ScrapeError> {
        let category = self.find_category(slug).await?;
        self.scraper
            .scrape_products(&category.url, Some(&category.id), page, limit as usize)
            .await
    }

    /// Refresh a product's detail and return the product with its relations.
    pub async fn scrape_product(&self, id: &str, force: bool) -> Result<ProductView, ScrapeError> {
        self.scraper.scrape_product_detail(id, force).await?;
        self.product(id).await
    }

    pub async fn jobs(
        &self,
        limit: u32,
        status: Option<ScrapeJobStatus>,
    ) -> Result<Vec<ScrapeJob>, ScrapeError> {
        Ok(self.db.scrape_jobs().list_recent(limit, status).await?)
    }

    pub async fn record_history(&self, entry: ViewHistory) -> Result<ViewHistory, ScrapeError> {
        self.db.history().record(&entry).await?;
        Ok(entry)
    }

    pub async fn history(
        &self,
        session_id: &str,
        user_id: Option<&str>,
    ) -> Result<Vec<ViewHistory>, ScrapeError> {
        Ok(self.db.history().for_session(session_id, user_id).await?)
    }

    async fn find_category(&self, slug: &str) -> Result<Category, ScrapeError> {
        self.db
            .categories()
            .get_by_slug(slug)
            .await?
            .ok_or_else(|| ScrapeError::not_found(format!("Category with slug \"{slug}\"")))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::ScraperSettings;
    use crate::repository::test_support::{insert_product, test_context};
    use crate::scrapers::extract::CategorySummary;
    use crate::scrapers::fetcher::test_support::ScriptedFetcher;
    use crate::services::reconciler::{CategoryLinks, EntityReconciler};

    fn service(ctx: &DbContext, fetcher: ScriptedFetcher) -> CatalogService {
        let settings = ScraperSettings {
            base_url: "https://shop.test/".to_string(),
            settle_delay: std::time::Duration::ZERO,
            max_requests_per_minute: 60_000,
            ..Default::default()
        };
        let scraper = ScrapeOrchestrator::new(ctx.clone(), Arc::new(fetcher), &settings);
        CatalogService::new(ctx.clone(), scraper)
    }

    #[test]
    fn test_page_meta_rounds_up() {
        assert_eq!(PageMeta::new(41, 1, 20).total_pages, 3);
        assert_eq!(PageMeta::new(40, 2, 20).total_pages, 2);
        assert_eq!(PageMeta::new(0, 1, 20).total_pages, 0);
    }

    #[tokio::test]
    async fn test_empty_navigation_triggers_scrape() {
        let (ctx, _dir) = test_context().await;
        let fetcher = ScriptedFetcher::new()
            .with_page("https://shop.test/", r#"<nav><a href="/fiction">Fiction</a></nav>"#);
        let catalog = service(&ctx, fetcher);

        let nodes = catalog.navigation().await.unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].slug, "fiction");
    }

    #[tokio::test]
    async fn test_category_by_slug_includes_relations() {
        let (ctx, _dir) = test_context().await;
        let reconciler = EntityReconciler::new(ctx.clone());
        let parent = reconciler
            .upsert_category(
                &CategorySummary {
                    title: "Fiction".to_string(),
                    url: "https://shop.test/c/fiction".to_string(),
                    product_count: 0,
                },
                CategoryLinks::default(),
            )
            .await
            .unwrap();
        let child = reconciler
            .upsert_category(
                &CategorySummary {
                    title: "Crime".to_string(),
                    url: "https://shop.test/c/crime".to_string(),
                    product_count: 0,
                },
                CategoryLinks {
                    navigation_id: None,
                    parent_id: Some(parent.id.clone()),
                },
            )
            .await
            .unwrap();

        let catalog = service(&ctx, ScriptedFetcher::new());
        let detail = catalog.category_by_slug("fiction").await.unwrap();
        assert_eq!(detail.children.len(), 1);
        assert_eq!(detail.children[0].id, child.id);

        let detail = catalog.category_by_slug("crime").await.unwrap();
        assert_eq!(detail.parent.map(|p| p.id), Some(parent.id));

        let err = catalog.category_by_slug("nope").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_product_view_and_pagination() {
        let (ctx, _dir) = test_context().await;
        let first = insert_product(&ctx, "https://shop.test/p/1").await;
        insert_product(&ctx, "https://shop.test/p/2").await;
        insert_product(&ctx, "https://shop.test/p/3").await;

        let catalog = service(&ctx, ScriptedFetcher::new());
        let page = catalog.products(1, 2, None).await.unwrap();
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.meta, PageMeta::new(3, 1, 2));
        assert_eq!(page.meta.total_pages, 2);

        let view = catalog.product(&first.id).await.unwrap();
        assert_eq!(view.product.id, first.id);
        assert!(view.detail.is_none());
        assert!(view.reviews.is_empty());
    }
}
