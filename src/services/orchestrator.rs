//! The four scrape stages: navigation, category, product list, product detail.
//!
//! Every call opens exactly one job and leaves it terminal. Freshness is
//! checked for navigation and product detail only; category and product-list
//! scrapes always hit the site.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};

use super::error::ScrapeError;
use super::job_tracker::JobTracker;
use super::reconciler::{CategoryLinks, EntityReconciler};
use crate::config::ScraperSettings;
use crate::models::{Category, NavigationNode, Product, ProductDetail, ScrapeJob, ScrapeTargetType};
use crate::repository::DbContext;
use crate::scrapers::extract::{self, DetailPage};
use crate::scrapers::freshness::{is_stale, needs_refresh};
use crate::scrapers::{CrawlExecutor, PageFetcher, Seed};

/// Cloneable entry point for scraping. Each call is an independent unit of work.
#[derive(Clone)]
pub struct ScrapeOrchestrator {
    db: DbContext,
    executor: CrawlExecutor,
    tracker: JobTracker,
    reconciler: EntityReconciler,
    base_url: String,
    ttl: Duration,
    stage_timeout: Option<Duration>,
}

impl ScrapeOrchestrator {
    pub fn new(db: DbContext, fetcher: Arc<dyn PageFetcher>, settings: &ScraperSettings) -> Self {
        Self {
            executor: CrawlExecutor::new(fetcher, settings),
            tracker: JobTracker::new(&db),
            reconciler: EntityReconciler::new(db.clone()),
            db,
            base_url: settings.base_url.clone(),
            ttl: settings.ttl,
            stage_timeout: settings.stage_timeout,
        }
    }

    pub fn tracker(&self) -> &JobTracker {
        &self.tracker
    }

    /// Scrape the site menu into navigation headings.
    ///
    /// Returns the stored headings without crawling when there are some, none
    /// is stale, and `force` is false.
    pub async fn scrape_navigation(&self, force: bool) -> Result<Vec<NavigationNode>, ScrapeError> {
        info!("Starting navigation scrape (force={})", force);
        let mut job = self
            .tracker
            .open(&self.base_url, ScrapeTargetType::Navigation)
            .await?;
        let result = self.navigation_stage(&mut job, force).await;
        self.close(&mut job, result).await
    }

    async fn navigation_stage(
        &self,
        job: &mut ScrapeJob,
        force: bool,
    ) -> Result<Vec<NavigationNode>, ScrapeError> {
        let existing = self.db.navigation().get_all().await?;
        if !force
            && !existing.is_empty()
            && !existing.iter().any(|n| is_stale(n.last_scraped_at, self.ttl))
        {
            info!("Navigation is fresh, skipping scrape");
            return Ok(existing);
        }

        self.tracker.start(job).await?;
        self.within_deadline(async {
            let links = self
                .executor
                .run(vec![Seed::new(&self.base_url, "navigation")], |_, doc| {
                    extract::navigation_links(doc)
                })
                .await?;

            let mut nodes: Vec<NavigationNode> = Vec::with_capacity(links.len());
            for link in &links {
                let node = match self.reconciler.upsert_navigation(link).await {
                    Ok(node) => node,
                    Err(ScrapeError::InvalidInput(msg)) => {
                        warn!("Skipping menu link: {}", msg);
                        continue;
                    }
                    Err(e) => return Err(e),
                };
                // Distinct titles can share a slug.
                if !nodes.iter().any(|n| n.id == node.id) {
                    nodes.push(node);
                }
            }

            info!("Navigation scrape completed: {} heading(s)", nodes.len());
            Ok(nodes)
        })
        .await
    }

    /// Scrape a category page and upsert it by URL.
    ///
    /// Always crawls. Returns None only when the page produced nothing and the
    /// category was never stored before.
    pub async fn scrape_category(
        &self,
        url: &str,
        navigation_id: Option<&str>,
        force: bool,
    ) -> Result<Option<Category>, ScrapeError> {
        info!("Starting category scrape: {} (force={})", url, force);
        let mut job = self.tracker.open(url, ScrapeTargetType::Category).await?;
        let result = self.category_stage(&mut job, url, navigation_id).await;
        self.close(&mut job, result).await
    }

    async fn category_stage(
        &self,
        job: &mut ScrapeJob,
        url: &str,
        navigation_id: Option<&str>,
    ) -> Result<Option<Category>, ScrapeError> {
        self.tracker.start(job).await?;
        self.within_deadline(async {
            let summaries = self
                .executor
                .run(vec![Seed::new(url, "category")], |_, doc| {
                    let mut summary = extract::category_summary(doc);
                    // Keyed by the requested URL, not where redirects landed.
                    summary.url = url.to_string();
                    vec![summary]
                })
                .await?;

            let Some(summary) = summaries.into_iter().next() else {
                warn!("No category data extracted from {}", url);
                return Ok(self.db.categories().get_by_url(url).await?);
            };

            let links = CategoryLinks {
                navigation_id: navigation_id.map(str::to_string),
                parent_id: None,
            };
            let category = self.reconciler.upsert_category(&summary, links).await?;
            info!("Category scrape completed: {}", category.title);
            Ok(Some(category))
        })
        .await
    }

    /// Scrape one listing page of a category and upsert up to `limit` products.
    pub async fn scrape_products(
        &self,
        category_url: &str,
        category_id: Option<&str>,
        page: u32,
        limit: usize,
    ) -> Result<Vec<Product>, ScrapeError> {
        let url = listing_url(category_url, page.max(1));
        info!("Scraping products from {}", url);
        let mut job = self.tracker.open(&url, ScrapeTargetType::ProductList).await?;
        let result = self.products_stage(&mut job, &url, category_id, limit).await;
        self.close(&mut job, result).await
    }

    async fn products_stage(
        &self,
        job: &mut ScrapeJob,
        url: &str,
        category_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Product>, ScrapeError> {
        self.tracker.start(job).await?;
        self.within_deadline(async {
            let cards = self
                .executor
                .run(vec![Seed::new(url, "product_list")], |_, doc| {
                    extract::product_cards(doc)
                })
                .await?;

            let mut products = Vec::new();
            for card in cards.iter().take(limit) {
                products.push(self.reconciler.upsert_product(card, category_id).await?);
            }

            info!("Products scrape completed: {} product(s)", products.len());
            Ok(products)
        })
        .await
    }

    /// Scrape a product's page into its detail and reviews.
    ///
    /// Returns the stored detail without crawling when it exists, the product
    /// is fresh, and `force` is false.
    pub async fn scrape_product_detail(
        &self,
        product_id: &str,
        force: bool,
    ) -> Result<ProductDetail, ScrapeError> {
        let product = self.db.products().get(product_id).await;
        let target = match &product {
            Ok(Some(p)) => p.source_url.clone(),
            _ => format!("product:{product_id}"),
        };

        let mut job = self
            .tracker
            .open(&target, ScrapeTargetType::ProductDetail)
            .await?;
        let result = match product {
            Ok(Some(product)) => self.detail_stage(&mut job, product, force).await,
            Ok(None) => Err(ScrapeError::not_found("Product")),
            Err(e) => Err(e.into()),
        };
        self.close(&mut job, result).await
    }

    async fn detail_stage(
        &self,
        job: &mut ScrapeJob,
        product: Product,
        force: bool,
    ) -> Result<ProductDetail, ScrapeError> {
        let existing = self.db.details().get_by_product(&product.id).await?;
        if let Some(detail) = &existing {
            if !needs_refresh(force, product.last_scraped_at, self.ttl) {
                info!("Product detail is fresh, skipping scrape: {}", product.title);
                return Ok(detail.clone());
            }
        }

        info!("Scraping product detail: {}", product.source_url);
        self.tracker.start(job).await?;
        self.within_deadline(async move {
            let pages = self
                .executor
                .run(
                    vec![Seed::new(&product.source_url, "product_detail")],
                    |_, doc| vec![extract::product_detail(doc)],
                )
                .await?;

            let Some(page) = pages.into_iter().next() else {
                warn!("No detail extracted from {}", product.source_url);
                return match existing {
                    Some(detail) => Ok(detail),
                    None => {
                        self.reconciler
                            .upsert_product_detail(&product.id, &DetailPage::default())
                            .await
                    }
                };
            };

            let detail = self
                .reconciler
                .upsert_product_detail(&product.id, &page)
                .await?;
            let reviews = self
                .reconciler
                .replace_reviews(&product.id, &page.reviews)
                .await?;
            self.db.products().touch_scraped(&product.id, Utc::now()).await?;

            info!(
                "Product detail scrape completed: {} ({} review(s))",
                product.title, reviews
            );
            Ok(detail)
        })
        .await
    }

    async fn within_deadline<T>(
        &self,
        work: impl Future<Output = Result<T, ScrapeError>>,
    ) -> Result<T, ScrapeError> {
        match self.stage_timeout {
            Some(limit) => tokio::time::timeout(limit, work)
                .await
                .unwrap_or_else(|_| Err(ScrapeError::Timeout(limit))),
            None => work.await,
        }
    }

    /// Complete the job on success, fail it otherwise, and hand back the result.
    async fn close<T>(
        &self,
        job: &mut ScrapeJob,
        result: Result<T, ScrapeError>,
    ) -> Result<T, ScrapeError> {
        let result = match result {
            Ok(value) => self.tracker.complete(job).await.map(|()| value),
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            error!(
                "{} scrape of {} failed: {}",
                job.target_type.as_str(),
                job.target_url,
                e
            );
            if let Err(record_err) = self.tracker.fail(job, &e.to_string()).await {
                error!("Could not record failure of job {}: {}", job.id, record_err);
            }
        }
        result
    }
}

/// Listing URL for one page of a category.
fn listing_url(category_url: &str, page: u32) -> String {
    let separator = if category_url.contains('?') { '&' } else { '?' };
    format!("{category_url}{separator}page={page}")
}
