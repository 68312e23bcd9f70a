//! JSON API over the catalog and its scrape triggers.
//!
//! A background watchdog periodically fails scrape jobs that were abandoned
//! in `pending` or `in_progress`.

mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::config::{ScraperSettings, Settings};
use crate::repository::DbContext;
use crate::scrapers::{build_fetcher, PageFetcher};
use crate::services::{CatalogService, JobTracker, ScrapeOrchestrator};

/// How often the watchdog looks for abandoned jobs.
const WATCHDOG_INTERVAL: Duration = Duration::from_secs(60);

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
}

impl AppState {
    pub fn new(ctx: DbContext, fetcher: Arc<dyn PageFetcher>, scraper: &ScraperSettings) -> Self {
        let orchestrator = ScrapeOrchestrator::new(ctx.clone(), fetcher, scraper);
        Self {
            catalog: CatalogService::new(ctx, orchestrator),
        }
    }

    pub fn tracker(&self) -> &JobTracker {
        self.catalog.scraper().tracker()
    }
}

/// Start the web server.
pub async fn serve(settings: &Settings, bind: &str) -> anyhow::Result<()> {
    let ctx = settings.create_db_context()?;
    ctx.init_schema().await?;

    let fetcher = build_fetcher(&settings.scraper)?;
    info!("Using {} transport", fetcher.name());
    let state = AppState::new(ctx, fetcher, &settings.scraper);

    spawn_watchdog(state.tracker().clone(), settings.scraper.job_max_age);

    let app = create_router(state);
    let addr: SocketAddr = bind.parse()?;
    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically fail jobs that have been open longer than `max_age`.
fn spawn_watchdog(tracker: JobTracker, max_age: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(WATCHDOG_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = tracker.reap_stale(max_age).await {
                error!("Watchdog sweep failed: {}", e);
            }
        }
    });
}
