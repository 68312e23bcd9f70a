//! One-shot scrape commands.
//!
//! Each command runs a single orchestrator stage against the configured
//! database, exactly as the matching server endpoint would.

use console::style;

use crate::config::Settings;
use crate::scrapers::build_fetcher;
use crate::services::ScrapeOrchestrator;

async fn orchestrator(settings: &Settings) -> anyhow::Result<ScrapeOrchestrator> {
    let ctx = settings.create_db_context()?;
    ctx.init_schema().await?;
    let fetcher = build_fetcher(&settings.scraper)?;
    Ok(ScrapeOrchestrator::new(ctx, fetcher, &settings.scraper))
}

fn report_failure(err: &impl std::fmt::Display) {
    eprintln!("{} Scrape failed: {}", style("✗").red(), err);
}

pub async fn cmd_scrape_navigation(settings: &Settings, force: bool) -> anyhow::Result<()> {
    let scraper = orchestrator(settings).await?;
    println!(
        "{} Scraping navigation from {}",
        style("→").cyan(),
        settings.scraper.base_url
    );

    let nodes = scraper.scrape_navigation(force).await.inspect_err(report_failure)?;
    for node in &nodes {
        println!("  {} {} ({})", style("✓").green(), node.title, node.slug);
    }
    println!("{} {} navigation headings", style("✓").green(), nodes.len());
    Ok(())
}

pub async fn cmd_scrape_category(
    settings: &Settings,
    url: &str,
    navigation_id: Option<&str>,
    force: bool,
) -> anyhow::Result<()> {
    let scraper = orchestrator(settings).await?;
    println!("{} Scraping category {}", style("→").cyan(), url);

    match scraper
        .scrape_category(url, navigation_id, force)
        .await
        .inspect_err(report_failure)?
    {
        Some(category) => println!(
            "{} {} ({}, {} products)",
            style("✓").green(),
            category.title,
            category.slug,
            category.product_count
        ),
        None => println!("{} Page had no category content", style("!").yellow()),
    }
    Ok(())
}

pub async fn cmd_scrape_products(
    settings: &Settings,
    category_url: &str,
    category_id: Option<&str>,
    page: u32,
    limit: usize,
) -> anyhow::Result<()> {
    let scraper = orchestrator(settings).await?;
    println!(
        "{} Scraping page {} of {}",
        style("→").cyan(),
        page,
        category_url
    );

    let products = scraper
        .scrape_products(category_url, category_id, page, limit)
        .await
        .inspect_err(report_failure)?;
    for product in &products {
        let price = product
            .price
            .map(|p| format!("{:.2} {}", p, product.currency))
            .unwrap_or_else(|| "no price".to_string());
        println!("  {} {} [{}]", style("✓").green(), product.title, price);
    }
    println!("{} {} products stored", style("✓").green(), products.len());
    Ok(())
}

pub async fn cmd_scrape_product(settings: &Settings, id: &str, force: bool) -> anyhow::Result<()> {
    let scraper = orchestrator(settings).await?;
    println!("{} Scraping detail for product {}", style("→").cyan(), id);

    let detail = scraper
        .scrape_product_detail(id, force)
        .await
        .inspect_err(report_failure)?;
    let rating = detail
        .ratings_avg
        .map(|r| format!("{:.1}", r))
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{} Detail stored: {} specs, rating {}, {} recommendations",
        style("✓").green(),
        detail.specs.len(),
        rating,
        detail.recommendations.len()
    );
    Ok(())
}
