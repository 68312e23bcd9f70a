//! Scrape job commands.

use std::time::Duration;

use console::style;

use crate::config::Settings;
use crate::models::{ScrapeJob, ScrapeJobStatus};
use crate::services::JobTracker;

pub async fn cmd_jobs_list(
    settings: &Settings,
    limit: u32,
    status: Option<&str>,
) -> anyhow::Result<()> {
    let status = match status {
        Some(s) => Some(
            ScrapeJobStatus::from_str(s)
                .ok_or_else(|| anyhow::anyhow!("Unknown job status: {}", s))?,
        ),
        None => None,
    };

    let ctx = settings.create_db_context()?;
    ctx.init_schema().await?;
    let jobs = ctx.scrape_jobs().list_recent(limit, status).await?;

    if jobs.is_empty() {
        println!("{} No scrape jobs", style("!").yellow());
        return Ok(());
    }

    println!(
        "{:<36} {:<12} {:<14} {:<20} TARGET",
        "ID", "STATUS", "TYPE", "CREATED"
    );
    for job in &jobs {
        print_job(job);
    }
    Ok(())
}

fn print_job(job: &ScrapeJob) {
    let status = match job.status {
        ScrapeJobStatus::Completed => style(job.status.as_str()).green(),
        ScrapeJobStatus::Failed => style(job.status.as_str()).red(),
        _ => style(job.status.as_str()).yellow(),
    };
    println!(
        "{:<36} {:<12} {:<14} {:<20} {}",
        job.id,
        status,
        job.target_type.as_str(),
        job.created_at.format("%Y-%m-%d %H:%M:%S"),
        job.target_url
    );
    if let Some(ref error) = job.error_log {
        println!("  {} {}", style("✗").red(), error);
    }
}

/// Fail jobs stuck in `pending` or `in_progress`, as the server watchdog does.
pub async fn cmd_jobs_reap(settings: &Settings, max_age_secs: Option<u64>) -> anyhow::Result<()> {
    let max_age = max_age_secs
        .map(Duration::from_secs)
        .unwrap_or(settings.scraper.job_max_age);

    let ctx = settings.create_db_context()?;
    ctx.init_schema().await?;
    let reaped = JobTracker::new(&ctx).reap_stale(max_age).await?;

    if reaped == 0 {
        println!("{} No abandoned jobs", style("✓").green());
    } else {
        println!(
            "{} Marked {} abandoned jobs as failed",
            style("!").yellow(),
            reaped
        );
    }
    Ok(())
}
