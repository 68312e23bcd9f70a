//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod init;
mod jobs;
mod scrape;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings_with_options, LoadOptions};

#[derive(Parser)]
#[command(name = "shelfscan")]
#[command(about = "On-demand scraped book catalog")]
#[command(version)]
pub struct Cli {
    /// Data directory (overrides config file)
    #[arg(long, global = true, env = "SHELFSCAN_DATA")]
    data: Option<PathBuf>,

    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check for the verbose flag before the subscriber is installed.
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory and database
    Init,

    /// Start the JSON API server
    Serve {
        /// Address to bind, e.g. "3000" or "0.0.0.0:3000"
        bind: Option<String>,
    },

    /// Run a scrape stage once and print what was stored
    Scrape {
        #[command(subcommand)]
        command: ScrapeCommands,
    },

    /// Inspect and maintain scrape jobs
    Jobs {
        #[command(subcommand)]
        command: JobCommands,
    },
}

#[derive(Subcommand)]
enum ScrapeCommands {
    /// Scrape the site's navigation headings
    Navigation {
        /// Scrape even when stored headings are fresh
        #[arg(long)]
        force: bool,
    },

    /// Scrape a category page and its subcategory links
    Category {
        /// Category page URL
        url: String,

        /// Navigation heading to attach the category to
        #[arg(long)]
        navigation_id: Option<String>,

        #[arg(long)]
        force: bool,
    },

    /// Scrape one listing page of a category's products
    Products {
        /// Category page URL
        category_url: String,

        /// Category to attach the products to
        #[arg(long)]
        category_id: Option<String>,

        /// Listing page number
        #[arg(long, default_value = "1")]
        page: u32,

        /// Maximum products to keep from the page
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Scrape a stored product's detail page and reviews
    Product {
        /// Product ID
        id: String,

        /// Scrape even when the stored detail is fresh
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum JobCommands {
    /// List recent scrape jobs, newest first
    List {
        #[arg(short, long, default_value = "20")]
        limit: u32,

        /// Only show jobs in this status (pending, in_progress, completed, failed)
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Fail jobs left open longer than the maximum job age
    Reap {
        /// Override the configured maximum age, in seconds
        #[arg(long)]
        max_age_secs: Option<u64>,
    },
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        data: cli.data,
    };
    let (settings, _config) = load_settings_with_options(options)?;

    match cli.command {
        Commands::Init => init::cmd_init(&settings).await,
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| settings.bind_address.clone());
            serve::cmd_serve(&settings, &bind).await
        }
        Commands::Scrape { command } => match command {
            ScrapeCommands::Navigation { force } => {
                scrape::cmd_scrape_navigation(&settings, force).await
            }
            ScrapeCommands::Category {
                url,
                navigation_id,
                force,
            } => scrape::cmd_scrape_category(&settings, &url, navigation_id.as_deref(), force).await,
            ScrapeCommands::Products {
                category_url,
                category_id,
                page,
                limit,
            } => {
                scrape::cmd_scrape_products(
                    &settings,
                    &category_url,
                    category_id.as_deref(),
                    page,
                    limit,
                )
                .await
            }
            ScrapeCommands::Product { id, force } => {
                scrape::cmd_scrape_product(&settings, &id, force).await
            }
        },
        Commands::Jobs { command } => match command {
            JobCommands::List { limit, status } => {
                jobs::cmd_jobs_list(&settings, limit, status.as_deref()).await
            }
            JobCommands::Reap { max_age_secs } => jobs::cmd_jobs_reap(&settings, max_age_secs).await,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_scrape_command() {
        let cli = Cli::try_parse_from([
            "shelfscan",
            "scrape",
            "products",
            "http://books.test/fiction",
            "--page",
            "3",
            "-l",
            "5",
        ])
        .unwrap();
        match cli.command {
            Commands::Scrape {
                command:
                    ScrapeCommands::Products {
                        category_url,
                        category_id,
                        page,
                        limit,
                    },
            } => {
                assert_eq!(category_url, "http://books.test/fiction");
                assert_eq!(category_id, None);
                assert_eq!(page, 3);
                assert_eq!(limit, 5);
            }
            _ => panic!("wrong command"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["shelfscan", "jobs", "list", "-v", "--status", "failed"])
            .unwrap();
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Jobs {
                command: JobCommands::List { limit: 20, .. }
            }
        ));
    }

    #[test]
    fn serve_bind_is_optional() {
        let cli = Cli::try_parse_from(["shelfscan", "serve"]).unwrap();
        assert!(matches!(cli.command, Commands::Serve { bind: None }));
    }
}
