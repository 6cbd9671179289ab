//! Crawler module for catalogue fetching and processing
//!
//! This module contains the core scraping pipeline, including:
//! - Concurrency limiting
//! - HTTP fetching with timeout, retry and backoff
//! - Catalogue page parsing
//! - Overall run coordination

mod coordinator;
mod fetcher;
mod limiter;
mod parser;

pub use coordinator::Coordinator;
pub use fetcher::{
    backoff_delay, build_http_client, page_url, FailureReason, FetchOutcome, Fetcher, PageFetcher,
};
pub use limiter::{Limiter, LimiterError, Permit};
pub use parser::{CatalogueParser, ListingParseError, PageParseError, PageProcessor};

use crate::config::{validate, Config};
use crate::model::RunResult;
use crate::ScrapeError;

/// Runs a complete scrape against the configured store
///
/// This is the main entry point for a run. It will:
/// 1. Validate the configuration
/// 2. Build the shared HTTP session
/// 3. Fetch and parse pages `1..=max_pages` under the concurrency cap
/// 4. Return the collected products and errors
///
/// # Arguments
///
/// * `config` - The scraper configuration
/// * `show_progress` - Whether to draw a progress bar
///
/// # Returns
///
/// * `Ok(RunResult)` - The run finished; individual pages may still have failed
/// * `Err(ScrapeError)` - Setup failed before any page was fetched
///
/// # Example
///
/// ```no_run
/// use catalog_scraper::config::Config;
/// use catalog_scraper::crawler::run_scrape;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let result = run_scrape(&Config::default(), false).await?;
/// println!("{}", result.summary_line());
/// # Ok(())
/// # }
/// ```
pub async fn run_scrape(config: &Config, show_progress: bool) -> Result<RunResult, ScrapeError> {
    validate(config)?;

    let fetcher = Fetcher::new(config.scraper.base_url.clone(), config.fetch.clone())?;
    let parser = CatalogueParser::new(config.scraper.base_url.clone())?;

    let coordinator = Coordinator::new(
        fetcher,
        parser,
        config.scraper.max_concurrent,
        config.scraper.max_pages,
    )?
    .with_progress(show_progress);

    Ok(coordinator.run().await)
}
