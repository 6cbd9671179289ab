//! Scrape coordinator - main orchestration logic
//!
//! This module drives a whole run:
//! - Dispatching one task per catalogue page
//! - Gating every task through the concurrency limiter
//! - Fetching, then handing successful pages to the page processor
//! - Collecting reports in completion order into a single result
//! - Reporting progress and final counters

use crate::crawler::fetcher::{FetchOutcome, PageFetcher};
use crate::crawler::limiter::Limiter;
use crate::crawler::parser::PageProcessor;
use crate::model::{ErrorRecord, ProductRecord, RunResult};
use crate::{ConfigError, ScrapeError};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;

/// What one page task hands back to the collector
#[derive(Debug)]
struct PageReport {
    page_number: u32,
    products: Vec<ProductRecord>,
    error: Option<String>,
}

impl PageReport {
    fn parsed(page_number: u32, products: Vec<ProductRecord>) -> Self {
        Self {
            page_number,
            products,
            error: None,
        }
    }

    fn failed(page_number: u32, error: String) -> Self {
        Self {
            page_number,
            products: Vec::new(),
            error: Some(error),
        }
    }
}

/// Main scrape coordinator
///
/// Generic over the page source and the page processor so the pipeline can
/// run against the network or against fixed content.
pub struct Coordinator<F, P> {
    fetcher: Arc<F>,
    processor: Arc<P>,
    limiter: Limiter,
    max_pages: u32,
    show_progress: bool,
}

impl<F, P> Coordinator<F, P>
where
    F: PageFetcher,
    P: PageProcessor,
{
    /// Creates a coordinator for pages `1..=max_pages`
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(ScrapeError)` - `max_concurrent` is zero or out of range
    pub fn new(
        fetcher: F,
        processor: P,
        max_concurrent: usize,
        max_pages: u32,
    ) -> Result<Self, ScrapeError> {
        let limiter = Limiter::new(max_concurrent)
            .map_err(|e| ConfigError::Validation(e.to_string()))?;

        Ok(Self {
            fetcher: Arc::new(fetcher),
            processor: Arc::new(processor),
            limiter,
            max_pages,
            show_progress: false,
        })
    }

    /// Shows a progress bar on stderr while the run is going
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.show_progress = enabled;
        self
    }

    pub fn limiter(&self) -> &Limiter {
        &self.limiter
    }

    /// Runs every page to completion and returns the frozen result
    ///
    /// Individual page failures end up in `RunResult::errors`; nothing a
    /// single page does can abort the run.
    pub async fn run(&self) -> RunResult {
        tracing::info!(
            "Starting scrape: {} pages, max {} concurrent",
            self.max_pages,
            self.limiter.capacity()
        );

        let start_time = Instant::now();
        let progress = self.progress_bar();

        let mut tasks = JoinSet::new();
        for page_number in 1..=self.max_pages {
            tasks.spawn(scrape_page(
                Arc::clone(&self.fetcher),
                Arc::clone(&self.processor),
                self.limiter.clone(),
                page_number,
            ));
        }

        // Single writer: only this loop touches the collected reports
        let mut reports = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(report) => {
                    tracing::debug!(
                        page = report.page_number,
                        products = report.products.len(),
                        failed = report.error.is_some(),
                        "Page {} finished",
                        report.page_number
                    );
                    reports.insert(report.page_number, report);
                }
                Err(e) => tracing::error!("Page task did not complete: {}", e),
            }
            progress.inc(1);
        }
        progress.finish_and_clear();

        let (products, errors) = self.assemble(reports);
        let result = RunResult {
            products,
            errors,
            elapsed: start_time.elapsed(),
            pages_attempted: self.max_pages,
        };

        tracing::info!(
            "Scraping complete in {:.1}s",
            result.elapsed.as_secs_f64()
        );
        tracing::info!("Products found: {}", result.products.len());
        tracing::info!("Errors: {}", result.errors.len());
        tracing::info!("Speed: {:.1} products/second", result.throughput());

        result
    }

    /// Flattens reports in page order; pages with no report become errors
    fn assemble(
        &self,
        mut reports: BTreeMap<u32, PageReport>,
    ) -> (Vec<ProductRecord>, Vec<ErrorRecord>) {
        let mut products = Vec::new();
        let mut errors = Vec::new();

        for page_number in 1..=self.max_pages {
            match reports.remove(&page_number) {
                Some(report) => {
                    products.extend(report.products);
                    if let Some(error) = report.error {
                        errors.push(ErrorRecord::new(page_number, error));
                    }
                }
                None => errors.push(ErrorRecord::new(
                    page_number,
                    "Page task aborted before reporting",
                )),
            }
        }

        (products, errors)
    }

    fn progress_bar(&self) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let bar = ProgressBar::new(u64::from(self.max_pages));
        bar.set_style(
            ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len} ({elapsed})")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.set_message("Scraping pages");
        bar
    }
}

/// One page from admission to report
///
/// The permit is held across fetch and processing and dropped on every exit
/// path, including panics and task aborts.
async fn scrape_page<F, P>(
    fetcher: Arc<F>,
    processor: Arc<P>,
    limiter: Limiter,
    page_number: u32,
) -> PageReport
where
    F: PageFetcher,
    P: PageProcessor,
{
    let _permit = match limiter.acquire().await {
        Ok(permit) => permit,
        Err(e) => return PageReport::failed(page_number, format!("Not scheduled: {}", e)),
    };

    match fetcher.fetch(page_number).await {
        FetchOutcome::Success { content, .. } => match processor.process(&content, page_number) {
            Ok(products) => PageReport::parsed(page_number, products),
            Err(e) => {
                tracing::error!("Parse error at page {}: {}", page_number, e);
                PageReport::failed(page_number, format!("Parse error: {}", e))
            }
        },
        FetchOutcome::Failure { reason, .. } => {
            PageReport::failed(page_number, format!("Failed to fetch: {}", reason))
        }
    }
}
