//! Catalog Scraper main entry point
//!
//! This is the command-line interface for the catalogue scraper.

use anyhow::Context;
use catalog_scraper::config::{load_config_with_hash, validate, Config};
use catalog_scraper::crawler::run_scrape;
use catalog_scraper::logging::init_logging;
use catalog_scraper::output::{print_statistics, OutputHandler, XlsxOutputHandler};
use clap::Parser;
use std::path::{Path, PathBuf};

/// Catalog Scraper: a bounded-concurrency product harvester
///
/// Fetches catalogue pages 1..=N concurrently, retries failures with
/// exponential backoff, and exports the products to a timestamped spreadsheet.
#[derive(Parser, Debug)]
#[command(name = "catalog-scraper")]
#[command(version = "1.0.0")]
#[command(about = "E-commerce catalogue scraper", long_about = None)]
#[command(after_help = "Examples:\n  catalog-scraper --pages 10\n  catalog-scraper --pages 50 --output my_products.xlsx\n  catalog-scraper --pages 100 --concurrent 10")]
struct Cli {
    /// Number of pages to scrape [default: 10]
    #[arg(long)]
    pages: Option<u32>,

    /// Output file name [default: products.xlsx]
    #[arg(long)]
    output: Option<PathBuf>,

    /// Max concurrent requests [default: 5]
    #[arg(long)]
    concurrent: Option<usize>,

    /// Catalogue root URL
    #[arg(long)]
    base_url: Option<String>,

    /// Path to an optional TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log file path [default: scraper.log]
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Do not draw the progress bar
    #[arg(long)]
    no_progress: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the file configuration
    fn apply(&self, config: &mut Config) {
        if let Some(pages) = self.pages {
            config.scraper.max_pages = pages;
        }
        if let Some(concurrent) = self.concurrent {
            config.scraper.max_concurrent = concurrent;
        }
        if let Some(base_url) = &self.base_url {
            config.scraper.base_url = base_url.clone();
        }
        if let Some(output) = &self.output {
            config.output.products_path = output.to_string_lossy().into_owned();
        }
        if let Some(log_file) = &self.log_file {
            config.output.log_path = log_file.to_string_lossy().into_owned();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (mut config, config_hash) = match &cli.config {
        Some(path) => {
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            (config, Some(hash))
        }
        None => (Config::default(), None),
    };
    cli.apply(&mut config);
    validate(&config).context("Invalid configuration")?;

    let _guard = init_logging(cli.verbose, cli.quiet, Path::new(&config.output.log_path))
        .context("Failed to initialise logging")?;

    if let (Some(path), Some(hash)) = (&cli.config, &config_hash) {
        tracing::info!("Configuration loaded from {} (hash: {})", path.display(), hash);
    }
    tracing::info!(
        "Starting scrape of {} pages with {} concurrent requests",
        config.scraper.max_pages,
        config.scraper.max_concurrent
    );

    let show_progress = !(cli.no_progress || cli.quiet);
    let result = run_scrape(&config, show_progress).await.map_err(|e| {
        tracing::error!("Scrape failed: {}", e);
        e
    })?;

    if !cli.quiet {
        println!("{}", result.summary_line());
        print_statistics(&result.products);
    }

    let handler = XlsxOutputHandler::new(&config.output.products_path);
    let artifacts = handler.export(&result).context("Failed to export results")?;

    if !cli.quiet {
        if let Some(path) = &artifacts.products_file {
            println!("\nSaved results to {}", path.display());
        }
        if let Some(path) = &artifacts.errors_file {
            println!("Saved error report to {}", path.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_leave_config_untouched() {
        let cli = Cli::parse_from(["catalog-scraper"]);
        let mut config = Config::default();
        cli.apply(&mut config);

        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "catalog-scraper",
            "--pages",
            "50",
            "--output",
            "my_products.xlsx",
            "--concurrent",
            "10",
            "--log-file",
            "logs/run.log",
        ]);
        let mut config = Config::default();
        cli.apply(&mut config);

        assert_eq!(config.scraper.max_pages, 50);
        assert_eq!(config.scraper.max_concurrent, 10);
        assert_eq!(config.output.products_path, "my_products.xlsx");
        assert_eq!(config.output.log_path, "logs/run.log");
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["catalog-scraper", "-q", "-v"]).is_err());
    }
}
