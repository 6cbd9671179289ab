//! Catalog Scraper: a bounded-concurrency catalogue harvester
//!
//! This crate fetches paginated catalogue pages from a web store under a
//! concurrency cap, retries failed pages with exponential backoff, extracts
//! product listings, and exports the results to spreadsheets.

pub mod config;
pub mod crawler;
pub mod logging;
pub mod model;
pub mod output;

use thiserror::Error;

/// Main error type for scraper operations
///
/// Only setup and export failures surface here. Per-page fetch and parse
/// failures are recorded as [`model::ErrorRecord`]s and never abort a run.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to establish HTTP session: {0}")]
    Session(#[source] reqwest::Error),

    #[error("Parser setup error: {0}")]
    Parser(#[from] crawler::PageParseError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Logging setup error: {0}")]
    Logging(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for scraper operations
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_scrape, Coordinator, FetchOutcome, Fetcher};
pub use model::{ErrorRecord, ProductRecord, RunResult};
