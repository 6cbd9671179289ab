//! Configuration module for the catalog scraper
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key has a default, so the scraper runs without a file at all; the CLI
//! overrides whatever the file sets.
//!
//! # Example
//!
//! ```no_run
//! use catalog_scraper::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("scraper.toml")).unwrap();
//! println!("Scraper will fetch {} pages", config.scraper.max_pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, FetchConfig, IdentityPolicy, OutputConfig, ScraperConfig, DEFAULT_BASE_URL,
    DEFAULT_USER_AGENTS,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
