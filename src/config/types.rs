use serde::Deserialize;
use std::time::Duration;

/// Default catalogue host
pub const DEFAULT_BASE_URL: &str = "http://books.toscrape.com";

/// Browser identities rotated across fetch attempts
pub const DEFAULT_USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

/// Main configuration structure for the scraper
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// What to scrape and how wide to go
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScraperConfig {
    /// Store root; pages live under `{base_url}/catalogue/`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Number of catalogue pages to fetch, starting at page 1
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Maximum number of fetches in flight at once
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            max_pages: default_max_pages(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

/// How a browser identity is picked for each attempt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentityPolicy {
    #[default]
    Random,
    RoundRobin,
}

/// Per-request behaviour of the fetcher
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FetchConfig {
    /// Hard limit for a single attempt, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Total attempts per page, the first one included
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff unit in milliseconds; attempt `i` waits `base * 2^i` before the next
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    #[serde(default = "default_accept_language")]
    pub accept_language: String,

    #[serde(default)]
    pub identity_policy: IdentityPolicy,

    #[serde(default = "default_user_agents")]
    pub user_agents: Vec<String>,
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            accept_language: default_accept_language(),
            identity_policy: IdentityPolicy::default(),
            user_agents: default_user_agents(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Products workbook; a timestamp is appended to the file stem
    #[serde(default = "default_products_path")]
    pub products_path: String,

    /// Persistent log file
    #[serde(default = "default_log_path")]
    pub log_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            products_path: default_products_path(),
            log_path: default_log_path(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_max_pages() -> u32 {
    10
}

fn default_max_concurrent() -> usize {
    5
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_accept_language() -> String {
    "en-US,en;q=0.5".to_string()
}

fn default_user_agents() -> Vec<String> {
    DEFAULT_USER_AGENTS.iter().map(|ua| ua.to_string()).collect()
}

fn default_products_path() -> String {
    "products.xlsx".to_string()
}

fn default_log_path() -> String {
    "scraper.log".to_string()
}
