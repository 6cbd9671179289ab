//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the scraper, including:
//! - Building the shared HTTP client
//! - Deriving catalogue page URLs
//! - Rotating browser identities across attempts
//! - Per-attempt timeouts
//! - Retry with exponential backoff
//! - Outcome classification

use crate::config::{FetchConfig, IdentityPolicy};
use crate::ScrapeError;
use rand::seq::SliceRandom;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::{Client, StatusCode};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Transport error messages are cut to this many characters in logs
const LOG_MESSAGE_LIMIT: usize = 50;

/// Why a fetch attempt, or a whole fetch, failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The attempt did not finish within the per-attempt timeout
    Timeout,

    /// The server answered with something other than 200
    HttpError(u16),

    /// Connection, TLS, decoding or other transport failure
    NetworkError(String),

    /// Every attempt failed; `last` is the failure of the final one
    Exhausted {
        attempts: u32,
        last: Box<FailureReason>,
    },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Timeout => write!(f, "timeout"),
            FailureReason::HttpError(status) => write!(f, "HTTP {}", status),
            FailureReason::NetworkError(message) => write!(f, "network error: {}", message),
            FailureReason::Exhausted { attempts, last } => {
                write!(f, "failed after {} attempts (last: {})", attempts, last)
            }
        }
    }
}

/// Result of fetching one catalogue page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// HTTP 200 with the page body
    Success { page_number: u32, content: String },

    /// Terminal failure once the retry budget is spent
    Failure {
        page_number: u32,
        reason: FailureReason,
    },
}

impl FetchOutcome {
    pub fn page_number(&self) -> u32 {
        match self {
            FetchOutcome::Success { page_number, .. }
            | FetchOutcome::Failure { page_number, .. } => *page_number,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success { .. })
    }
}

/// Anything that can turn a page number into a [`FetchOutcome`]
///
/// The coordinator is generic over this so that it can be driven by the real
/// HTTP [`Fetcher`] or by an in-memory source.
pub trait PageFetcher: Send + Sync + 'static {
    fn fetch(&self, page_number: u32) -> impl Future<Output = FetchOutcome> + Send;
}

/// Builds the HTTP client shared by every fetch of a run
///
/// No default user agent is set: each attempt sends its own identity.
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// URL of a catalogue page: `{base_url}/catalogue/page-{n}.html`
pub fn page_url(base_url: &str, page_number: u32) -> String {
    format!(
        "{}/catalogue/page-{}.html",
        base_url.trim_end_matches('/'),
        page_number
    )
}

/// Sleep after failed attempt `attempt_index` (0-based): `base * 2^attempt_index`
pub fn backoff_delay(base: Duration, attempt_index: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt_index))
}

fn truncate_message(message: &str, limit: usize) -> String {
    message.chars().take(limit).collect()
}

fn classify_error(error: reqwest::Error) -> FailureReason {
    if error.is_timeout() {
        FailureReason::Timeout
    } else {
        FailureReason::NetworkError(error.to_string())
    }
}

/// Immutable pool of browser identity strings
#[derive(Debug)]
struct IdentityPool {
    agents: Vec<String>,
    policy: IdentityPolicy,
    next: AtomicUsize,
}

impl IdentityPool {
    fn new(agents: Vec<String>, policy: IdentityPolicy) -> Self {
        Self {
            agents,
            policy,
            next: AtomicUsize::new(0),
        }
    }

    fn pick(&self) -> &str {
        if self.agents.is_empty() {
            return "";
        }
        match self.policy {
            IdentityPolicy::Random => self
                .agents
                .choose(&mut rand::thread_rng())
                .map(String::as_str)
                .unwrap_or_default(),
            IdentityPolicy::RoundRobin => {
                let index = self.next.fetch_add(1, Ordering::Relaxed) % self.agents.len();
                &self.agents[index]
            }
        }
    }
}

/// Fetches catalogue pages over HTTP with retry and backoff
pub struct Fetcher {
    client: Client,
    base_url: String,
    config: FetchConfig,
    identities: IdentityPool,
}

impl Fetcher {
    /// Creates a fetcher with its own HTTP session
    ///
    /// Failing to build the session is the one fatal setup error of a run.
    pub fn new(base_url: impl Into<String>, config: FetchConfig) -> Result<Self, ScrapeError> {
        let client = build_http_client().map_err(ScrapeError::Session)?;
        Ok(Self::with_client(client, base_url, config))
    }

    /// Creates a fetcher on top of an existing client
    pub fn with_client(client: Client, base_url: impl Into<String>, config: FetchConfig) -> Self {
        let identities = IdentityPool::new(config.user_agents.clone(), config.identity_policy);
        Self {
            client,
            base_url: base_url.into(),
            config,
            identities,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches one page, retrying until it succeeds or the budget runs out
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 200 | Success |
    /// | Any other status | warn, retry |
    /// | Timeout | warn, retry |
    /// | Transport error | error (truncated message), retry |
    ///
    /// Between attempts `i` and `i + 1` the fetcher sleeps
    /// [`backoff_delay`]`(base, i)`. There is no sleep before the first
    /// attempt or after the last one.
    pub async fn fetch_page(&self, page_number: u32) -> FetchOutcome {
        let url = page_url(&self.base_url, page_number);
        let max_attempts = self.config.max_attempts.max(1);
        let mut last = FailureReason::Timeout;

        for attempt in 0..max_attempts {
            match self.attempt(&url).await {
                Ok(content) => {
                    tracing::debug!(
                        page = page_number,
                        attempt = attempt + 1,
                        bytes = content.len(),
                        "Fetched page {}",
                        page_number
                    );
                    return FetchOutcome::Success {
                        page_number,
                        content,
                    };
                }
                Err(reason) => {
                    log_attempt_failure(page_number, attempt + 1, &reason);
                    last = reason;
                }
            }

            if attempt + 1 < max_attempts {
                tokio::time::sleep(backoff_delay(self.config.backoff_base(), attempt)).await;
            }
        }

        tracing::error!(
            page = page_number,
            attempts = max_attempts,
            "Giving up on page {} after {} attempts",
            page_number,
            max_attempts
        );

        FetchOutcome::Failure {
            page_number,
            reason: FailureReason::Exhausted {
                attempts: max_attempts,
                last: Box::new(last),
            },
        }
    }

    /// One bounded attempt: send and read the body within the timeout
    async fn attempt(&self, url: &str) -> Result<String, FailureReason> {
        let user_agent = self.identities.pick().to_string();

        tokio::time::timeout(self.config.timeout(), self.exchange(url, user_agent))
            .await
            .unwrap_or(Err(FailureReason::Timeout))
    }

    async fn exchange(&self, url: &str, user_agent: String) -> Result<String, FailureReason> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, user_agent)
            .header(ACCEPT, ACCEPT_HTML)
            .header(ACCEPT_LANGUAGE, self.config.accept_language.as_str())
            .send()
            .await
            .map_err(classify_error)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FailureReason::HttpError(status.as_u16()));
        }

        response.text().await.map_err(classify_error)
    }
}

impl PageFetcher for Fetcher {
    fn fetch(&self, page_number: u32) -> impl Future<Output = FetchOutcome> + Send {
        self.fetch_page(page_number)
    }
}

fn log_attempt_failure(page_number: u32, attempt: u32, reason: &FailureReason) {
    match reason {
        FailureReason::HttpError(status) => {
            tracing::warn!(
                page = page_number,
                attempt,
                status,
                "HTTP {} on page {}",
                status,
                page_number
            );
        }
        FailureReason::Timeout => {
            tracing::warn!(
                page = page_number,
                attempt,
                "Timeout on page {}, attempt {}",
                page_number,
                attempt
            );
        }
        FailureReason::NetworkError(message) => {
            tracing::error!(
                page = page_number,
                attempt,
                "Error on page {}: {}",
                page_number,
                truncate_message(message, LOG_MESSAGE_LIMIT)
            );
        }
        FailureReason::Exhausted { .. } => {}
    }
}
