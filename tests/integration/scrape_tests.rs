//! Integration tests for the scraper
//!
//! These tests use wiremock to serve catalogue pages and exercise the full
//! fetch, retry, parse and export cycle end-to-end.

use catalog_scraper::config::{Config, FetchConfig, IdentityPolicy};
use catalog_scraper::crawler::{run_scrape, FailureReason, FetchOutcome, Fetcher};
use catalog_scraper::output::{
    read_errors, read_products, sort_for_export, OutputHandler, XlsxOutputHandler,
};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builds a catalogue page with two listings unique to `page`
fn catalogue_page(page: u32) -> String {
    format!(
        r#"<html><body><ol class="row">
<li><article class="product_pod">
  <div class="image_container"><a href="book-{page}-a/index.html"><img src="../media/{page}-a.jpg" alt="A"></a></div>
  <p class="star-rating Three"></p>
  <h3><a href="book-{page}-a/index.html" title="Book {page} A">Book {page} A</a></h3>
  <div class="product_price">
    <p class="price_color">£{page}1.50</p>
    <p class="instock availability"><i class="icon-ok"></i> In stock</p>
  </div>
</article></li>
<li><article class="product_pod">
  <div class="image_container"><a href="book-{page}-b/index.html"><img src="../media/{page}-b.jpg" alt="B"></a></div>
  <p class="star-rating Five"></p>
  <h3><a href="book-{page}-b/index.html" title="Book {page} B">Book {page} B</a></h3>
  <div class="product_price">
    <p class="price_color">£{page}2.25</p>
    <p class="instock availability">Out of stock</p>
  </div>
</article></li>
</ol></body></html>"#,
        page = page
    )
}

fn page_path(page: u32) -> String {
    format!("/catalogue/page-{}.html", page)
}

/// Creates a test configuration with fast retries against `base_url`
fn create_test_config(base_url: &str, max_pages: u32) -> Config {
    let mut config = Config::default();
    config.scraper.base_url = base_url.to_string();
    config.scraper.max_pages = max_pages;
    config.scraper.max_concurrent = 5;
    config.fetch.backoff_base_ms = 10;
    config.fetch.timeout_secs = 1;
    config.fetch.max_attempts = 3;
    config
}

async fn mount_page(server: &MockServer, page: u32) {
    Mock::given(method("GET"))
        .and(path(page_path(page)))
        .respond_with(ResponseTemplate::new(200).set_body_string(catalogue_page(page)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_partial_failure_run() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, 1).await;
    mount_page(&mock_server, 3).await;
    Mock::given(method("GET"))
        .and(path(page_path(2)))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), 3);
    let result = run_scrape(&config, false).await.unwrap();

    assert_eq!(result.pages_attempted, 3);
    assert_eq!(result.products.len(), 4);
    let pages: Vec<u32> = result.products.iter().map(|p| p.source_page).collect();
    assert_eq!(pages, vec![1, 1, 3, 3]);

    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].page_number, 2);
    assert!(result.errors[0].error.starts_with("Failed to fetch"));
    assert!(result.errors[0].error.contains("HTTP 500"));
}

#[tokio::test]
async fn test_listing_fields_and_links() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, 1).await;

    let config = create_test_config(&mock_server.uri(), 1);
    let result = run_scrape(&config, false).await.unwrap();

    let first = &result.products[0];
    assert_eq!(first.name, "Book 1 A");
    assert_eq!(first.price, 11.5);
    assert_eq!(first.rating, 3);
    assert!(first.in_stock);
    assert_eq!(first.availability, "In stock");
    assert_eq!(
        first.detail_url,
        format!("{}/catalogue/book-1-a/index.html", mock_server.uri())
    );
    assert_eq!(first.image_url, format!("{}/media/1-a.jpg", mock_server.uri()));

    let second = &result.products[1];
    assert_eq!(second.rating, 5);
    assert!(!second.in_stock);
    assert_eq!(second.price, 12.25);
}

#[tokio::test]
async fn test_retry_backoff_timing() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri(), 1);
    config.fetch.backoff_base_ms = 50;

    let started = Instant::now();
    let result = run_scrape(&config, false).await.unwrap();

    // 50ms after the first attempt, 100ms after the second, none after the last
    assert!(started.elapsed() >= Duration::from_millis(150));
    assert_eq!(result.errors.len(), 1);
    assert!(result.products.is_empty());
}

#[tokio::test]
async fn test_transient_failure_recovers() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(page_path(1)))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, 1).await;

    let config = create_test_config(&mock_server.uri(), 1);
    let result = run_scrape(&config, false).await.unwrap();

    assert!(result.errors.is_empty());
    assert_eq!(result.products.len(), 2);
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_client_errors_are_retried() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(3)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), 1);
    let result = run_scrape(&config, false).await.unwrap();

    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].error.contains("HTTP 404"));
}

#[tokio::test]
async fn test_attempt_timeout() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(catalogue_page(1))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let config = FetchConfig {
        timeout_secs: 1,
        max_attempts: 2,
        backoff_base_ms: 10,
        ..FetchConfig::default()
    };
    let fetcher = Fetcher::new(mock_server.uri(), config).unwrap();

    let started = Instant::now();
    let outcome = fetcher.fetch_page(1).await;

    assert_eq!(
        outcome,
        FetchOutcome::Failure {
            page_number: 1,
            reason: FailureReason::Exhausted {
                attempts: 2,
                last: Box::new(FailureReason::Timeout),
            },
        }
    );
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn test_browser_headers_sent() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("accept-language", "en-GB"))
        .and(header_exists("user-agent"))
        .and(header_exists("accept"))
        .respond_with(ResponseTemplate::new(200).set_body_string(catalogue_page(1)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri(), 1);
    config.fetch.accept_language = "en-GB".to_string();
    let result = run_scrape(&config, false).await.unwrap();

    assert!(result.errors.is_empty());
}

#[tokio::test]
async fn test_round_robin_identities() {
    let mock_server = MockServer::start().await;
    for agent in ["agent-a", "agent-b"] {
        Mock::given(method("GET"))
            .and(header("user-agent", agent))
            .respond_with(ResponseTemplate::new(200).set_body_string(catalogue_page(1)))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let mut config = create_test_config(&mock_server.uri(), 2);
    config.scraper.max_concurrent = 1;
    config.fetch.identity_policy = IdentityPolicy::RoundRobin;
    config.fetch.user_agents = vec!["agent-a".to_string(), "agent-b".to_string()];

    let result = run_scrape(&config, false).await.unwrap();
    assert!(result.errors.is_empty());
}

#[tokio::test]
async fn test_unreadable_page_recorded_as_parse_error() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, 1).await;
    Mock::given(method("GET"))
        .and(path(page_path(2)))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), 2);
    let result = run_scrape(&config, false).await.unwrap();

    assert_eq!(result.products.len(), 2);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].page_number, 2);
    assert!(result.errors[0].error.starts_with("Parse error"));
}

#[tokio::test]
async fn test_each_page_requested_once() {
    let mock_server = MockServer::start().await;
    for page in 1..=8 {
        mount_page(&mock_server, page).await;
    }

    let mut config = create_test_config(&mock_server.uri(), 8);
    config.scraper.max_concurrent = 3;
    let result = run_scrape(&config, false).await.unwrap();

    assert_eq!(result.products.len(), 16);
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 8);
}

#[tokio::test]
async fn test_repeated_runs_are_identical() {
    let mock_server = MockServer::start().await;
    for page in 1..=4 {
        mount_page(&mock_server, page).await;
    }

    let config = create_test_config(&mock_server.uri(), 4);
    let first = run_scrape(&config, false).await.unwrap();
    let second = run_scrape(&config, false).await.unwrap();

    assert_eq!(first.products, second.products);
    assert_eq!(first.errors, second.errors);
}

#[tokio::test]
async fn test_zero_pages() {
    let mock_server = MockServer::start().await;

    let config = create_test_config(&mock_server.uri(), 0);
    let result = run_scrape(&config, false).await.unwrap();

    assert!(result.products.is_empty());
    assert!(result.errors.is_empty());
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_concurrency_is_rejected() {
    let mut config = create_test_config("http://127.0.0.1:9", 1);
    config.scraper.max_concurrent = 0;

    assert!(run_scrape(&config, false).await.is_err());
}

#[tokio::test]
async fn test_concurrency_above_page_count() {
    let mock_server = MockServer::start().await;
    for page in 1..=3 {
        mount_page(&mock_server, page).await;
    }

    let mut config = create_test_config(&mock_server.uri(), 3);
    config.scraper.max_concurrent = 150;
    let result = run_scrape(&config, false).await.unwrap();

    assert_eq!(result.products.len(), 6);
    assert!(result.errors.is_empty());
}

#[tokio::test]
async fn test_connection_refused_is_retried() {
    // Bind then drop a listener to get a local port nobody is serving
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();

    let config = FetchConfig {
        max_attempts: 3,
        backoff_base_ms: 10,
        ..FetchConfig::default()
    };
    let fetcher = Fetcher::new(format!("http://127.0.0.1:{}", port), config).unwrap();

    match fetcher.fetch_page(1).await {
        FetchOutcome::Failure {
            page_number: 1,
            reason: FailureReason::Exhausted { attempts, last },
        } => {
            assert_eq!(attempts, 3);
            assert!(matches!(*last, FailureReason::NetworkError(_)));
        }
        other => panic!("expected exhausted network failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_export_round_trip() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, 1).await;
    mount_page(&mock_server, 2).await;
    Mock::given(method("GET"))
        .and(path(page_path(3)))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), 3);
    let result = run_scrape(&config, false).await.unwrap();

    let dir = TempDir::new().unwrap();
    let handler =
        XlsxOutputHandler::with_timestamp(dir.path().join("products.xlsx"), "20240101_000000");
    let artifacts = handler.export(&result).unwrap();

    let products = read_products(&artifacts.products_file.unwrap()).unwrap();
    assert_eq!(products, sort_for_export(&result.products));
    assert_eq!(products[0].rating, 5);

    let errors = read_errors(&artifacts.errors_file.unwrap()).unwrap();
    assert_eq!(errors, result.errors);
}
