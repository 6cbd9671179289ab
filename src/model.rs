//! Records produced by a scraping run
//!
//! Everything here is immutable once built: listings become
//! [`ProductRecord`]s, failed pages become [`ErrorRecord`]s, and the whole run
//! is frozen into a [`RunResult`] when the coordinator finishes.

use std::time::Duration;

/// One parsed catalogue listing
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRecord {
    pub name: String,

    /// Listed price with the currency symbol stripped
    pub price: f64,

    /// Star rating 1-5, or 0 when the listing carries no recognisable rating
    pub rating: u8,

    pub in_stock: bool,

    /// Availability text as shown on the page
    pub availability: String,

    /// Absolute URL of the cover image
    pub image_url: String,

    /// Absolute URL of the product detail page
    pub detail_url: String,

    /// Catalogue page the listing was found on
    pub source_page: u32,
}

/// A page that produced no usable content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    pub page_number: u32,
    pub error: String,
}

impl ErrorRecord {
    pub fn new(page_number: u32, error: impl Into<String>) -> Self {
        Self {
            page_number,
            error: error.into(),
        }
    }
}

/// Complete output of one scraping session
///
/// Products are ordered by source page and then by position on the page;
/// errors are ordered by page number. Neither depends on the order in which
/// fetches happened to complete.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub products: Vec<ProductRecord>,
    pub errors: Vec<ErrorRecord>,
    pub elapsed: Duration,
    pub pages_attempted: u32,
}

impl RunResult {
    /// Products per second of wall-clock time, 0 for an instantaneous run
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.products.len() as f64 / secs
        } else {
            0.0
        }
    }

    /// Pages that appear in the error report
    pub fn failed_pages(&self) -> Vec<u32> {
        let mut pages: Vec<u32> = self.errors.iter().map(|e| e.page_number).collect();
        pages.dedup();
        pages
    }

    /// One-line summary of the run
    pub fn summary_line(&self) -> String {
        format!(
            "Scraped {} pages: {} products, {} errors in {:.1}s ({:.1} products/sec)",
            self.pages_attempted,
            self.products.len(),
            self.errors.len(),
            self.elapsed.as_secs_f64(),
            self.throughput()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(page: u32) -> ProductRecord {
        ProductRecord {
            name: format!("Book {}", page),
            price: 10.0,
            rating: 3,
            in_stock: true,
            availability: "In stock".to_string(),
            image_url: "http://example.com/img.jpg".to_string(),
            detail_url: "http://example.com/book".to_string(),
            source_page: page,
        }
    }

    #[test]
    fn test_throughput() {
        let result = RunResult {
            products: vec![product(1), product(1), product(2), product(3)],
            errors: vec![],
            elapsed: Duration::from_secs(2),
            pages_attempted: 3,
        };

        assert!((result.throughput() - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_throughput_zero_elapsed() {
        let result = RunResult {
            products: vec![product(1)],
            errors: vec![],
            elapsed: Duration::ZERO,
            pages_attempted: 1,
        };

        assert_eq!(result.throughput(), 0.0);
    }

    #[test]
    fn test_failed_pages() {
        let result = RunResult {
            products: vec![],
            errors: vec![ErrorRecord::new(2, "boom"), ErrorRecord::new(5, "bang")],
            elapsed: Duration::from_millis(10),
            pages_attempted: 5,
        };

        assert_eq!(result.failed_pages(), vec![2, 5]);
    }

    #[test]
    fn test_summary_line() {
        let result = RunResult {
            products: vec![product(1), product(3)],
            errors: vec![ErrorRecord::new(2, "boom")],
            elapsed: Duration::from_secs(1),
            pages_attempted: 3,
        };

        let line = result.summary_line();
        assert!(line.contains("3 pages"));
        assert!(line.contains("2 products"));
        assert!(line.contains("1 errors"));
    }
}
