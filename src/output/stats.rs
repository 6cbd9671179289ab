//! Summary statistics over collected products
//!
//! This module computes and displays the end-of-run summary: totals, price
//! figures, stock levels and the rating distribution.

use crate::model::ProductRecord;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Product statistics summary
#[derive(Debug, Clone, PartialEq)]
pub struct ProductStatistics {
    /// Total number of products collected
    pub total_products: usize,

    pub average_price: f64,
    pub min_price: f64,
    pub max_price: f64,

    /// Number of products marked in stock
    pub in_stock: usize,

    pub average_rating: f64,

    /// Product count per rating value, ascending by rating
    pub rating_distribution: BTreeMap<u8, usize>,
}

impl ProductStatistics {
    /// Computes statistics, or `None` when nothing was collected
    pub fn from_products(products: &[ProductRecord]) -> Option<Self> {
        if products.is_empty() {
            return None;
        }

        let total = products.len();
        let prices = products.iter().map(|p| p.price);
        let min_price = prices.clone().fold(f64::INFINITY, f64::min);
        let max_price = prices.clone().fold(f64::NEG_INFINITY, f64::max);
        let average_price = prices.sum::<f64>() / total as f64;

        let mut rating_distribution = BTreeMap::new();
        for product in products {
            *rating_distribution.entry(product.rating).or_insert(0) += 1;
        }

        Some(Self {
            total_products: total,
            average_price,
            min_price,
            max_price,
            in_stock: products.iter().filter(|p| p.in_stock).count(),
            average_rating: products.iter().map(|p| f64::from(p.rating)).sum::<f64>()
                / total as f64,
            rating_distribution,
        })
    }

    /// Share of products in stock, as a percentage
    pub fn in_stock_percentage(&self) -> f64 {
        if self.total_products == 0 {
            return 0.0;
        }
        self.in_stock as f64 / self.total_products as f64 * 100.0
    }

    /// Renders the summary block shown after a run
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", "=".repeat(70));
        let _ = writeln!(out, "Summary");
        let _ = writeln!(out, "Total products:        {}", self.total_products);
        let _ = writeln!(out, "Average price:         {:.2}", self.average_price);
        let _ = writeln!(
            out,
            "Price range:           {:.2} - {:.2}",
            self.min_price, self.max_price
        );
        let _ = writeln!(
            out,
            "In stock:              {} ({:.1}%)",
            self.in_stock,
            self.in_stock_percentage()
        );
        let _ = writeln!(out, "Average rating:        {:.2}/5", self.average_rating);
        let _ = writeln!(out, "\nRating distribution:");
        for (rating, count) in &self.rating_distribution {
            let _ = writeln!(out, "  {}: {}", rating, count);
        }
        out
    }
}

/// Prints statistics to stdout
///
/// # Arguments
///
/// * `products` - The collected products, in any order
pub fn print_statistics(products: &[ProductRecord]) {
    match ProductStatistics::from_products(products) {
        Some(stats) => print!("\n{}", stats.render()),
        None => println!("No data collected"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(price: f64, rating: u8, in_stock: bool) -> ProductRecord {
        ProductRecord {
            name: format!("book-{}", price),
            price,
            rating,
            in_stock,
            availability: String::new(),
            image_url: String::new(),
            detail_url: String::new(),
            source_page: 1,
        }
    }

    #[test]
    fn test_empty_products_have_no_statistics() {
        assert!(ProductStatistics::from_products(&[]).is_none());
    }

    #[test]
    fn test_statistics_figures() {
        let stats = ProductStatistics::from_products(&[
            product(10.0, 5, true),
            product(20.0, 3, false),
            product(30.0, 5, true),
            product(40.0, 1, true),
        ])
        .unwrap();

        assert_eq!(stats.total_products, 4);
        assert_eq!(stats.average_price, 25.0);
        assert_eq!(stats.min_price, 10.0);
        assert_eq!(stats.max_price, 40.0);
        assert_eq!(stats.in_stock, 3);
        assert_eq!(stats.in_stock_percentage(), 75.0);
        assert_eq!(stats.average_rating, 3.5);
        assert_eq!(
            stats.rating_distribution.into_iter().collect::<Vec<_>>(),
            vec![(1, 1), (3, 1), (5, 2)]
        );
    }

    #[test]
    fn test_render() {
        let products = [product(51.77, 3, true), product(53.74, 1, false)];
        let stats = ProductStatistics::from_products(&products).unwrap();
        let rendered = stats.render();

        assert!(rendered.contains("Total products:        2"));
        assert!(rendered.contains("Price range:           51.77 - 53.74"));
        assert!(rendered.contains("In stock:              1 (50.0%)"));
        assert!(rendered.contains("Average rating:        2.00/5"));
        assert!(rendered.contains("  1: 1\n  3: 1\n"));
    }
}
