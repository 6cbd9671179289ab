//! Catalogue page parser
//!
//! This module turns the HTML of one catalogue page into product records:
//! - Each `article.product_pod` listing is parsed independently
//! - A broken listing is logged and skipped, its siblings survive
//! - Only content that is not a document at all fails the whole page
//!
//! Field rules follow the books.toscrape.com markup.

use crate::crawler::fetcher::page_url;
use crate::model::ProductRecord;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use url::Url;

/// The page as a whole could not be read
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PageParseError {
    #[error("empty document")]
    EmptyDocument,

    #[error("content is not markup")]
    NotMarkup,

    #[error("invalid page URL: {0}")]
    InvalidPageUrl(String),

    #[error("invalid selector {0}")]
    InvalidSelector(String),
}

/// One listing could not be turned into a record
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListingParseError {
    #[error("missing {0}")]
    MissingField(&'static str),

    #[error("unparseable price '{0}'")]
    InvalidPrice(String),

    #[error("unresolvable link '{0}'")]
    InvalidLink(String),
}

/// Turns raw page content into product records
///
/// Implementations must not fail the page because of a single bad listing.
pub trait PageProcessor: Send + Sync + 'static {
    fn process(&self, content: &str, page_number: u32)
        -> Result<Vec<ProductRecord>, PageParseError>;
}

/// Compiled selectors for the catalogue markup
struct Selectors {
    listing: Selector,
    title_link: Selector,
    price: Selector,
    rating: Selector,
    availability: Selector,
    image: Selector,
}

impl Selectors {
    fn compile() -> Result<Self, PageParseError> {
        Ok(Self {
            listing: compile("article.product_pod")?,
            title_link: compile("h3 > a")?,
            price: compile(".price_color")?,
            rating: compile(".star-rating")?,
            availability: compile(".instock.availability")?,
            image: compile("img")?,
        })
    }
}

fn compile(css: &str) -> Result<Selector, PageParseError> {
    Selector::parse(css).map_err(|e| PageParseError::InvalidSelector(format!("{}: {:?}", css, e)))
}

/// Parser for paginated catalogue pages
///
/// Selectors are compiled once, when the parser is built.
pub struct CatalogueParser {
    base_url: String,
    selectors: Selectors,
}

impl CatalogueParser {
    /// Creates a parser resolving links against pages of `base_url`
    pub fn new(base_url: impl Into<String>) -> Result<Self, PageParseError> {
        Ok(Self {
            base_url: base_url.into(),
            selectors: Selectors::compile()?,
        })
    }

    /// Parses one catalogue page
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<ProductRecord>)` - Listings in document order, possibly empty
    /// * `Err(PageParseError)` - The content is not a readable document
    ///
    /// # Example
    ///
    /// ```
    /// use catalog_scraper::crawler::CatalogueParser;
    ///
    /// let html = r#"<html><body><article class="product_pod">
    ///   <div class="image_container"><a href="a_1/index.html"><img src="../media/a.jpg"></a></div>
    ///   <p class="star-rating Four"></p>
    ///   <h3><a href="a_1/index.html" title="A Book">A Book</a></h3>
    ///   <p class="price_color">£12.50</p>
    ///   <p class="instock availability">In stock</p>
    /// </article></body></html>"#;
    ///
    /// let parser = CatalogueParser::new("http://books.toscrape.com").unwrap();
    /// let products = parser.parse_page(html, 1).unwrap();
    /// assert_eq!(products[0].rating, 4);
    /// ```
    pub fn parse_page(
        &self,
        html: &str,
        page_number: u32,
    ) -> Result<Vec<ProductRecord>, PageParseError> {
        let trimmed = html.trim();
        if trimmed.is_empty() {
            return Err(PageParseError::EmptyDocument);
        }
        if !trimmed.contains('<') {
            return Err(PageParseError::NotMarkup);
        }

        let page = Url::parse(&page_url(&self.base_url, page_number))
            .map_err(|e| PageParseError::InvalidPageUrl(e.to_string()))?;

        let selectors = &self.selectors;
        let document = Html::parse_document(html);
        let mut products = Vec::new();

        for (index, listing) in document.select(&selectors.listing).enumerate() {
            match parse_listing(selectors, listing, &page, page_number) {
                Ok(product) => products.push(product),
                Err(e) => {
                    tracing::warn!(
                        page = page_number,
                        listing = index,
                        "Failed to parse product on page {}: {}",
                        page_number,
                        e
                    );
                }
            }
        }

        tracing::debug!(
            page = page_number,
            products = products.len(),
            "Parsed page {}",
            page_number
        );

        Ok(products)
    }
}

fn parse_listing(
    selectors: &Selectors,
    listing: ElementRef<'_>,
    page: &Url,
    page_number: u32,
) -> Result<ProductRecord, ListingParseError> {
    let title_link = listing
        .select(&selectors.title_link)
        .next()
        .ok_or(ListingParseError::MissingField("title link"))?;

    let name = title_link
        .value()
        .attr("title")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(ListingParseError::MissingField("title"))?
        .to_string();

    let detail_href = title_link
        .value()
        .attr("href")
        .ok_or(ListingParseError::MissingField("product link"))?;
    let detail_url = resolve(page, detail_href)?;

    let price_text = text_of(listing, &selectors.price)
        .ok_or(ListingParseError::MissingField("price"))?;
    let price = parse_price(&price_text)?;

    let rating = listing
        .select(&selectors.rating)
        .next()
        .ok_or(ListingParseError::MissingField("rating"))
        .map(|el| rating_from_classes(el.value().attr("class").unwrap_or_default()))?;

    let availability = text_of(listing, &selectors.availability)
        .ok_or(ListingParseError::MissingField("availability"))?;
    let in_stock = availability.contains("In stock");

    let image_src = listing
        .select(&selectors.image)
        .next()
        .and_then(|img| img.value().attr("src"))
        .ok_or(ListingParseError::MissingField("image"))?;
    let image_url = resolve(page, image_src)?;

    Ok(ProductRecord {
        name,
        price,
        rating,
        in_stock,
        availability,
        image_url,
        detail_url,
        source_page: page_number,
    })
}

impl PageProcessor for CatalogueParser {
    fn process(
        &self,
        content: &str,
        page_number: u32,
    ) -> Result<Vec<ProductRecord>, PageParseError> {
        self.parse_page(content, page_number)
    }
}

/// Trimmed text of the first element matching `selector`
fn text_of(element: ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
}

/// Strips the currency symbol (and any mis-decoded prefix) and parses the amount
fn parse_price(text: &str) -> Result<f64, ListingParseError> {
    let amount = text.trim_matches(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'));
    amount
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite())
        .ok_or_else(|| ListingParseError::InvalidPrice(text.to_string()))
}

/// `star-rating Three` -> 3; unknown words give 0
fn rating_from_classes(classes: &str) -> u8 {
    match classes.split_whitespace().find(|c| *c != "star-rating") {
        Some("One") => 1,
        Some("Two") => 2,
        Some("Three") => 3,
        Some("Four") => 4,
        Some("Five") => 5,
        _ => 0,
    }
}

/// Resolves a listing href against the page it came from
fn resolve(page: &Url, href: &str) -> Result<String, ListingParseError> {
    let href = href.trim();
    if href.is_empty() {
        return Err(ListingParseError::InvalidLink(href.to_string()));
    }
    page.join(href)
        .map(|u| u.to_string())
        .map_err(|_| ListingParseError::InvalidLink(href.to_string()))
}
