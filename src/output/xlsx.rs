//! Spreadsheet export
//!
//! Products go to a `Products` sheet sorted by rating (best first) and then by
//! price (cheapest first). Errors go to a separate workbook with an `Errors`
//! sheet. Both file names carry the export timestamp so runs never overwrite
//! each other. The readers re-load what the writers produce.

use crate::model::{ErrorRecord, ProductRecord, RunResult};
use crate::output::traits::{ExportArtifacts, OutputError, OutputHandler, OutputResult};
use calamine::{open_workbook, Data, Reader, Xlsx};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

pub const PRODUCT_SHEET: &str = "Products";
pub const ERROR_SHEET: &str = "Errors";

pub const PRODUCT_COLUMNS: [&str; 8] = [
    "Product Name",
    "Price",
    "Rating (1-5)",
    "In Stock",
    "Availability",
    "Image URL",
    "Product URL",
    "Source Page",
];

pub const ERROR_COLUMNS: [&str; 2] = ["Page", "Error"];

const MAX_COLUMN_WIDTH: usize = 50;

/// Timestamp format used in exported file names
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Writes runs as `.xlsx` workbooks
#[derive(Debug, Clone)]
pub struct XlsxOutputHandler {
    products_path: PathBuf,
    timestamp: String,
}

impl XlsxOutputHandler {
    /// Creates a handler stamped with the current local time
    pub fn new(products_path: impl Into<PathBuf>) -> Self {
        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        Self::with_timestamp(products_path, timestamp)
    }

    /// Creates a handler with a fixed timestamp
    pub fn with_timestamp(products_path: impl Into<PathBuf>, timestamp: impl Into<String>) -> Self {
        Self {
            products_path: products_path.into(),
            timestamp: timestamp.into(),
        }
    }

    /// `products.xlsx` -> `products_{timestamp}.xlsx`
    pub fn products_file(&self) -> PathBuf {
        timestamped_path(&self.products_path, &self.timestamp)
    }

    /// `errors_{timestamp}.xlsx`, next to the products file
    pub fn errors_file(&self) -> PathBuf {
        self.products_path
            .with_file_name(format!("errors_{}.xlsx", self.timestamp))
    }
}

impl OutputHandler for XlsxOutputHandler {
    fn export(&self, result: &RunResult) -> OutputResult<ExportArtifacts> {
        let mut artifacts = ExportArtifacts::default();

        if result.products.is_empty() {
            tracing::warn!("No data to export");
        } else {
            let path = self.products_file();
            write_products(&path, &sort_for_export(&result.products))?;
            tracing::info!(
                "Exported {} products to {}",
                result.products.len(),
                path.display()
            );
            artifacts.products_file = Some(path);
        }

        if !result.errors.is_empty() {
            let path = self.errors_file();
            write_errors(&path, &result.errors)?;
            tracing::warn!("Errors exported to {}", path.display());
            artifacts.errors_file = Some(path);
        }

        Ok(artifacts)
    }
}

/// Appends `_{timestamp}` to the file stem; the extension is always `.xlsx`
pub fn timestamped_path(path: &Path, timestamp: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "products".to_string());

    path.with_file_name(format!("{}_{}.xlsx", stem, timestamp))
}

/// Rating descending, then price ascending; ties keep their run order
pub fn sort_for_export(products: &[ProductRecord]) -> Vec<ProductRecord> {
    let mut sorted = products.to_vec();
    sorted.sort_by(|a, b| {
        b.rating
            .cmp(&a.rating)
            .then_with(|| a.price.partial_cmp(&b.price).unwrap_or(Ordering::Equal))
    });
    sorted
}

/// Writes products in the given order to a `Products` sheet
pub fn write_products(path: &Path, products: &[ProductRecord]) -> OutputResult<()> {
    ensure_parent(path)?;
    let write_err = |e: XlsxError| write_error(path, e);

    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(PRODUCT_SHEET).map_err(write_err)?;

    let mut widths: Vec<usize> = PRODUCT_COLUMNS.iter().map(|c| c.chars().count()).collect();
    for (col, name) in PRODUCT_COLUMNS.iter().enumerate() {
        sheet
            .write_string_with_format(0, col as u16, *name, &header)
            .map_err(write_err)?;
    }

    for (index, product) in products.iter().enumerate() {
        let row = index as u32 + 1;
        sheet.write_string(row, 0, &product.name).map_err(write_err)?;
        sheet.write_number(row, 1, product.price).map_err(write_err)?;
        sheet
            .write_number(row, 2, f64::from(product.rating))
            .map_err(write_err)?;
        sheet.write_boolean(row, 3, product.in_stock).map_err(write_err)?;
        sheet
            .write_string(row, 4, &product.availability)
            .map_err(write_err)?;
        sheet.write_string(row, 5, &product.image_url).map_err(write_err)?;
        sheet.write_string(row, 6, &product.detail_url).map_err(write_err)?;
        sheet
            .write_number(row, 7, f64::from(product.source_page))
            .map_err(write_err)?;

        let rendered = [
            product.name.chars().count(),
            product.price.to_string().len(),
            product.rating.to_string().len(),
            product.in_stock.to_string().len(),
            product.availability.chars().count(),
            product.image_url.chars().count(),
            product.detail_url.chars().count(),
            product.source_page.to_string().len(),
        ];
        for (width, len) in widths.iter_mut().zip(rendered) {
            *width = (*width).max(len);
        }
    }

    for (col, width) in widths.into_iter().enumerate() {
        sheet
            .set_column_width(col as u16, fitted_width(width) as f64)
            .map_err(write_err)?;
    }

    workbook.save(path).map_err(write_err)?;
    Ok(())
}

/// Writes `{page, error}` pairs to an `Errors` sheet
pub fn write_errors(path: &Path, errors: &[ErrorRecord]) -> OutputResult<()> {
    ensure_parent(path)?;
    let write_err = |e: XlsxError| write_error(path, e);

    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(ERROR_SHEET).map_err(write_err)?;

    for (col, name) in ERROR_COLUMNS.iter().enumerate() {
        sheet
            .write_string_with_format(0, col as u16, *name, &header)
            .map_err(write_err)?;
    }

    let mut message_width = ERROR_COLUMNS[1].len();
    for (index, error) in errors.iter().enumerate() {
        let row = index as u32 + 1;
        sheet
            .write_number(row, 0, f64::from(error.page_number))
            .map_err(write_err)?;
        sheet.write_string(row, 1, &error.error).map_err(write_err)?;
        message_width = message_width.max(error.error.chars().count());
    }

    sheet
        .set_column_width(1, fitted_width(message_width) as f64)
        .map_err(write_err)?;

    workbook.save(path).map_err(write_err)?;
    Ok(())
}

/// Reads back a workbook written by [`write_products`]
pub fn read_products(path: &Path) -> OutputResult<Vec<ProductRecord>> {
    let range = open_sheet(path, PRODUCT_SHEET)?;
    let mut rows = range.rows();
    check_header(path, rows.next(), &PRODUCT_COLUMNS)?;

    rows.enumerate()
        .map(|(index, row)| {
            let cells = Cells { path, row, line: index + 2 };
            Ok(ProductRecord {
                name: cells.string(0)?,
                price: cells.number(1)?,
                rating: cells.number(2)? as u8,
                in_stock: cells.boolean(3)?,
                availability: cells.string(4)?,
                image_url: cells.string(5)?,
                detail_url: cells.string(6)?,
                source_page: cells.number(7)? as u32,
            })
        })
        .collect()
}

/// Reads back a workbook written by [`write_errors`]
pub fn read_errors(path: &Path) -> OutputResult<Vec<ErrorRecord>> {
    let range = open_sheet(path, ERROR_SHEET)?;
    let mut rows = range.rows();
    check_header(path, rows.next(), &ERROR_COLUMNS)?;

    rows.enumerate()
        .map(|(index, row)| {
            let cells = Cells { path, row, line: index + 2 };
            Ok(ErrorRecord::new(cells.number(0)? as u32, cells.string(1)?))
        })
        .collect()
}

fn fitted_width(content_len: usize) -> usize {
    (content_len + 2).min(MAX_COLUMN_WIDTH)
}

fn ensure_parent(path: &Path) -> OutputResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn write_error(path: &Path, e: XlsxError) -> OutputError {
    OutputError::Write {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

fn open_sheet(path: &Path, sheet: &str) -> OutputResult<calamine::Range<Data>> {
    let read_err = |message: String| OutputError::Read {
        path: path.to_path_buf(),
        message,
    };

    let mut workbook: Xlsx<_> =
        open_workbook(path).map_err(|e: calamine::XlsxError| read_err(e.to_string()))?;
    workbook
        .worksheet_range(sheet)
        .map_err(|e| read_err(e.to_string()))
}

fn check_header(path: &Path, header: Option<&[Data]>, expected: &[&str]) -> OutputResult<()> {
    let found: Vec<String> = header
        .unwrap_or_default()
        .iter()
        .map(|cell| cell.to_string())
        .collect();

    if found.iter().map(String::as_str).eq(expected.iter().copied()) {
        Ok(())
    } else {
        Err(OutputError::Malformed {
            path: path.to_path_buf(),
            row: 1,
            message: format!("unexpected header {:?}", found),
        })
    }
}

/// Typed access to the cells of one sheet row
struct Cells<'a> {
    path: &'a Path,
    row: &'a [Data],
    line: usize,
}

impl Cells<'_> {
    fn malformed(&self, col: usize, expected: &str) -> OutputError {
        OutputError::Malformed {
            path: self.path.to_path_buf(),
            row: self.line,
            message: format!("column {} is not {}", col + 1, expected),
        }
    }

    fn string(&self, col: usize) -> OutputResult<String> {
        match self.row.get(col) {
            Some(Data::String(s)) => Ok(s.clone()),
            Some(Data::Empty) | None => Ok(String::new()),
            _ => Err(self.malformed(col, "text")),
        }
    }

    fn number(&self, col: usize) -> OutputResult<f64> {
        match self.row.get(col) {
            Some(Data::Float(f)) => Ok(*f),
            Some(Data::Int(i)) => Ok(*i as f64),
            _ => Err(self.malformed(col, "a number")),
        }
    }

    fn boolean(&self, col: usize) -> OutputResult<bool> {
        match self.row.get(col) {
            Some(Data::Bool(b)) => Ok(*b),
            _ => Err(self.malformed(col, "a boolean")),
        }
    }
}
