//! Output module for exporting run results
//!
//! This module handles:
//! - Writing products and errors to timestamped spreadsheets
//! - Reading exported spreadsheets back
//! - Computing and printing summary statistics

pub mod stats;
mod traits;
mod xlsx;

pub use stats::{print_statistics, ProductStatistics};
pub use traits::{ExportArtifacts, OutputError, OutputHandler, OutputResult};
pub use xlsx::{
    read_errors, read_products, sort_for_export, timestamped_path, write_errors, write_products,
    XlsxOutputHandler, ERROR_COLUMNS, ERROR_SHEET, PRODUCT_COLUMNS, PRODUCT_SHEET,
};
