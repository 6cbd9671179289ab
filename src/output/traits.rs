//! Output handler traits and types
//!
//! This module defines the trait interface for exporters and the error type
//! they share.

use crate::model::RunResult;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write {path}: {message}")]
    Write { path: PathBuf, message: String },

    #[error("Failed to read {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Malformed row {row} in {path}: {message}")]
    Malformed {
        path: PathBuf,
        row: usize,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Files written by one export
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportArtifacts {
    /// Products workbook, absent when the run found no products
    pub products_file: Option<PathBuf>,

    /// Error report, present whenever the run recorded errors
    pub errors_file: Option<PathBuf>,
}

/// Trait for output handlers
///
/// An output handler consumes a finished run. It never mutates the run and is
/// called once, after the coordinator has returned.
pub trait OutputHandler {
    /// Writes the products and, if any, the error report
    ///
    /// # Arguments
    ///
    /// * `result` - The finished run
    ///
    /// # Returns
    ///
    /// The paths of the files that were written
    fn export(&self, result: &RunResult) -> OutputResult<ExportArtifacts>;
}
