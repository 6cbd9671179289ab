//! Logging setup
//!
//! Installs a process-wide `tracing` subscriber with two sinks: a console
//! layer on stderr and a plain-text layer appending to the log file. The file
//! layer writes through a non-blocking worker; the returned guard must be held
//! until exit so buffered lines reach disk.

use crate::ScrapeError;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Default filter directives for the given verbosity
///
/// `quiet` wins over `verbose`.
pub fn filter_directives(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "catalog_scraper=info,warn",
        1 => "catalog_scraper=debug,info",
        2 => "catalog_scraper=trace,debug",
        _ => "trace",
    }
}

/// Console and file directives, in that order
///
/// `quiet` silences the console only; the log file keeps the verbosity level
/// so per-attempt warnings are still recorded.
pub fn layer_directives(verbose: u8, quiet: bool) -> (&'static str, &'static str) {
    (
        filter_directives(verbose, quiet),
        filter_directives(verbose, false),
    )
}

/// `RUST_LOG` when set, otherwise `directives`
fn env_filter_or(directives: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives))
}

/// Opens `log_path` for appending, creating its directory if needed
///
/// # Errors
///
/// Fails if the path has no file name, the directory cannot be created, or
/// the file cannot be opened (for example when `log_path` is a directory).
pub fn file_appender(log_path: &Path) -> Result<RollingFileAppender, ScrapeError> {
    let file_name = log_path.file_name().ok_or_else(|| {
        ScrapeError::Logging(format!("invalid log path {}", log_path.display()))
    })?;
    let directory = log_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(directory)?;

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.to_string_lossy())
        .build(directory)
        .map_err(|e| {
            ScrapeError::Logging(format!("cannot open log file {}: {}", log_path.display(), e))
        })
}

/// Initialises logging to stderr and to `log_path`
///
/// `RUST_LOG`, when set, replaces the verbosity-derived filters.
///
/// # Errors
///
/// Fails if the log file cannot be opened or a global subscriber is already
/// installed.
pub fn init_logging(
    verbose: u8,
    quiet: bool,
    log_path: &Path,
) -> Result<WorkerGuard, ScrapeError> {
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender(log_path)?);
    let (console_directives, file_directives) = layer_directives(verbose, quiet);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(env_filter_or(console_directives)),
        )
        .with(
            fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_filter(env_filter_or(file_directives)),
        )
        .try_init()
        .map_err(|e| ScrapeError::Logging(e.to_string()))?;

    Ok(guard)
}
