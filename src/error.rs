// src/error.rs
//! Error types for the lookup pipeline.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Flat table store failures.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("table I/O error at {path}: {source}")]
    Io { path: PathBuf, #[source] source: io::Error },

    #[error("table CSV error at {path}: {source}")]
    Csv { path: PathBuf, #[source] source: csv::Error },

    /// The file on disk breaks a table invariant that cannot be repaired
    /// without losing data.
    #[error("malformed table {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("could not lock {path}: {source}")]
    Lock { path: PathBuf, #[source] source: io::Error },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StoreError::Io { path: path.into(), source }
    }
    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        StoreError::Csv { path: path.into(), source }
    }
    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        StoreError::Malformed { path: path.into(), reason: reason.into() }
    }
}

/// The parts source (catalogue scraper) failed or timed out.
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("source exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("source returned unreadable output: {0}")]
    BadOutput(String),
}

/// The image could not be turned into a vehicle descriptor.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("extractor unavailable: {0}")]
    Unavailable(String),

    #[error("extractor exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("no vehicle found in extractor reply: {0}")]
    Unparseable(String),
}

/// Crate-level error surfaced at the request boundary.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}
