//! Error types for the dealflow pipeline.
//!
//! Collaborators return [`DealflowError`]; the orchestrator wraps these in
//! `anyhow` at the stage boundary so stage context chains onto them.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, DealflowError>;

/// The main error type for dealflow operations.
#[derive(Debug, Error)]
pub enum DealflowError {
    /// A required setting or credential is missing or malformed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The feed returned no products.
    #[error("Feed returned no items")]
    EmptyFeed,

    /// The catalog was asked to persist an empty batch.
    #[error("Refusing to persist an empty item batch")]
    EmptyInput,

    /// A day key did not have the `YYYYMMDD` shape.
    #[error("Invalid day key '{0}': expected 8 digits (YYYYMMDD)")]
    InvalidDay(String),

    /// A batch passed to the catalog mixed several dates.
    #[error("Batch mixes dates: expected '{expected}', found '{found}'")]
    MixedDates {
        /// The date of the first item.
        expected: String,
        /// The first conflicting date.
        found: String,
    },

    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// An upstream API answered but rejected the request.
    #[error("{service} API error: {message}")]
    Api {
        /// The remote service.
        service: &'static str,
        /// What the service reported.
        message: String,
    },

    /// Reading or writing the catalog failed.
    #[error("Catalog I/O error at {path}: {source}")]
    Catalog {
        /// The catalog path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Card rendering failed.
    #[error("Render error: {0}")]
    Render(String),

    /// Pushing artifacts to the host failed.
    #[error("Publish error: {0}")]
    Publish(String),

    /// The published cover never became publicly visible.
    #[error("Artifacts not visible at {url} after {attempts} attempts")]
    PropagationTimeout {
        /// The probe URL.
        url: String,
        /// How many probes were made.
        attempts: u32,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DealflowError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an API rejection error.
    #[must_use]
    pub fn api(service: &'static str, message: impl Into<String>) -> Self {
        Self::Api {
            service,
            message: message.into(),
        }
    }

    /// Creates a catalog I/O error.
    #[must_use]
    pub fn catalog(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Catalog {
            path: path.into(),
            source,
        }
    }
}
