#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Dataset readers for the government accident and earthquake exports.
//!
//! Each dataset is described by a TOML definition (path templates, column
//! names, year range) embedded at compile time. The readers turn one raw
//! yearly/monthly file into normalized records; [`dedup`] collapses the
//! adjacent duplicates the publisher is known to emit.

pub mod accident;
pub mod dataset_def;
pub mod dedup;
pub mod earthquake;
pub mod parsing;
pub mod registry;

/// Errors that can occur while reading a dataset.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The requested slice is outside the dataset's published range.
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// Description of what was out of range.
        message: String,
    },

    /// The file did not match the publisher's documented shape.
    #[error("source format error: {message}")]
    Format {
        /// Description of what went wrong.
        message: String,
    },

    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A dataset TOML definition failed to parse.
    #[error("dataset config error: {0}")]
    Config(#[from] toml::de::Error),
}

impl SourceError {
    /// Shorthand for an [`SourceError::InvalidRequest`].
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Shorthand for a [`SourceError::Format`].
    #[must_use]
    pub fn format(message: impl Into<String>) -> Self {
        Self::Format {
            message: message.into(),
        }
    }
}
