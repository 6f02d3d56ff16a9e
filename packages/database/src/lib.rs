#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! `DuckDB` aggregate store for the risk map.
//!
//! One database file holds the running aggregates (`traffic_accident`,
//! `pedestrian_hell`, `earthquake`, `earthquake_intensity`) and the `_meta`
//! table that tracks import progress. Every upsert is a single
//! `INSERT … ON CONFLICT … DO UPDATE` statement, so the read-modify-write per
//! key is atomic — two concurrent upserts of a brand-new key cannot both
//! insert.

pub mod db;
pub mod paths;
pub mod queries;
pub mod tracking;

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Database query error.
    #[error("Database error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// I/O error (e.g. creating the database directory).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Point lookup found no row for the key.
    #[error("{entity} not found for key {key}")]
    NotFound {
        /// Table that was queried.
        entity: &'static str,
        /// Rendered key that missed.
        key: String,
    },

    /// Stored data failed to convert to its model type.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

impl DbError {
    /// Shorthand for a [`DbError::Conversion`].
    #[must_use]
    pub fn conversion(message: impl Into<String>) -> Self {
        Self::Conversion {
            message: message.into(),
        }
    }
}
