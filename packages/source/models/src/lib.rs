#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Normalized record types produced by the dataset readers.
//!
//! Every raw source file is parsed into one of these shapes before
//! deduplication and aggregation. Records are transient — they live for one
//! import batch and are never persisted as-is.

use chrono::{NaiveDate, NaiveTime};
use risk_map_risk_models::AccidentSeverity;
use serde::{Deserialize, Serialize};

/// One traffic-accident observation, normalized from a publisher CSV row.
///
/// `area_1` is the county/city prefix of the location string and `area_2`
/// the township/district that follows it, both already decomposed by the
/// reader. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccidentRecord {
    /// Date the accident occurred.
    pub date: NaiveDate,
    /// Time of day the accident occurred.
    pub time: NaiveTime,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Number of fatalities, decoded from the combined casualty field.
    pub fatality: u32,
    /// Number of injuries, decoded from the combined casualty field.
    pub injury: u32,
    /// County or city name (first level of the administrative split).
    pub area_1: String,
    /// Township or district name (second level of the administrative split).
    pub area_2: String,
    /// Whether the accident category names a pedestrian.
    pub includes_pedestrian: bool,
    /// Severity rank of the dataset this record came from.
    pub severity: AccidentSeverity,
}

/// One earthquake observation from the seismic running log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarthquakeRecord {
    /// Date of the event.
    pub date: NaiveDate,
    /// Time of day of the event.
    pub time: NaiveTime,
    /// Epicenter latitude (WGS84).
    pub latitude: f64,
    /// Epicenter longitude (WGS84).
    pub longitude: f64,
    /// Richter magnitude.
    pub magnitude: f64,
    /// Hypocenter depth in kilometers.
    pub depth: f64,
    /// Name of the affected area.
    pub area: String,
    /// Intensity label, normalized to always carry the 級 unit suffix.
    pub intensity: String,
}
