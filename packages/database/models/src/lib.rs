#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Aggregate row types and the import cursor.
//!
//! These types mirror the shapes of data as stored in the `DuckDB` tables.
//! They are distinct from the transient record types in
//! `risk_map_source_models`, which only live for one import batch.

use chrono::{NaiveDate, NaiveTime};
use risk_map_risk_models::{AccidentSeverity, pga_to_intensity};
use serde::{Deserialize, Serialize};

/// A `traffic_accident` aggregate row: one grid cell's running tally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficAccidentRow {
    /// Grid-cell latitude (quantized, part of the key).
    pub latitude: f64,
    /// Grid-cell longitude (quantized, part of the key).
    pub longitude: f64,
    /// Number of accidents observed in this cell.
    pub number: i64,
    /// Total fatalities across those accidents.
    pub total_fatality: i64,
    /// Total injuries across those accidents.
    pub total_injury: i64,
    /// Fatalities from pedestrian-involved accidents only.
    pub pedestrian_fatality: i64,
    /// Injuries from pedestrian-involved accidents only.
    pub pedestrian_injury: i64,
}

/// A `pedestrian_hell` aggregate row: one administrative area's running
/// tally. Same value shape as [`TrafficAccidentRow`], keyed by area instead
/// of grid cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PedestrianHellRow {
    /// County or city name (part of the key).
    pub area_1: String,
    /// Township or district name (part of the key).
    pub area_2: String,
    /// Number of accidents observed in this area.
    pub number: i64,
    /// Total fatalities across those accidents.
    pub total_fatality: i64,
    /// Total injuries across those accidents.
    pub total_injury: i64,
    /// Fatalities from pedestrian-involved accidents only.
    pub pedestrian_fatality: i64,
    /// Injuries from pedestrian-involved accidents only.
    pub pedestrian_injury: i64,
}

/// An `earthquake` event row (append-only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarthquakeRow {
    /// Date of the event.
    pub date: NaiveDate,
    /// Time of day of the event.
    pub time: NaiveTime,
    /// Epicenter latitude.
    pub latitude: f64,
    /// Epicenter longitude.
    pub longitude: f64,
    /// Richter magnitude.
    pub magnitude: f64,
    /// Hypocenter depth in kilometers.
    pub depth: f64,
}

/// An `earthquake_intensity` aggregate row: one area's accumulated shaking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarthquakeIntensityRow {
    /// Affected area name (the key).
    pub area: String,
    /// Number of events folded into this row.
    pub number: i64,
    /// Sum of the per-event peak ground accelerations.
    pub total_pga: f64,
}

impl EarthquakeIntensityRow {
    /// Mean peak ground acceleration over the folded events.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average_pga(&self) -> f64 {
        if self.number == 0 {
            0.0
        } else {
            self.total_pga / self.number as f64
        }
    }

    /// Scale label for the mean peak ground acceleration.
    #[must_use]
    pub fn intensity_label(&self) -> Option<&'static str> {
        pga_to_intensity(self.average_pga())
    }
}

/// Summed traffic-accident risk along a route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteAccidentRisk {
    /// Accidents across the route's grid cells.
    pub number: i64,
    /// Fatalities across the route's grid cells.
    pub total_fatality: i64,
    /// Injuries across the route's grid cells.
    pub total_injury: i64,
}

/// Earthquake history along a route.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteEarthquakeRisk {
    /// Number of events whose epicenter falls in the route's cells.
    pub number: i64,
    /// Log-domain mean magnitude of those events.
    pub average_magnitude: Option<f64>,
    /// Mean depth of those events.
    pub average_depth: Option<f64>,
    /// The matching events.
    pub events: Vec<EarthquakeRow>,
}

/// Combined risk summary for one route.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteRisk {
    /// Traffic-accident totals.
    pub accident: RouteAccidentRisk,
    /// Earthquake history.
    pub earthquake: RouteEarthquakeRisk,
}

/// The persisted import position: the single source of truth for what has
/// already been aggregated.
///
/// Month 0 states are boundaries carrying no source data — the initial
/// state before anything is imported, and the rank hand-over after the A1
/// year file. The A1 data itself is the (rank 1, month 12) unit; A2 months
/// are (rank 2, month 1..=12).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportCursor {
    /// Year (publisher calendar) being imported.
    pub year: u16,
    /// Month position within the year; 0 is a boundary state.
    pub month: u8,
    /// Severity rank being imported.
    pub rank: AccidentSeverity,
}

impl ImportCursor {
    /// The cursor before anything has been imported.
    #[must_use]
    pub const fn initial(starting_year: u16) -> Self {
        Self {
            year: starting_year,
            month: 0,
            rank: AccidentSeverity::A1,
        }
    }

    /// Returns the next unit of work after this one.
    ///
    /// Pure and total: every state has exactly one successor.
    #[must_use]
    pub const fn advance(self) -> Self {
        match self.rank {
            AccidentSeverity::A1 => {
                if self.month == 12 {
                    Self {
                        year: self.year,
                        month: 0,
                        rank: AccidentSeverity::A2,
                    }
                } else {
                    Self {
                        year: self.year,
                        month: 12,
                        rank: AccidentSeverity::A1,
                    }
                }
            }
            AccidentSeverity::A2 => {
                if self.month == 12 {
                    Self {
                        year: self.year + 1,
                        month: 0,
                        rank: AccidentSeverity::A1,
                    }
                } else {
                    Self {
                        year: self.year,
                        month: self.month + 1,
                        rank: AccidentSeverity::A2,
                    }
                }
            }
        }
    }

    /// Whether this state is a boundary unit with no source data.
    #[must_use]
    pub const fn is_boundary(self) -> bool {
        self.month == 0
    }

    /// The month filter for the dataset reader: A2 slices read one month,
    /// A1 reads the whole-year file.
    #[must_use]
    pub const fn slice_month(self) -> Option<u8> {
        match self.rank {
            AccidentSeverity::A1 => None,
            AccidentSeverity::A2 => Some(self.month),
        }
    }
}

impl std::fmt::Display for ImportCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "year {} month {} rank {}",
            self.year, self.month, self.rank
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_points_at_the_starting_year() {
        let cursor = ImportCursor::initial(111);
        assert_eq!(cursor.year, 111);
        assert_eq!(cursor.month, 0);
        assert_eq!(cursor.rank, AccidentSeverity::A1);
        assert!(cursor.is_boundary());
    }

    #[test]
    fn rank_one_boundary_advances_to_the_year_file() {
        let next = ImportCursor::initial(111).advance();
        assert_eq!((next.year, next.month, next.rank), (111, 12, AccidentSeverity::A1));
        assert!(!next.is_boundary());
        assert_eq!(next.slice_month(), None);
    }

    #[test]
    fn rank_one_year_file_hands_over_to_rank_two() {
        let cursor = ImportCursor {
            year: 111,
            month: 12,
            rank: AccidentSeverity::A1,
        };
        let next = cursor.advance();
        assert_eq!((next.year, next.month, next.rank), (111, 0, AccidentSeverity::A2));
        assert!(next.is_boundary());
    }

    #[test]
    fn rank_two_walks_the_months() {
        let mut cursor = ImportCursor {
            year: 111,
            month: 0,
            rank: AccidentSeverity::A2,
        };
        for month in 1..=12 {
            cursor = cursor.advance();
            assert_eq!((cursor.month, cursor.rank), (month, AccidentSeverity::A2));
            assert_eq!(cursor.slice_month(), Some(month));
        }
    }

    #[test]
    fn rank_two_december_rolls_into_the_next_year() {
        let cursor = ImportCursor {
            year: 111,
            month: 12,
            rank: AccidentSeverity::A2,
        };
        let next = cursor.advance();
        assert_eq!((next.year, next.month, next.rank), (112, 0, AccidentSeverity::A1));
    }

    #[test]
    fn intensity_row_derives_its_label_from_the_mean() {
        let row = EarthquakeIntensityRow {
            area: "花蓮縣".to_string(),
            number: 2,
            total_pga: 200.0,
        };
        assert!((row.average_pga() - 100.0).abs() < f64::EPSILON);
        assert_eq!(row.intensity_label(), Some("5弱"));
    }
}
