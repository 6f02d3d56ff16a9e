#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Grid quantization for spatial bucketing.
//!
//! Aggregate tables key rows by coordinates rounded onto a fixed grid, so the
//! rounding must be deterministic: identical raw inputs always produce
//! identical grid keys, across runs and across processes. [`quantize`] is that
//! single source of truth, and [`Coordinate`] guarantees that only validated
//! values ever reach a store key.

/// Default grid cell size in degrees for traffic-accident aggregation
/// (roughly 11 meters at the equator).
pub const DEGREE_DIFFERENCE: f64 = 0.0001;

/// Errors from coordinate validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoordinateError {
    /// Latitude outside [-90, 90] or not a finite number.
    #[error("invalid latitude {0}: must be between -90 and 90 degrees")]
    InvalidLatitude(f64),

    /// Longitude outside [-180, 180] or not a finite number.
    #[error("invalid longitude {0}: must be between -180 and 180 degrees")]
    InvalidLongitude(f64),

    /// A positional pair with anything other than two values.
    #[error("invalid coordinate: expected a latitude/longitude pair, got {0} value(s)")]
    MalformedPair(usize),
}

/// Rounds a degree value to the nearest multiple of `cell_size`.
///
/// The result is additionally rounded to the decimal precision implied by the
/// cell size (0.0001 ⇒ 4 decimal places, 0.01 ⇒ 2), so that float noise from
/// the multiplication cannot produce two distinct keys for the same cell.
#[must_use]
pub fn quantize(degree: f64, cell_size: f64) -> f64 {
    let snapped = (degree / cell_size).round() * cell_size;
    let power = cell_size.log10();
    if power > 0.0 {
        return snapped;
    }
    #[allow(clippy::cast_possible_truncation)]
    let places = power.abs().ceil() as i32;
    let factor = 10.0_f64.powi(places);
    (snapped * factor).round() / factor
}

/// A validated WGS84 coordinate with its derived grid cell.
///
/// Construction is the only validation point: a `Coordinate` that exists is
/// always in bounds, so store keys built from `latitude_grid` /
/// `longitude_grid` never need re-checking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    /// Raw latitude in degrees.
    pub latitude: f64,
    /// Raw longitude in degrees.
    pub longitude: f64,
    /// Latitude rounded to the default grid.
    pub latitude_grid: f64,
    /// Longitude rounded to the default grid.
    pub longitude_grid: f64,
}

impl Coordinate {
    /// Validates and quantizes a latitude/longitude pair.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError`] if either value is out of bounds or not
    /// finite.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() || latitude.abs() > 90.0 {
            return Err(CoordinateError::InvalidLatitude(latitude));
        }
        if !longitude.is_finite() || longitude.abs() > 180.0 {
            return Err(CoordinateError::InvalidLongitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
            latitude_grid: quantize(latitude, DEGREE_DIFFERENCE),
            longitude_grid: quantize(longitude, DEGREE_DIFFERENCE),
        })
    }

    /// Validates a positional slice as a latitude/longitude pair.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError::MalformedPair`] unless the slice holds
    /// exactly two values, then validates them as [`Coordinate::new`] does.
    pub fn from_pair(pair: &[f64]) -> Result<Self, CoordinateError> {
        match pair {
            [latitude, longitude] => Self::new(*latitude, *longitude),
            other => Err(CoordinateError::MalformedPair(other.len())),
        }
    }

    /// Returns the (latitude, longitude) grid cell at an explicit cell size.
    ///
    /// Sparser datasets aggregate at coarser cells (seismic data uses 0.01°).
    #[must_use]
    pub fn grid_at(&self, cell_size: f64) -> (f64, f64) {
        (
            quantize(self.latitude, cell_size),
            quantize(self.longitude, cell_size),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantize_rounds_to_nearest_cell() {
        assert!((quantize(25.123_46, 0.0001) - 25.1235).abs() < f64::EPSILON);
        assert!((quantize(121.567_84, 0.0001) - 121.5678).abs() < f64::EPSILON);
        assert!((quantize(25.126, 0.01) - 25.13).abs() < f64::EPSILON);
    }

    #[test]
    fn quantize_is_idempotent() {
        for raw in [25.123_456, -48.000_04, 0.000_05, 121.999_999] {
            let once = quantize(raw, 0.0001);
            assert!((quantize(once, 0.0001) - once).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn quantize_handles_cells_of_one_degree_and_above() {
        assert!((quantize(25.6, 1.0) - 26.0).abs() < f64::EPSILON);
        assert!((quantize(127.0, 10.0) - 130.0).abs() < f64::EPSILON);
    }

    #[test]
    fn coordinate_carries_default_grid() {
        let coordinate = Coordinate::new(24.438_91, 118.249_74).unwrap();
        assert!((coordinate.latitude_grid - 24.4389).abs() < f64::EPSILON);
        assert!((coordinate.longitude_grid - 118.2497).abs() < f64::EPSILON);
    }

    #[test]
    fn out_of_bounds_latitude_is_rejected() {
        assert_eq!(
            Coordinate::new(90.1, 0.0),
            Err(CoordinateError::InvalidLatitude(90.1))
        );
        assert!(Coordinate::new(-91.0, 0.0).is_err());
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn out_of_bounds_longitude_is_rejected() {
        assert_eq!(
            Coordinate::new(0.0, -180.5),
            Err(CoordinateError::InvalidLongitude(-180.5))
        );
        assert!(Coordinate::new(0.0, 181.0).is_err());
    }

    #[test]
    fn malformed_pair_is_rejected() {
        assert_eq!(
            Coordinate::from_pair(&[1.0]),
            Err(CoordinateError::MalformedPair(1))
        );
        assert_eq!(
            Coordinate::from_pair(&[1.0, 2.0, 3.0]),
            Err(CoordinateError::MalformedPair(3))
        );
        assert!(Coordinate::from_pair(&[24.0, 121.0]).is_ok());
    }

    #[test]
    fn coarser_grid_for_seismic_aggregation() {
        let coordinate = Coordinate::new(23.976_54, 121.123_45).unwrap();
        let (lat, lng) = coordinate.grid_at(0.01);
        assert!((lat - 23.98).abs() < f64::EPSILON);
        assert!((lng - 121.12).abs() < f64::EPSILON);
    }
}
