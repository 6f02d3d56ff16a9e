#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Risk taxonomy types shared across the risk-map system.
//!
//! This crate defines the accident severity ranks used by the national
//! traffic-accident datasets and the Central Weather Administration seismic
//! intensity scale, including the conversions between intensity labels and
//! peak ground acceleration used by the earthquake aggregation.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Severity rank of a traffic accident record.
///
/// The publisher splits accidents into A1 (fatal within 24 hours) and A2
/// (injury) datasets. A3 (property damage only) data is not published at the
/// record level and is not supported.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum AccidentSeverity {
    /// Rank 1: accidents with a fatality within 24 hours. Published as one
    /// whole-year file.
    #[strum(to_string = "A1", serialize = "a1", serialize = "1")]
    A1 = 1,
    /// Rank 2: accidents with injuries. Published as twelve monthly files.
    #[strum(to_string = "A2", serialize = "a2", serialize = "2")]
    A2 = 2,
}

impl AccidentSeverity {
    /// Returns the numeric rank of this severity.
    #[must_use]
    pub const fn rank(self) -> u8 {
        self as u8
    }

    /// Creates a severity from a numeric rank.
    ///
    /// # Errors
    ///
    /// Returns an error if the rank is not 1 or 2.
    pub const fn from_rank(rank: u8) -> Result<Self, InvalidRankError> {
        match rank {
            1 => Ok(Self::A1),
            2 => Ok(Self::A2),
            _ => Err(InvalidRankError { rank }),
        }
    }
}

/// Error returned when attempting to create an [`AccidentSeverity`] from an
/// unsupported numeric rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidRankError {
    /// The invalid rank that was provided.
    pub rank: u8,
}

impl std::fmt::Display for InvalidRankError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid accident rank {}: expected 1 or 2", self.rank)
    }
}

impl std::error::Error for InvalidRankError {}

/// One band of the CWA seismic intensity scale.
///
/// `pga_lower` and `pgv_lower` are the lower bounds of the band in cm/s² and
/// cm/s respectively. The upper bound of each band is the next band's lower
/// bound (the top band is unbounded).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntensityBand {
    /// Published label, e.g. `5弱`.
    pub label: &'static str,
    /// Short intensity code, e.g. `5-`.
    pub code: &'static str,
    /// English descriptor, e.g. `Strong`.
    pub descriptor: &'static str,
    /// Peak ground acceleration lower bound (cm/s²).
    pub pga_lower: f64,
    /// Peak ground velocity lower bound (cm/s).
    pub pgv_lower: f64,
}

/// The CWA seismic intensity scale, weakest band first.
pub const SEISMIC_INTENSITY_SCALE: &[IntensityBand] = &[
    IntensityBand {
        label: "0級",
        code: "0",
        descriptor: "Micro",
        pga_lower: 0.0,
        pgv_lower: 0.0,
    },
    IntensityBand {
        label: "1級",
        code: "1",
        descriptor: "Very minor",
        pga_lower: 0.8,
        pgv_lower: 0.2,
    },
    IntensityBand {
        label: "2級",
        code: "2",
        descriptor: "Minor",
        pga_lower: 2.5,
        pgv_lower: 0.7,
    },
    IntensityBand {
        label: "3級",
        code: "3",
        descriptor: "Light",
        pga_lower: 8.0,
        pgv_lower: 1.9,
    },
    IntensityBand {
        label: "4級",
        code: "4",
        descriptor: "Moderate",
        pga_lower: 25.0,
        pgv_lower: 5.7,
    },
    IntensityBand {
        label: "5弱",
        code: "5-",
        descriptor: "Strong",
        pga_lower: 80.0,
        pgv_lower: 15.0,
    },
    IntensityBand {
        label: "5強",
        code: "5+",
        descriptor: "Strong",
        pga_lower: 140.0,
        pgv_lower: 30.0,
    },
    IntensityBand {
        label: "6弱",
        code: "6-",
        descriptor: "Very strong",
        pga_lower: 250.0,
        pgv_lower: 50.0,
    },
    IntensityBand {
        label: "6強",
        code: "6+",
        descriptor: "Very strong",
        pga_lower: 440.0,
        pgv_lower: 80.0,
    },
    IntensityBand {
        label: "7級",
        code: "7",
        descriptor: "Great",
        pga_lower: 800.0,
        pgv_lower: 140.0,
    },
];

/// Error returned for an intensity label outside the published scale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownIntensityError {
    /// The unrecognized label.
    pub label: String,
}

impl std::fmt::Display for UnknownIntensityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown seismic intensity label: {}", self.label)
    }
}

impl std::error::Error for UnknownIntensityError {}

/// Looks up a scale band by its published label.
#[must_use]
pub fn intensity_band(label: &str) -> Option<&'static IntensityBand> {
    SEISMIC_INTENSITY_SCALE.iter().find(|b| b.label == label)
}

/// Returns the lower-bound peak ground acceleration for an intensity label.
///
/// Pre-2020 exports use the combined labels `5級` and `6級`; those map to the
/// midpoint of the corresponding weak/strong lower bounds.
///
/// # Errors
///
/// Returns [`UnknownIntensityError`] for labels outside the scale.
pub fn pga_for_label(label: &str) -> Result<f64, UnknownIntensityError> {
    if let Some(band) = intensity_band(label) {
        return Ok(band.pga_lower);
    }
    match label {
        "5級" => Ok(midpoint_pga("5弱", "5強")),
        "6級" => Ok(midpoint_pga("6弱", "6強")),
        _ => Err(UnknownIntensityError {
            label: label.to_string(),
        }),
    }
}

fn midpoint_pga(weak: &str, strong: &str) -> f64 {
    // Both labels are scale constants; lookups cannot miss.
    let w = intensity_band(weak).map_or(0.0, |b| b.pga_lower);
    let s = intensity_band(strong).map_or(0.0, |b| b.pga_lower);
    (w + s) / 2.0
}

/// Mean peak ground acceleration over a set of intensity labels.
///
/// Returns `None` for an empty set.
///
/// # Errors
///
/// Returns [`UnknownIntensityError`] if any label is outside the scale.
pub fn mean_pga(labels: &[&str]) -> Result<Option<f64>, UnknownIntensityError> {
    if labels.is_empty() {
        return Ok(None);
    }
    let mut total = 0.0;
    for label in labels {
        total += pga_for_label(label)?;
    }
    #[allow(clippy::cast_precision_loss)]
    Ok(Some(total / labels.len() as f64))
}

/// Maps a peak ground acceleration back to the strongest scale label whose
/// lower bound it reaches. Returns `None` for negative values.
#[must_use]
pub fn pga_to_intensity(pga: f64) -> Option<&'static str> {
    SEISMIC_INTENSITY_SCALE
        .iter()
        .rev()
        .find(|band| pga >= band.pga_lower)
        .map(|band| band.label)
}

/// Log-domain mean of Richter magnitudes.
///
/// Magnitudes are logarithmic, so the mean is taken over the linear energies
/// (`10^m`) and converted back. Returns `None` for an empty set.
#[must_use]
pub fn average_magnitude(magnitudes: &[f64]) -> Option<f64> {
    if magnitudes.is_empty() {
        return None;
    }
    let mut total = 0.0;
    for magnitude in magnitudes {
        total += 10.0_f64.powf(*magnitude);
    }
    #[allow(clippy::cast_precision_loss)]
    Some((total / magnitudes.len() as f64).log10())
}

/// Arithmetic mean of hypocenter depths. Returns `None` for an empty set.
#[must_use]
pub fn average_depth(depths: &[f64]) -> Option<f64> {
    if depths.is_empty() {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    Some(depths.iter().sum::<f64>() / depths.len() as f64)
}
