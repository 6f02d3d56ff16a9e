//! Dataset registry — loads the dataset definitions from embedded TOML.
//!
//! Each `.toml` file in `packages/source/datasets/` is baked into the binary
//! at compile time via [`include_str!`]. A publisher changing its header
//! convention for a new year means a new TOML file here, not a code change.

use crate::dataset_def::{AccidentDataset, EarthquakeDataset};

const ACCIDENTS_TOML: &str = include_str!("../datasets/accidents.toml");
const EARTHQUAKES_TOML: &str = include_str!("../datasets/earthquakes.toml");

/// Returns the traffic-accident dataset definition.
///
/// # Panics
///
/// Panics if the embedded TOML is malformed (a compile-time artifact, so
/// this is a build defect rather than a runtime condition).
#[must_use]
pub fn accident_dataset() -> AccidentDataset {
    toml::from_str(ACCIDENTS_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse accidents.toml: {e}"))
}

/// Returns the earthquake dataset definition.
///
/// # Panics
///
/// Panics if the embedded TOML is malformed.
#[must_use]
pub fn earthquake_dataset() -> EarthquakeDataset {
    toml::from_str(EARTHQUAKES_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse earthquakes.toml: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accident_definition_parses() {
        let dataset = accident_dataset();
        assert_eq!(dataset.id, "npa_accidents");
        assert!(dataset.starting_year <= dataset.ending_year);
        assert_eq!(dataset.trailer_rows, 2);
        assert!(dataset.files.yearly.contains("{year}"));
        assert!(dataset.files.monthly.contains("{month}"));
        assert!(!dataset.fields.casualties.is_empty());
    }

    #[test]
    fn earthquake_definition_parses() {
        let dataset = earthquake_dataset();
        assert_eq!(dataset.id, "cwa_earthquakes");
        assert!(dataset.files.yearly.contains("{year}"));
        assert!(!dataset.fields.intensity.is_empty());
    }
}
