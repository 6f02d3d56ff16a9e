//! Config-driven dataset definitions.
//!
//! Everything that ties the readers to a particular publisher export — file
//! path templates, column header names, the published year range — lives in
//! a TOML definition rather than in code. Header names in particular are a
//! compatibility contract with the publisher and have changed between years,
//! so a new convention is a new TOML file, not a code change.

use serde::Deserialize;

use crate::SourceError;

/// Definition of a traffic-accident dataset.
#[derive(Debug, Clone, Deserialize)]
pub struct AccidentDataset {
    /// Unique identifier (e.g. `"npa_accidents"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// First year (ROC calendar) with published files.
    pub starting_year: u16,
    /// Last year (ROC calendar) with published files.
    pub ending_year: u16,
    /// Number of trailer rows appended to every file by the publisher.
    pub trailer_rows: usize,
    /// File path templates, relative to the data directory.
    pub files: AccidentFiles,
    /// Column header names.
    pub fields: AccidentFields,
}

/// Path templates for the accident files. `{year}` and `{month}` are
/// substituted at read time.
#[derive(Debug, Clone, Deserialize)]
pub struct AccidentFiles {
    /// Whole-year A1 file.
    pub yearly: String,
    /// Monthly A2 file.
    pub monthly: String,
}

/// Column header names for an accident file.
#[derive(Debug, Clone, Deserialize)]
pub struct AccidentFields {
    /// Occurrence date column (compact `YYYYMMDD` digits).
    pub date: String,
    /// Occurrence time column (compact `HHMMSS` digits).
    pub time: String,
    /// Latitude column.
    pub latitude: String,
    /// Longitude column.
    pub longitude: String,
    /// Combined casualty-count column.
    pub casualties: String,
    /// Location string column.
    pub location: String,
    /// Accident category name column.
    pub category: String,
    /// Token whose presence in the category name marks a pedestrian record.
    pub pedestrian_token: String,
}

/// Definition of an earthquake dataset.
#[derive(Debug, Clone, Deserialize)]
pub struct EarthquakeDataset {
    /// Unique identifier (e.g. `"cwa_earthquakes"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// First year with a published log.
    pub starting_year: u16,
    /// Last year with a published log.
    pub ending_year: u16,
    /// Number of trailer rows appended to every file by the publisher
    /// (0 — the running log carries no disclaimer footer).
    pub trailer_rows: usize,
    /// File path template, relative to the data directory.
    pub files: EarthquakeFiles,
    /// Column header names.
    pub fields: EarthquakeFields,
}

/// Path template for the earthquake files.
#[derive(Debug, Clone, Deserialize)]
pub struct EarthquakeFiles {
    /// Whole-year running log. `{year}` is substituted at read time.
    pub yearly: String,
}

/// Column header names for an earthquake file.
#[derive(Debug, Clone, Deserialize)]
pub struct EarthquakeFields {
    /// Event date column (`YYYY-MM-DD`).
    pub date: String,
    /// Event time column (`HH:MM:SS`).
    pub time: String,
    /// Latitude column.
    pub latitude: String,
    /// Longitude column.
    pub longitude: String,
    /// Richter magnitude column.
    pub magnitude: String,
    /// Depth column.
    pub depth: String,
    /// Affected area column.
    pub area: String,
    /// Intensity label column.
    pub intensity: String,
}

/// Substitutes `{year}` and `{month}` placeholders in a path template.
#[must_use]
pub fn render_path(template: &str, year: u16, month: Option<u8>) -> String {
    let mut path = template.replace("{year}", &year.to_string());
    if let Some(month) = month {
        path = path.replace("{month}", &month.to_string());
    }
    path
}

/// Validates a requested year against a dataset's published range.
///
/// # Errors
///
/// Returns [`SourceError::InvalidRequest`] if the year is outside
/// `[starting_year, ending_year]`.
pub fn validate_year(
    year: u16,
    starting_year: u16,
    ending_year: u16,
) -> Result<(), SourceError> {
    if year < starting_year || year > ending_year {
        return Err(SourceError::invalid_request(format!(
            "year {year} out of range: must be between {starting_year} and {ending_year} (inclusive)",
        )));
    }
    Ok(())
}

/// Validates a requested month.
///
/// # Errors
///
/// Returns [`SourceError::InvalidRequest`] if the month is not in `[1, 12]`.
pub fn validate_month(month: u8) -> Result<(), SourceError> {
    if !(1..=12).contains(&month) {
        return Err(SourceError::invalid_request(format!(
            "month {month} out of range: must be between 1 and 12 (inclusive)",
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_year_and_month_placeholders() {
        assert_eq!(
            render_path("accidents/{year}/a2_{month}.csv", 112, Some(3)),
            "accidents/112/a2_3.csv"
        );
        assert_eq!(
            render_path("earthquakes/eq_{year}.csv", 2023, None),
            "earthquakes/eq_2023.csv"
        );
    }

    #[test]
    fn year_outside_published_range_is_rejected() {
        assert!(validate_year(110, 111, 112).is_err());
        assert!(validate_year(113, 111, 112).is_err());
        assert!(validate_year(111, 111, 112).is_ok());
        assert!(validate_year(112, 111, 112).is_ok());
    }

    #[test]
    fn month_outside_calendar_is_rejected() {
        assert!(validate_month(0).is_err());
        assert!(validate_month(13).is_err());
        assert!(validate_month(1).is_ok());
        assert!(validate_month(12).is_ok());
    }
}
