//! Earthquake running-log CSV reader.
//!
//! The publisher maintains one file per year. For the in-progress year the
//! file is a running log, so records from the current calendar month onward
//! are dropped — only completed months are aggregated.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{Datelike, NaiveDate};
use risk_map_source_models::EarthquakeRecord;

use crate::SourceError;
use crate::dataset_def::{EarthquakeDataset, render_path, validate_year};
use crate::parsing::{normalize_intensity, parse_clock_time, parse_iso_date};

/// Reads one year of the earthquake log.
///
/// `today` decides whether the year is the in-progress one and, if so, where
/// the running log is truncated.
///
/// # Errors
///
/// Returns [`SourceError::InvalidRequest`] for a year outside the dataset's
/// published range, [`SourceError::Io`] if the file is missing, and
/// [`SourceError::Format`] if the file does not match the publisher's shape.
pub fn read_year(
    dataset: &EarthquakeDataset,
    data_dir: &Path,
    year: u16,
    today: NaiveDate,
) -> Result<Vec<EarthquakeRecord>, SourceError> {
    validate_year(year, dataset.starting_year, dataset.ending_year)?;

    let path = data_dir.join(render_path(&dataset.files.yearly, year, None));
    let file = File::open(&path)?;
    let mut records = parse_earthquake_csv(file, dataset, &path.display().to_string())?;

    if i32::from(year) == today.year() {
        records = truncate_running_year(records, today);
    }

    log::info!(
        "[{}] {}: {} records",
        dataset.id,
        path.display(),
        records.len()
    );
    Ok(records)
}

/// Drops records from the current calendar month onward.
///
/// The log is time-ascending, so everything from the first record in
/// `today`'s month is still accumulating and is discarded.
#[must_use]
pub fn truncate_running_year(
    mut records: Vec<EarthquakeRecord>,
    today: NaiveDate,
) -> Vec<EarthquakeRecord> {
    if let Some(cutoff) = records
        .iter()
        .position(|record| record.date.month() == today.month())
    {
        records.truncate(cutoff);
    }
    records
}

/// Parses one earthquake CSV stream.
///
/// # Errors
///
/// Returns [`SourceError::Format`] if a configured header is missing or any
/// field fails to decode.
pub fn parse_earthquake_csv<R: Read>(
    reader: R,
    dataset: &EarthquakeDataset,
    label: &str,
) -> Result<Vec<EarthquakeRecord>, SourceError> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let fields = &dataset.fields;
    let date_idx = column_index(&headers, &fields.date, label)?;
    let time_idx = column_index(&headers, &fields.time, label)?;
    let latitude_idx = column_index(&headers, &fields.latitude, label)?;
    let longitude_idx = column_index(&headers, &fields.longitude, label)?;
    let magnitude_idx = column_index(&headers, &fields.magnitude, label)?;
    let depth_idx = column_index(&headers, &fields.depth, label)?;
    let area_idx = column_index(&headers, &fields.area, label)?;
    let intensity_idx = column_index(&headers, &fields.intensity, label)?;

    let mut rows = Vec::new();
    for row in csv_reader.records() {
        rows.push(row?);
    }

    if rows.len() < dataset.trailer_rows {
        return Err(SourceError::format(format!(
            "{label}: expected at least {} trailer rows, found {} rows total",
            dataset.trailer_rows,
            rows.len()
        )));
    }
    rows.truncate(rows.len() - dataset.trailer_rows);

    let mut records = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        let row_number = i + 2;

        let date = parse_iso_date(field(row, date_idx, &fields.date, label, row_number)?)
            .ok_or_else(|| {
                SourceError::format(format!("{label} row {row_number}: unparseable date"))
            })?;
        let time = parse_clock_time(field(row, time_idx, &fields.time, label, row_number)?)
            .ok_or_else(|| {
                SourceError::format(format!("{label} row {row_number}: unparseable time"))
            })?;
        let latitude = parse_value(
            field(row, latitude_idx, &fields.latitude, label, row_number)?,
            &fields.latitude,
            label,
            row_number,
        )?;
        let longitude = parse_value(
            field(row, longitude_idx, &fields.longitude, label, row_number)?,
            &fields.longitude,
            label,
            row_number,
        )?;
        let magnitude = parse_value(
            field(row, magnitude_idx, &fields.magnitude, label, row_number)?,
            &fields.magnitude,
            label,
            row_number,
        )?;
        let depth = parse_value(
            field(row, depth_idx, &fields.depth, label, row_number)?,
            &fields.depth,
            label,
            row_number,
        )?;
        let area = field(row, area_idx, &fields.area, label, row_number)?
            .trim()
            .to_string();
        let intensity = normalize_intensity(field(
            row,
            intensity_idx,
            &fields.intensity,
            label,
            row_number,
        )?);

        records.push(EarthquakeRecord {
            date,
            time,
            latitude,
            longitude,
            magnitude,
            depth,
            area,
            intensity,
        });
    }

    Ok(records)
}

fn column_index(
    headers: &csv::StringRecord,
    name: &str,
    label: &str,
) -> Result<usize, SourceError> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| SourceError::format(format!("{label}: missing column {name:?}")))
}

fn field<'a>(
    row: &'a csv::StringRecord,
    index: usize,
    name: &str,
    label: &str,
    row_number: usize,
) -> Result<&'a str, SourceError> {
    row.get(index).ok_or_else(|| {
        SourceError::format(format!("{label} row {row_number}: missing field {name:?}"))
    })
}

fn parse_value(s: &str, name: &str, label: &str, row_number: usize) -> Result<f64, SourceError> {
    s.trim().parse::<f64>().map_err(|_| {
        SourceError::format(format!(
            "{label} row {row_number}: unparseable {name}: {s:?}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::earthquake_dataset;

    const SAMPLE: &str = "\
Date,Time,北緯,東經,芮氏規模,深度,城市,震度
2023-01-12,03:14:05,23.95,121.55,5.2,18.7,花蓮縣,4
2023-02-03,11:02:44,24.12,121.68,4.1,30.0,宜蘭縣,5 弱
2023-03-21,22:45:00,23.30,120.40,3.8,12.2,臺南市,2
";

    #[test]
    fn parses_and_normalizes_intensity() {
        let dataset = earthquake_dataset();
        let records = parse_earthquake_csv(SAMPLE.as_bytes(), &dataset, "sample").unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].intensity, "4級");
        assert_eq!(records[1].intensity, "5弱");
        assert!((records[0].magnitude - 5.2).abs() < f64::EPSILON);
        assert!((records[1].depth - 30.0).abs() < f64::EPSILON);
        assert_eq!(records[2].area, "臺南市");
    }

    #[test]
    fn running_year_is_truncated_at_the_current_month() {
        let dataset = earthquake_dataset();
        let records = parse_earthquake_csv(SAMPLE.as_bytes(), &dataset, "sample").unwrap();
        let today = NaiveDate::from_ymd_opt(2023, 3, 25).unwrap();
        let kept = truncate_running_year(records, today);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[1].date.to_string(), "2023-02-03");
    }

    #[test]
    fn completed_year_is_not_truncated() {
        let dataset = earthquake_dataset();
        let records = parse_earthquake_csv(SAMPLE.as_bytes(), &dataset, "sample").unwrap();
        let today = NaiveDate::from_ymd_opt(2023, 5, 1).unwrap();
        assert_eq!(truncate_running_year(records, today).len(), 3);
    }

    #[test]
    fn year_out_of_range_fails_before_any_file_access() {
        let dataset = earthquake_dataset();
        let result = read_year(
            &dataset,
            Path::new("/nonexistent"),
            1999,
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        );
        assert!(matches!(result, Err(SourceError::InvalidRequest { .. })));
    }
}
