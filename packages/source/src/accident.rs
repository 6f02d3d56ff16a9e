//! Traffic-accident CSV reader.
//!
//! A1 data exists only as one whole-year file; A2 data as twelve monthly
//! files, concatenated when no month is requested. Every file carries two
//! publisher trailer rows that are dropped before parsing.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use risk_map_risk_models::AccidentSeverity;
use risk_map_source_models::AccidentRecord;

use crate::SourceError;
use crate::dataset_def::{AccidentDataset, render_path, validate_month, validate_year};
use crate::parsing::{
    ADMIN_SUFFIX_MARKERS, decode_casualties, parse_compact_date, parse_compact_time,
    split_administrative_area,
};

/// Reads one accident slice into normalized records.
///
/// For [`AccidentSeverity::A1`] the month is ignored — the publisher only
/// offers a whole-year file. For [`AccidentSeverity::A2`] a month selects
/// that monthly file; no month concatenates all twelve.
///
/// # Errors
///
/// Returns [`SourceError::InvalidRequest`] for a year outside the dataset's
/// published range or a month outside [1, 12], [`SourceError::Io`] if a file
/// is missing, and [`SourceError::Format`] if a file does not match the
/// publisher's shape.
pub fn read_slice(
    dataset: &AccidentDataset,
    data_dir: &Path,
    year: u16,
    month: Option<u8>,
    severity: AccidentSeverity,
) -> Result<Vec<AccidentRecord>, SourceError> {
    validate_year(year, dataset.starting_year, dataset.ending_year)?;
    if let Some(month) = month {
        validate_month(month)?;
    }

    let months: Vec<Option<u8>> = match severity {
        AccidentSeverity::A1 => vec![None],
        AccidentSeverity::A2 => match month {
            Some(month) => vec![Some(month)],
            None => (1..=12).map(Some).collect(),
        },
    };

    let mut records = Vec::new();
    for file_month in months {
        let template = match severity {
            AccidentSeverity::A1 => &dataset.files.yearly,
            AccidentSeverity::A2 => &dataset.files.monthly,
        };
        let path = data_dir.join(render_path(template, year, file_month));
        let file = File::open(&path)?;
        let parsed = parse_accident_csv(file, dataset, severity, &path.display().to_string())?;
        log::info!(
            "[{}] {}: {} records",
            dataset.id,
            path.display(),
            parsed.len()
        );
        records.extend(parsed);
    }

    Ok(records)
}

/// Parses one accident CSV stream, dropping the publisher trailer rows.
///
/// # Errors
///
/// Returns [`SourceError::Format`] if a configured header is missing, the
/// file has fewer rows than the trailer, or any field fails to decode.
pub fn parse_accident_csv<R: Read>(
    reader: R,
    dataset: &AccidentDataset,
    severity: AccidentSeverity,
    label: &str,
) -> Result<Vec<AccidentRecord>, SourceError> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let fields = &dataset.fields;
    let date_idx = column_index(&headers, &fields.date, label)?;
    let time_idx = column_index(&headers, &fields.time, label)?;
    let latitude_idx = column_index(&headers, &fields.latitude, label)?;
    let longitude_idx = column_index(&headers, &fields.longitude, label)?;
    let casualties_idx = column_index(&headers, &fields.casualties, label)?;
    let location_idx = column_index(&headers, &fields.location, label)?;
    let category_idx = column_index(&headers, &fields.category, label)?;

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

    let mut records = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let row_number = i + 2; // 1-based, counting the header row

        let date = parse_compact_date(field(row, date_idx, &fields.date, label, row_number)?)
            .ok_or_else(|| {
                SourceError::format(format!("{label} row {row_number}: unparseable date"))
            })?;
        let time = parse_compact_time(field(row, time_idx, &fields.time, label, row_number)?)
            .ok_or_else(|| {
                SourceError::format(format!("{label} row {row_number}: unparseable time"))
            })?;
        let latitude = parse_degree(
            field(row, latitude_idx, &fields.latitude, label, row_number)?,
            label,
            row_number,
        )?;
        let longitude = parse_degree(
            field(row, longitude_idx, &fields.longitude, label, row_number)?,
            label,
            row_number,
        )?;
        let (fatality, injury) = decode_casualties(field(
            row,
            casualties_idx,
            &fields.casualties,
            label,
            row_number,
        )?)
        .ok_or_else(|| {
            SourceError::format(format!(
                "{label} row {row_number}: unparseable casualty code"
            ))
        })?;
        let location = field(row, location_idx, &fields.location, label, row_number)?;
        let (area_1, area_2) = split_administrative_area(location, ADMIN_SUFFIX_MARKERS)
            .ok_or_else(|| {
                SourceError::format(format!(
                    "{label} row {row_number}: location too short to split"
                ))
            })?;
        let category = field(row, category_idx, &fields.category, label, row_number)?;

        records.push(AccidentRecord {
            date,
            time,
            latitude,
            longitude,
            fatality,
            injury,
            area_1,
            area_2,
            includes_pedestrian: category.contains(&fields.pedestrian_token),
            severity,
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

fn parse_degree(s: &str, label: &str, row_number: usize) -> Result<f64, SourceError> {
    s.trim().parse::<f64>().map_err(|_| {
        SourceError::format(format!(
            "{label} row {row_number}: unparseable coordinate {s:?}"
        ))
    })
}
