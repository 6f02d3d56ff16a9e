#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Library for importing accident and earthquake data into the risk store.
//!
//! One import run processes exactly one resumable unit of work: the next
//! cursor state. The cursor is persisted only after every upsert in the
//! slice succeeds, so a failed slice is retried rather than skipped.

use std::path::Path;
use std::time::Instant;

use chrono::NaiveDate;
use duckdb::Connection;
use indicatif::ProgressBar;
use risk_map_database::{queries, tracking};
use risk_map_database_models::{EarthquakeRow, ImportCursor};
use risk_map_risk_models::pga_for_label;
use risk_map_source::dataset_def::{AccidentDataset, EarthquakeDataset};
use risk_map_source::dedup::collapse_duplicates;
use risk_map_source::{accident, earthquake};
use risk_map_spatial::Coordinate;

/// Result of one orchestration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceOutcome {
    /// A data slice was read, deduplicated, and aggregated.
    Imported {
        /// The cursor that was persisted.
        cursor: ImportCursor,
        /// Records aggregated after deduplication.
        records: u64,
    },
    /// A boundary state (month 0) was crossed; no source data exists there.
    Boundary {
        /// The cursor that was persisted.
        cursor: ImportCursor,
    },
    /// The cursor is past the dataset's published range; nothing was done.
    UpToDate {
        /// Last year with published files.
        ending_year: u16,
    },
}

/// Imports the next accident slice.
///
/// Loads the cursor (initializing to the dataset's starting year if none
/// exists), advances it one step, and executes that unit: a (rank 1,
/// month 12) state reads the whole-year A1 file, a (rank 2, month 1..=12)
/// state reads one monthly A2 file, and month-0 states are boundaries that
/// only persist the transition. Past the published range, reports up-to-date
/// without touching the cursor.
///
/// Failure at any step leaves the previously persisted cursor untouched, so
/// a retry reprocesses the same slice. Because the upserts are
/// create-or-increment, such a retry double-counts any keys the failed
/// attempt already wrote — surfaced as a warning at the start of every data
/// slice rather than silently resolved.
///
/// # Errors
///
/// Returns an error if reading the slice, validating a coordinate, any
/// upsert, or persisting the cursor fails.
pub fn import_next_slice(
    conn: &Connection,
    dataset: &AccidentDataset,
    data_dir: &Path,
) -> Result<SliceOutcome, Box<dyn std::error::Error>> {
    let start = Instant::now();

    let current = tracking::load_cursor(conn)?
        .unwrap_or_else(|| ImportCursor::initial(dataset.starting_year));
    let next = current.advance();

    if next.year > dataset.ending_year {
        log::info!(
            "Import is up to date: next slice would be {next}, past ending year {}",
            dataset.ending_year
        );
        return Ok(SliceOutcome::UpToDate {
            ending_year: dataset.ending_year,
        });
    }

    if next.is_boundary() {
        tracking::store_cursor(conn, next)?;
        log::info!("Crossed import boundary: cursor now at {next}");
        return Ok(SliceOutcome::Boundary { cursor: next });
    }

    log::warn!(
        "Importing slice {next}. If an earlier attempt of this slice failed part-way, \
         its keys were already incremented and this run will double-count them."
    );

    let records = accident::read_slice(dataset, data_dir, next.year, next.slice_month(), next.rank)?;
    let total_raw = records.len();
    let records = collapse_duplicates(records);
    log::info!(
        "Slice {next}: {} records after deduplication ({} raw)",
        records.len(),
        total_raw
    );

    let bar = ProgressBar::new(records.len() as u64);
    for record in &records {
        let coordinate = Coordinate::new(record.latitude, record.longitude)?;
        queries::upsert_traffic_accident(
            conn,
            &coordinate,
            record.fatality,
            record.injury,
            record.includes_pedestrian,
        )?;
        queries::upsert_pedestrian_hell(
            conn,
            &record.area_1,
            &record.area_2,
            record.fatality,
            record.injury,
            record.includes_pedestrian,
        )?;
        bar.inc(1);
    }
    bar.finish_and_clear();

    tracking::store_cursor(conn, next)?;

    let elapsed = start.elapsed();
    log::info!(
        "Imported {} records for {next} in {:.1}s",
        records.len(),
        elapsed.as_secs_f64()
    );

    Ok(SliceOutcome::Imported {
        cursor: next,
        records: records.len() as u64,
    })
}

/// Imports one year of the earthquake log.
///
/// Appends every event to the `earthquake` table and folds its intensity
/// into the per-area aggregate. `today` controls the running-year
/// truncation.
///
/// Returns the number of events imported.
///
/// # Errors
///
/// Returns an error if reading the year, decoding an intensity label, or
/// any database write fails.
pub fn import_earthquakes(
    conn: &Connection,
    dataset: &EarthquakeDataset,
    data_dir: &Path,
    year: u16,
    today: NaiveDate,
) -> Result<u64, Box<dyn std::error::Error>> {
    log::warn!(
        "Importing earthquake year {year}. Re-importing a year appends its events again \
         and double-counts the intensity aggregates."
    );

    let records = earthquake::read_year(dataset, data_dir, year, today)?;

    let bar = ProgressBar::new(records.len() as u64);
    for record in &records {
        queries::insert_earthquake(
            conn,
            &EarthquakeRow {
                date: record.date,
                time: record.time,
                latitude: record.latitude,
                longitude: record.longitude,
                magnitude: record.magnitude,
                depth: record.depth,
            },
        )?;

        let pga = pga_for_label(&record.intensity)?;
        queries::upsert_earthquake_intensity(conn, &record.area, pga)?;
        bar.inc(1);
    }
    bar.finish_and_clear();

    log::info!("Imported {} earthquake events for {year}", records.len());
    Ok(records.len() as u64)
}

#[cfg(test)]
mod tests {
    use risk_map_database::db;
    use risk_map_database::queries::store_counts;
    use risk_map_risk_models::AccidentSeverity;

    use super::*;

    fn write_accident_files(dir: &Path, dataset: &AccidentDataset) {
        let year = dataset.starting_year;
        let header =
            "發生日期,發生時間,經度,緯度,死亡受傷人數,發生地點,事故類型及型態大類別名稱";
        let trailer = "資料說明:本表係依警察機關受理資料統計\n統計期間\n";

        let yearly = dir.join(format!("accidents/{year}"));
        std::fs::create_dir_all(&yearly).unwrap();
        std::fs::write(
            dir.join(format!("accidents/{year}/{year}年度A1交通事故資料.csv")),
            format!(
                "{header}\n20220105,80000,121.5,25.05,死亡1;受傷0,新北市板橋區文化路一段,車與人\n{trailer}"
            ),
        )
        .unwrap();

        for month in 1..=12 {
            let body = if month == 1 {
                // Two rows sharing a timestamp and coordinate: one survives.
                format!(
                    "{header}\n\
                     20220110,91500,121.6,25.06,死亡0;受傷2,臺北市中山北路二段,車與車\n\
                     20220110,91500,121.6,25.06,死亡0;受傷2,臺北市中山北路二段,車與車\n\
                     {trailer}"
                )
            } else {
                format!("{header}\n{trailer}")
            };
            std::fs::write(
                dir.join(format!(
                    "accidents/{year}/{year}年度A2交通事故資料_{month}.csv"
                )),
                body,
            )
            .unwrap();
        }
    }

    fn temp_data_dir(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "risk_map_ingest_test_{tag}_{}",
            std::process::id()
        ));
        if dir.exists() {
            std::fs::remove_dir_all(&dir).unwrap();
        }
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn test_dataset() -> AccidentDataset {
        let mut dataset = risk_map_source::registry::accident_dataset();
        // One-year window keeps the walk short.
        dataset.ending_year = dataset.starting_year;
        dataset
    }

    #[test]
    fn walks_the_cursor_through_a_full_year() {
        let dataset = test_dataset();
        let data_dir = temp_data_dir("walk");
        write_accident_files(&data_dir, &dataset);

        let conn = db::open_in_memory().unwrap();

        // A1 whole-year slice.
        let outcome = import_next_slice(&conn, &dataset, &data_dir).unwrap();
        assert_eq!(
            outcome,
            SliceOutcome::Imported {
                cursor: ImportCursor {
                    year: dataset.starting_year,
                    month: 12,
                    rank: AccidentSeverity::A1,
                },
                records: 1,
            }
        );

        // Rank boundary.
        let outcome = import_next_slice(&conn, &dataset, &data_dir).unwrap();
        assert!(matches!(outcome, SliceOutcome::Boundary { cursor } if cursor.month == 0));

        // Twelve A2 months; January holds one record after dedup.
        for month in 1..=12 {
            let outcome = import_next_slice(&conn, &dataset, &data_dir).unwrap();
            let expected_records = u64::from(month == 1);
            assert_eq!(
                outcome,
                SliceOutcome::Imported {
                    cursor: ImportCursor {
                        year: dataset.starting_year,
                        month,
                        rank: AccidentSeverity::A2,
                    },
                    records: expected_records,
                }
            );
        }

        // Past the configured range: cursor stays put.
        let before = tracking::load_cursor(&conn).unwrap();
        let outcome = import_next_slice(&conn, &dataset, &data_dir).unwrap();
        assert!(matches!(outcome, SliceOutcome::UpToDate { .. }));
        assert_eq!(tracking::load_cursor(&conn).unwrap(), before);

        let counts = store_counts(&conn).unwrap();
        assert_eq!(counts.traffic_cells, 2);
        assert_eq!(counts.pedestrian_areas, 2);

        let area = queries::get_pedestrian_hell(&conn, "新北市", "板橋區").unwrap();
        assert_eq!(area.number, 1);
        assert_eq!(area.pedestrian_fatality, 1);

        std::fs::remove_dir_all(&data_dir).unwrap();
    }

    #[test]
    fn failed_slice_leaves_the_cursor_untouched() {
        let dataset = test_dataset();
        let data_dir = temp_data_dir("fail");
        // No files on disk: the first data slice fails with an I/O error.

        let conn = db::open_in_memory().unwrap();
        assert!(import_next_slice(&conn, &dataset, &data_dir).is_err());
        assert_eq!(tracking::load_cursor(&conn).unwrap(), None);

        std::fs::remove_dir_all(&data_dir).unwrap();
    }

    #[test]
    fn imports_an_earthquake_year() {
        let dataset = risk_map_source::registry::earthquake_dataset();
        let data_dir = temp_data_dir("quake");
        std::fs::create_dir_all(data_dir.join("earthquakes")).unwrap();
        std::fs::write(
            data_dir.join(format!(
                "earthquakes/earthquake_{}年.csv",
                dataset.starting_year
            )),
            "Date,Time,北緯,東經,芮氏規模,深度,城市,震度\n\
             2022-01-12,03:14:05,23.95,121.55,5.2,18.7,花蓮縣,4\n\
             2022-02-03,11:02:44,24.12,121.68,4.1,30.0,花蓮縣,5 弱\n",
        )
        .unwrap();

        let conn = db::open_in_memory().unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
        let imported =
            import_earthquakes(&conn, &dataset, &data_dir, dataset.starting_year, today).unwrap();
        assert_eq!(imported, 2);

        let row = queries::get_earthquake_intensity(&conn, "花蓮縣").unwrap();
        assert_eq!(row.number, 2);
        // 25.0 (4級) + 80.0 (5弱)
        assert!((row.total_pga - 105.0).abs() < f64::EPSILON);

        std::fs::remove_dir_all(&data_dir).unwrap();
    }
}
