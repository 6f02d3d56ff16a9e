//! Query functions for the aggregate tables.
//!
//! Upserts are single `INSERT … ON CONFLICT … DO UPDATE` statements so the
//! per-key read-modify-write is atomic. Point lookups return
//! [`DbError::NotFound`] on a miss; the upsert path never does — it creates
//! the row instead.

use std::collections::BTreeSet;

use duckdb::Connection;
use risk_map_database_models::{
    EarthquakeIntensityRow, EarthquakeRow, PedestrianHellRow, RouteAccidentRisk,
    RouteEarthquakeRisk, RouteRisk, TrafficAccidentRow,
};
use risk_map_risk_models::{average_depth, average_magnitude};
use risk_map_spatial::{Coordinate, DEGREE_DIFFERENCE, quantize};

use crate::DbError;

/// Grid cell size for seismic aggregation — earthquakes are sparse, so the
/// cells are two orders of magnitude coarser than the accident grid.
pub const SEISMIC_CELL_SIZE: f64 = 0.01;

/// Number of grid cells matched per route-risk query.
const CELLS_PER_QUERY: usize = 100;

/// Creates or increments the grid-cell aggregate for one accident.
///
/// A miss inserts a fresh row with `number = 1`; a hit increments the count
/// and adds the casualties to the running totals, touching the pedestrian
/// totals only for pedestrian-involved records. One atomic statement per key.
///
/// # Errors
///
/// Returns [`DbError`] if the statement fails.
pub fn upsert_traffic_accident(
    conn: &Connection,
    coordinate: &Coordinate,
    fatality: u32,
    injury: u32,
    includes_pedestrian: bool,
) -> Result<(), DbError> {
    let (pedestrian_fatality, pedestrian_injury) = if includes_pedestrian {
        (fatality, injury)
    } else {
        (0, 0)
    };

    conn.execute(
        "INSERT INTO traffic_accident (
            latitude, longitude, number, total_fatality, total_injury,
            pedestrian_fatality, pedestrian_injury
        ) VALUES (?, ?, 1, ?, ?, ?, ?)
        ON CONFLICT (latitude, longitude) DO UPDATE SET
            number = number + 1,
            total_fatality = total_fatality + EXCLUDED.total_fatality,
            total_injury = total_injury + EXCLUDED.total_injury,
            pedestrian_fatality = pedestrian_fatality + EXCLUDED.pedestrian_fatality,
            pedestrian_injury = pedestrian_injury + EXCLUDED.pedestrian_injury",
        duckdb::params![
            coordinate.latitude_grid,
            coordinate.longitude_grid,
            i64::from(fatality),
            i64::from(injury),
            i64::from(pedestrian_fatality),
            i64::from(pedestrian_injury),
        ],
    )?;

    Ok(())
}

/// Looks up one grid cell's aggregate.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the cell has never been observed.
pub fn get_traffic_accident(
    conn: &Connection,
    latitude_grid: f64,
    longitude_grid: f64,
) -> Result<TrafficAccidentRow, DbError> {
    let mut stmt = conn.prepare(
        "SELECT latitude, longitude, number, total_fatality, total_injury,
                pedestrian_fatality, pedestrian_injury
         FROM traffic_accident WHERE latitude = ? AND longitude = ?",
    )?;
    let result = stmt.query_row(duckdb::params![latitude_grid, longitude_grid], |row| {
        Ok(TrafficAccidentRow {
            latitude: row.get(0)?,
            longitude: row.get(1)?,
            number: row.get(2)?,
            total_fatality: row.get(3)?,
            total_injury: row.get(4)?,
            pedestrian_fatality: row.get(5)?,
            pedestrian_injury: row.get(6)?,
        })
    });
    match result {
        Ok(row) => Ok(row),
        Err(duckdb::Error::QueryReturnedNoRows) => Err(DbError::NotFound {
            entity: "traffic_accident",
            key: format!("({latitude_grid}, {longitude_grid})"),
        }),
        Err(e) => Err(DbError::DuckDb(e)),
    }
}

/// Creates or increments the administrative-area aggregate for one accident.
///
/// Same merge semantics as [`upsert_traffic_accident`], keyed by
/// (`area_1`, `area_2`).
///
/// # Errors
///
/// Returns [`DbError`] if the statement fails.
pub fn upsert_pedestrian_hell(
    conn: &Connection,
    area_1: &str,
    area_2: &str,
    fatality: u32,
    injury: u32,
    includes_pedestrian: bool,
) -> Result<(), DbError> {
    let (pedestrian_fatality, pedestrian_injury) = if includes_pedestrian {
        (fatality, injury)
    } else {
        (0, 0)
    };

    conn.execute(
        "INSERT INTO pedestrian_hell (
            area_1, area_2, number, total_fatality, total_injury,
            pedestrian_fatality, pedestrian_injury
        ) VALUES (?, ?, 1, ?, ?, ?, ?)
        ON CONFLICT (area_1, area_2) DO UPDATE SET
            number = number + 1,
            total_fatality = total_fatality + EXCLUDED.total_fatality,
            total_injury = total_injury + EXCLUDED.total_injury,
            pedestrian_fatality = pedestrian_fatality + EXCLUDED.pedestrian_fatality,
            pedestrian_injury = pedestrian_injury + EXCLUDED.pedestrian_injury",
        duckdb::params![
            area_1,
            area_2,
            i64::from(fatality),
            i64::from(injury),
            i64::from(pedestrian_fatality),
            i64::from(pedestrian_injury),
        ],
    )?;

    Ok(())
}

/// Looks up one administrative area's aggregate.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the area has never been observed.
pub fn get_pedestrian_hell(
    conn: &Connection,
    area_1: &str,
    area_2: &str,
) -> Result<PedestrianHellRow, DbError> {
    let mut stmt = conn.prepare(
        "SELECT area_1, area_2, number, total_fatality, total_injury,
                pedestrian_fatality, pedestrian_injury
         FROM pedestrian_hell WHERE area_1 = ? AND area_2 = ?",
    )?;
    let result = stmt.query_row(duckdb::params![area_1, area_2], |row| {
        Ok(PedestrianHellRow {
            area_1: row.get(0)?,
            area_2: row.get(1)?,
            number: row.get(2)?,
            total_fatality: row.get(3)?,
            total_injury: row.get(4)?,
            pedestrian_fatality: row.get(5)?,
            pedestrian_injury: row.get(6)?,
        })
    });
    match result {
        Ok(row) => Ok(row),
        Err(duckdb::Error::QueryReturnedNoRows) => Err(DbError::NotFound {
            entity: "pedestrian_hell",
            key: format!("({area_1}, {area_2})"),
        }),
        Err(e) => Err(DbError::DuckDb(e)),
    }
}

/// Appends one earthquake event.
///
/// # Errors
///
/// Returns [`DbError`] if the insert fails.
pub fn insert_earthquake(conn: &Connection, event: &EarthquakeRow) -> Result<(), DbError> {
    conn.execute(
        "INSERT INTO earthquake (date, time, latitude, longitude, magnitude, depth)
         VALUES (?, ?, ?, ?, ?, ?)",
        duckdb::params![
            event.date.format("%Y-%m-%d").to_string(),
            event.time.format("%H:%M:%S").to_string(),
            event.latitude,
            event.longitude,
            event.magnitude,
            event.depth,
        ],
    )?;
    Ok(())
}

/// Folds one event's peak ground acceleration into an area's intensity
/// aggregate.
///
/// # Errors
///
/// Returns [`DbError`] if the statement fails.
pub fn upsert_earthquake_intensity(
    conn: &Connection,
    area: &str,
    pga: f64,
) -> Result<(), DbError> {
    conn.execute(
        "INSERT INTO earthquake_intensity (area, number, total_pga)
         VALUES (?, 1, ?)
         ON CONFLICT (area) DO UPDATE SET
            number = number + 1,
            total_pga = total_pga + EXCLUDED.total_pga",
        duckdb::params![area, pga],
    )?;
    Ok(())
}

/// Looks up one area's intensity aggregate.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the area has never been observed.
pub fn get_earthquake_intensity(
    conn: &Connection,
    area: &str,
) -> Result<EarthquakeIntensityRow, DbError> {
    let mut stmt = conn
        .prepare("SELECT area, number, total_pga FROM earthquake_intensity WHERE area = ?")?;
    let result = stmt.query_row([area], |row| {
        Ok(EarthquakeIntensityRow {
            area: row.get(0)?,
            number: row.get(1)?,
            total_pga: row.get(2)?,
        })
    });
    match result {
        Ok(row) => Ok(row),
        Err(duckdb::Error::QueryReturnedNoRows) => Err(DbError::NotFound {
            entity: "earthquake_intensity",
            key: area.to_string(),
        }),
        Err(e) => Err(DbError::DuckDb(e)),
    }
}

/// Row counts per table, for the status display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreCounts {
    /// Distinct accident grid cells.
    pub traffic_cells: i64,
    /// Distinct administrative areas.
    pub pedestrian_areas: i64,
    /// Earthquake events.
    pub earthquakes: i64,
    /// Areas with an intensity aggregate.
    pub intensity_areas: i64,
}

/// Counts the rows of every aggregate table.
///
/// # Errors
///
/// Returns [`DbError`] if a query fails.
pub fn store_counts(conn: &Connection) -> Result<StoreCounts, DbError> {
    let count = |table: &str| -> Result<i64, DbError> {
        let sql = format!("SELECT CAST(COUNT(*) AS BIGINT) FROM {table}");
        let mut stmt = conn.prepare(&sql)?;
        Ok(stmt.query_row([], |row| row.get(0))?)
    };
    Ok(StoreCounts {
        traffic_cells: count("traffic_accident")?,
        pedestrian_areas: count("pedestrian_hell")?,
        earthquakes: count("earthquake")?,
        intensity_areas: count("earthquake_intensity")?,
    })
}

/// Computes the risk summary along a route of raw coordinates.
///
/// The route is quantized onto the accident grid and the coarser seismic
/// grid, deduplicated, and summed against the stores in chunks.
///
/// # Errors
///
/// Returns [`DbError`] if any query fails or stored events fail to decode.
pub fn route_risk(conn: &Connection, coordinates: &[Coordinate]) -> Result<RouteRisk, DbError> {
    let accident_cells = grid_cells(coordinates, DEGREE_DIFFERENCE);
    let seismic_cells = grid_cells(coordinates, SEISMIC_CELL_SIZE);

    Ok(RouteRisk {
        accident: route_accident_risk(conn, &accident_cells)?,
        earthquake: route_earthquake_risk(conn, &seismic_cells)?,
    })
}

/// Quantizes a route onto a grid and removes duplicate cells.
fn grid_cells(coordinates: &[Coordinate], cell_size: f64) -> Vec<(f64, f64)> {
    let mut seen = BTreeSet::new();
    let mut cells = Vec::new();
    for coordinate in coordinates {
        let (latitude, longitude) = coordinate.grid_at(cell_size);
        if seen.insert((latitude.to_bits(), longitude.to_bits())) {
            cells.push((latitude, longitude));
        }
    }
    cells
}

fn route_accident_risk(
    conn: &Connection,
    cells: &[(f64, f64)],
) -> Result<RouteAccidentRisk, DbError> {
    let mut risk = RouteAccidentRisk::default();

    for chunk in cells.chunks(CELLS_PER_QUERY) {
        let mut sql = String::from(
            "SELECT CAST(COALESCE(SUM(number), 0) AS BIGINT),
                    CAST(COALESCE(SUM(total_fatality), 0) AS BIGINT),
                    CAST(COALESCE(SUM(total_injury), 0) AS BIGINT)
             FROM traffic_accident WHERE ",
        );
        let mut params = Vec::with_capacity(chunk.len() * 2);
        for (i, (latitude, longitude)) in chunk.iter().enumerate() {
            if i > 0 {
                sql.push_str(" OR ");
            }
            sql.push_str("(latitude = ? AND longitude = ?)");
            params.push(*latitude);
            params.push(*longitude);
        }

        let mut stmt = conn.prepare(&sql)?;
        let (number, total_fatality, total_injury) =
            stmt.query_row(duckdb::params_from_iter(params), |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?;

        risk.number += number;
        risk.total_fatality += total_fatality;
        risk.total_injury += total_injury;
    }

    Ok(risk)
}

fn route_earthquake_risk(
    conn: &Connection,
    cells: &[(f64, f64)],
) -> Result<RouteEarthquakeRisk, DbError> {
    let cell_set: BTreeSet<(u64, u64)> = cells
        .iter()
        .map(|(latitude, longitude)| (latitude.to_bits(), longitude.to_bits()))
        .collect();

    let mut stmt = conn.prepare(
        "SELECT date, time, latitude, longitude, magnitude, depth FROM earthquake",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, f64>(2)?,
            row.get::<_, f64>(3)?,
            row.get::<_, f64>(4)?,
            row.get::<_, f64>(5)?,
        ))
    })?;

    let mut events = Vec::new();
    let mut magnitudes = Vec::new();
    let mut depths = Vec::new();

    for row in rows {
        let (date, time, latitude, longitude, magnitude, depth) = row?;

        let key = (
            quantize(latitude, SEISMIC_CELL_SIZE).to_bits(),
            quantize(longitude, SEISMIC_CELL_SIZE).to_bits(),
        );
        if !cell_set.contains(&key) {
            continue;
        }

        let date = chrono::NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .map_err(|e| DbError::conversion(format!("bad earthquake date {date:?}: {e}")))?;
        let time = chrono::NaiveTime::parse_from_str(&time, "%H:%M:%S")
            .map_err(|e| DbError::conversion(format!("bad earthquake time {time:?}: {e}")))?;

        magnitudes.push(magnitude);
        depths.push(depth);
        events.push(EarthquakeRow {
            date,
            time,
            latitude,
            longitude,
            magnitude,
            depth,
        });
    }

    Ok(RouteEarthquakeRisk {
        number: i64::try_from(events.len()).unwrap_or(i64::MAX),
        average_magnitude: average_magnitude(&magnitudes),
        average_depth: average_depth(&depths),
        events,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn coordinate(latitude: f64, longitude: f64) -> Coordinate {
        Coordinate::new(latitude, longitude).unwrap()
    }

    #[test]
    fn upsert_merges_into_one_grid_cell() {
        let conn = db::open_in_memory().unwrap();
        let at = coordinate(24.438_91, 118.249_74);

        upsert_traffic_accident(&conn, &at, 1, 2, true).unwrap();
        upsert_traffic_accident(&conn, &at, 0, 1, false).unwrap();

        let row = get_traffic_accident(&conn, at.latitude_grid, at.longitude_grid).unwrap();
        assert_eq!(row.number, 2);
        assert_eq!(row.total_fatality, 1);
        assert_eq!(row.total_injury, 3);
        assert_eq!(row.pedestrian_fatality, 1);
        assert_eq!(row.pedestrian_injury, 2);
    }

    #[test]
    fn distinct_cells_stay_distinct() {
        let conn = db::open_in_memory().unwrap();
        upsert_traffic_accident(&conn, &coordinate(24.0001, 121.0), 0, 1, false).unwrap();
        upsert_traffic_accident(&conn, &coordinate(24.0002, 121.0), 0, 1, false).unwrap();

        assert_eq!(store_counts(&conn).unwrap().traffic_cells, 2);
        let row = get_traffic_accident(&conn, 24.0001, 121.0).unwrap();
        assert_eq!(row.number, 1);
    }

    #[test]
    fn missing_cell_is_not_found() {
        let conn = db::open_in_memory().unwrap();
        assert!(matches!(
            get_traffic_accident(&conn, 25.0, 121.5),
            Err(DbError::NotFound { .. })
        ));
    }

    #[test]
    fn area_upsert_merges_like_the_grid() {
        let conn = db::open_in_memory().unwrap();
        upsert_pedestrian_hell(&conn, "新北市", "板橋區", 1, 2, true).unwrap();
        upsert_pedestrian_hell(&conn, "新北市", "板橋區", 0, 1, false).unwrap();
        upsert_pedestrian_hell(&conn, "新北市", "三重區", 0, 1, false).unwrap();

        let row = get_pedestrian_hell(&conn, "新北市", "板橋區").unwrap();
        assert_eq!(row.number, 2);
        assert_eq!(row.total_fatality, 1);
        assert_eq!(row.total_injury, 3);
        assert_eq!(row.pedestrian_fatality, 1);
        assert_eq!(row.pedestrian_injury, 2);

        assert!(matches!(
            get_pedestrian_hell(&conn, "新北市", "新莊區"),
            Err(DbError::NotFound { .. })
        ));
    }

    #[test]
    fn rerunning_a_slice_double_counts_existing_keys() {
        // Upsert is create-or-increment, not idempotent: replaying the same
        // records doubles the tallies. The orchestrator surfaces this as an
        // operator warning instead of hiding it.
        let conn = db::open_in_memory().unwrap();
        let at = coordinate(25.05, 121.5);

        upsert_traffic_accident(&conn, &at, 1, 1, false).unwrap();
        upsert_traffic_accident(&conn, &at, 1, 1, false).unwrap();

        let row = get_traffic_accident(&conn, at.latitude_grid, at.longitude_grid).unwrap();
        assert_eq!(row.number, 2);
        assert_eq!(row.total_fatality, 2);
    }

    #[test]
    fn intensity_fold_accumulates_pga() {
        let conn = db::open_in_memory().unwrap();
        upsert_earthquake_intensity(&conn, "花蓮縣", 80.0).unwrap();
        upsert_earthquake_intensity(&conn, "花蓮縣", 120.0).unwrap();

        let row = get_earthquake_intensity(&conn, "花蓮縣").unwrap();
        assert_eq!(row.number, 2);
        assert!((row.total_pga - 200.0).abs() < f64::EPSILON);
        assert_eq!(row.intensity_label(), Some("5弱"));

        assert!(matches!(
            get_earthquake_intensity(&conn, "臺東縣"),
            Err(DbError::NotFound { .. })
        ));
    }

    #[test]
    fn route_risk_sums_matching_cells_only() {
        let conn = db::open_in_memory().unwrap();
        let on_route = coordinate(25.047_61, 121.517_24);
        let off_route = coordinate(25.1, 121.6);

        upsert_traffic_accident(&conn, &on_route, 1, 2, false).unwrap();
        upsert_traffic_accident(&conn, &on_route, 0, 1, true).unwrap();
        upsert_traffic_accident(&conn, &off_route, 5, 5, false).unwrap();

        // Two raw points in the same cell exercise the dedup.
        let route = vec![
            coordinate(25.047_63, 121.517_21),
            coordinate(25.047_58, 121.517_24),
        ];
        let risk = route_risk(&conn, &route).unwrap();
        assert_eq!(risk.accident.number, 2);
        assert_eq!(risk.accident.total_fatality, 1);
        assert_eq!(risk.accident.total_injury, 3);
        assert_eq!(risk.earthquake.number, 0);
        assert_eq!(risk.earthquake.average_magnitude, None);
    }

    #[test]
    fn route_risk_collects_nearby_earthquakes() {
        let conn = db::open_in_memory().unwrap();
        let near = EarthquakeRow {
            date: chrono::NaiveDate::from_ymd_opt(2023, 1, 12).unwrap(),
            time: chrono::NaiveTime::from_hms_opt(3, 14, 5).unwrap(),
            latitude: 23.951,
            longitude: 121.552,
            magnitude: 5.0,
            depth: 20.0,
        };
        let far = EarthquakeRow {
            latitude: 22.0,
            longitude: 120.0,
            ..near.clone()
        };
        insert_earthquake(&conn, &near).unwrap();
        insert_earthquake(&conn, &far).unwrap();

        let route = vec![coordinate(23.948, 121.549)];
        let risk = route_risk(&conn, &route).unwrap();
        assert_eq!(risk.earthquake.number, 1);
        assert!((risk.earthquake.average_magnitude.unwrap() - 5.0).abs() < 1e-10);
        assert!((risk.earthquake.average_depth.unwrap() - 20.0).abs() < f64::EPSILON);
        assert_eq!(risk.earthquake.events[0].date, near.date);
    }
}
