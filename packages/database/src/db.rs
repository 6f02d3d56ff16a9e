//! Database connection and schema management.

use std::path::Path;

use duckdb::Connection;

use crate::DbError;

/// Opens (or creates) the risk-map `DuckDB` database and ensures the schema
/// exists.
///
/// # Errors
///
/// Returns [`DbError`] if the connection or schema creation fails.
pub fn open(path: &Path) -> Result<Connection, DbError> {
    if let Some(parent) = path.parent() {
        crate::paths::ensure_dir(parent)?;
    }

    let conn = Connection::open(path)?;
    create_schema(&conn)?;
    log::debug!("Opened risk map database at {}", path.display());

    Ok(conn)
}

/// Opens an in-memory database with the full schema.
///
/// Used by tests and ad-hoc inspection; nothing is persisted.
///
/// # Errors
///
/// Returns [`DbError`] if the connection or schema creation fails.
pub fn open_in_memory() -> Result<Connection, DbError> {
    let conn = Connection::open_in_memory()?;
    create_schema(&conn)?;
    Ok(conn)
}

fn create_schema(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS traffic_accident (
            latitude DOUBLE NOT NULL,
            longitude DOUBLE NOT NULL,
            number BIGINT NOT NULL,
            total_fatality BIGINT NOT NULL,
            total_injury BIGINT NOT NULL,
            pedestrian_fatality BIGINT NOT NULL,
            pedestrian_injury BIGINT NOT NULL,
            PRIMARY KEY (latitude, longitude)
        );

        CREATE TABLE IF NOT EXISTS pedestrian_hell (
            area_1 TEXT NOT NULL,
            area_2 TEXT NOT NULL,
            number BIGINT NOT NULL,
            total_fatality BIGINT NOT NULL,
            total_injury BIGINT NOT NULL,
            pedestrian_fatality BIGINT NOT NULL,
            pedestrian_injury BIGINT NOT NULL,
            PRIMARY KEY (area_1, area_2)
        );

        CREATE TABLE IF NOT EXISTS earthquake (
            date TEXT NOT NULL,
            time TEXT NOT NULL,
            latitude DOUBLE NOT NULL,
            longitude DOUBLE NOT NULL,
            magnitude DOUBLE NOT NULL,
            depth DOUBLE NOT NULL
        );

        CREATE TABLE IF NOT EXISTS earthquake_intensity (
            area TEXT PRIMARY KEY,
            number BIGINT NOT NULL,
            total_pga DOUBLE NOT NULL
        );

        CREATE TABLE IF NOT EXISTS _meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )?;

    Ok(())
}
