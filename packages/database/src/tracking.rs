//! Import progress tracking through the `_meta` table.
//!
//! The cursor is three `_meta` rows (`tracking_year`, `tracking_month`,
//! `tracking_rank`) written in one transaction, so a crash between slices
//! can never leave a half-advanced cursor.

use duckdb::Connection;
use risk_map_database_models::ImportCursor;
use risk_map_risk_models::AccidentSeverity;

use crate::DbError;

const KEY_YEAR: &str = "tracking_year";
const KEY_MONTH: &str = "tracking_month";
const KEY_RANK: &str = "tracking_rank";

/// Gets a metadata value from the `_meta` table.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn get_meta(conn: &Connection, key: &str) -> Result<Option<String>, DbError> {
    let mut stmt = conn.prepare("SELECT value FROM _meta WHERE key = ?")?;
    let result = stmt.query_row([key], |row| row.get(0));
    match result {
        Ok(v) => Ok(Some(v)),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(DbError::DuckDb(e)),
    }
}

/// Sets a metadata value in the `_meta` table.
///
/// # Errors
///
/// Returns [`DbError`] if the upsert fails.
pub fn set_meta(conn: &Connection, key: &str, value: &str) -> Result<(), DbError> {
    conn.execute(
        "INSERT INTO _meta (key, value) VALUES (?, ?)
         ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
        duckdb::params![key, value],
    )?;
    Ok(())
}

/// Loads the persisted import cursor, or `None` if no import has run yet.
///
/// # Errors
///
/// Returns [`DbError::Conversion`] if the stored cursor is incomplete or
/// malformed (e.g. a rank outside 1/2).
pub fn load_cursor(conn: &Connection) -> Result<Option<ImportCursor>, DbError> {
    let year = get_meta(conn, KEY_YEAR)?;
    let month = get_meta(conn, KEY_MONTH)?;
    let rank = get_meta(conn, KEY_RANK)?;

    let (Some(year), Some(month), Some(rank)) = (year, month, rank) else {
        return Ok(None);
    };

    let year: u16 = year
        .parse()
        .map_err(|_| DbError::conversion(format!("bad {KEY_YEAR}: {year:?}")))?;
    let month: u8 = month
        .parse()
        .map_err(|_| DbError::conversion(format!("bad {KEY_MONTH}: {month:?}")))?;
    let rank: u8 = rank
        .parse()
        .map_err(|_| DbError::conversion(format!("bad {KEY_RANK}: {rank:?}")))?;
    let rank = AccidentSeverity::from_rank(rank)
        .map_err(|e| DbError::conversion(format!("bad {KEY_RANK}: {e}")))?;

    Ok(Some(ImportCursor { year, month, rank }))
}

/// Persists the import cursor in a single transaction.
///
/// # Errors
///
/// Returns [`DbError`] if the write fails.
pub fn store_cursor(conn: &Connection, cursor: ImportCursor) -> Result<(), DbError> {
    // All three values are numeric, so inline SQL is safe here and keeps the
    // write in one atomic batch without needing a mutable connection.
    conn.execute_batch(&format!(
        "BEGIN TRANSACTION;
         INSERT INTO _meta (key, value) VALUES ('{KEY_YEAR}', '{year}')
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value;
         INSERT INTO _meta (key, value) VALUES ('{KEY_MONTH}', '{month}')
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value;
         INSERT INTO _meta (key, value) VALUES ('{KEY_RANK}', '{rank}')
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value;
         COMMIT;",
        year = cursor.year,
        month = cursor.month,
        rank = cursor.rank.rank(),
    ))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn meta_round_trips_and_overwrites() {
        let conn = db::open_in_memory().unwrap();
        assert_eq!(get_meta(&conn, "k").unwrap(), None);
        set_meta(&conn, "k", "v1").unwrap();
        assert_eq!(get_meta(&conn, "k").unwrap(), Some("v1".to_string()));
        set_meta(&conn, "k", "v2").unwrap();
        assert_eq!(get_meta(&conn, "k").unwrap(), Some("v2".to_string()));
    }

    #[test]
    fn missing_cursor_loads_as_none() {
        let conn = db::open_in_memory().unwrap();
        assert_eq!(load_cursor(&conn).unwrap(), None);
    }

    #[test]
    fn cursor_round_trips() {
        let conn = db::open_in_memory().unwrap();
        let cursor = ImportCursor {
            year: 111,
            month: 7,
            rank: AccidentSeverity::A2,
        };
        store_cursor(&conn, cursor).unwrap();
        assert_eq!(load_cursor(&conn).unwrap(), Some(cursor));
    }

    #[test]
    fn malformed_rank_is_a_conversion_error() {
        let conn = db::open_in_memory().unwrap();
        set_meta(&conn, "tracking_year", "111").unwrap();
        set_meta(&conn, "tracking_month", "0").unwrap();
        set_meta(&conn, "tracking_rank", "9").unwrap();
        assert!(matches!(
            load_cursor(&conn),
            Err(DbError::Conversion { .. })
        ));
    }
}
