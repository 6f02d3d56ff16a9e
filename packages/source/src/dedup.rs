//! Adjacent-duplicate collapse for accident records.
//!
//! The publisher emits one row per involved party, so a single accident
//! appears as several consecutive rows sharing a timestamp and coordinate.
//! This pass suppresses exactly those adjacent exact repeats: two accidents
//! at the same instant in different places are distinct events and both
//! survive.

use risk_map_source_models::AccidentRecord;

/// Collapses consecutive records that share a timestamp and coordinate.
///
/// Records are first sorted by (date, time) — the stable sort preserves the
/// publisher's row order within a timestamp, so the adjacency rule does not
/// depend on the caller having kept file order. The pass itself is a single
/// left-to-right scan with O(1) state: a repeat of the last-seen timestamp
/// and coordinate is dropped; a record at the last-seen timestamp but a
/// different coordinate is kept and becomes the new last-seen coordinate;
/// a new timestamp is always kept.
#[must_use]
pub fn collapse_duplicates(mut records: Vec<AccidentRecord>) -> Vec<AccidentRecord> {
    records.sort_by(|a, b| (a.date, a.time).cmp(&(b.date, b.time)));

    let mut kept = Vec::with_capacity(records.len());
    let mut last_seen: Option<(chrono::NaiveDate, chrono::NaiveTime, f64, f64)> = None;

    for record in records {
        match last_seen {
            Some((date, time, latitude, longitude))
                if date == record.date && time == record.time =>
            {
                if latitude.to_bits() == record.latitude.to_bits()
                    && longitude.to_bits() == record.longitude.to_bits()
                {
                    continue;
                }
                last_seen = Some((record.date, record.time, record.latitude, record.longitude));
            }
            _ => {
                last_seen = Some((record.date, record.time, record.latitude, record.longitude));
            }
        }
        kept.push(record);
    }

    kept
}
