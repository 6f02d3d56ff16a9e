//! Shared parsing utilities for the dataset readers.
//!
//! Pure field-level decoders for the publisher's formats: compact numeric
//! dates/times, the combined casualty code, the administrative-area location
//! prefix, and seismic intensity labels.

use chrono::{NaiveDate, NaiveTime};

/// Administrative suffix markers that terminate a township/district name.
///
/// A level-2 area name is three characters only when it ends in one of
/// these; otherwise the third character already belongs to the street part
/// of the location string.
pub const ADMIN_SUFFIX_MARKERS: &[char] = &['鄉', '鎮', '市', '區'];

/// Parses a compact `YYYYMMDD` date field.
///
/// The publisher serializes the column as a number, so values may arrive
/// with a trailing fraction (`"20220102.0"`); the integer part is used.
#[must_use]
pub fn parse_compact_date(s: &str) -> Option<NaiveDate> {
    let digits = s.trim().split('.').next()?;
    NaiveDate::parse_from_str(digits, "%Y%m%d").ok()
}

/// Parses a compact `HHMMSS` time field, zero-padding short values
/// (`"91500"` is 09:15:00).
#[must_use]
pub fn parse_compact_time(s: &str) -> Option<NaiveTime> {
    let digits = s.trim().split('.').next()?;
    if digits.len() > 6 || digits.chars().any(|c| !c.is_ascii_digit()) {
        return None;
    }
    NaiveTime::parse_from_str(&format!("{digits:0>6}"), "%H%M%S").ok()
}

/// Parses a `YYYY-MM-DD` date field.
#[must_use]
pub fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// Parses a `HH:MM:SS` time field.
#[must_use]
pub fn parse_clock_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M:%S").ok()
}

/// Decodes the combined casualty field into (fatality, injury) counts.
///
/// The field is a fixed-position code: the 3rd character is the fatality
/// digit and the last character the injury digit (e.g. `死亡2;受傷3`).
#[must_use]
pub fn decode_casualties(s: &str) -> Option<(u32, u32)> {
    let fatality = s.chars().nth(2)?.to_digit(10)?;
    let injury = s.chars().last()?.to_digit(10)?;
    Some((fatality, injury))
}

/// Splits a location string into its two administrative levels.
///
/// Level 1 is the first three characters (county/city). Level 2 is the next
/// two or three: three only when the third character is one of `markers`,
/// otherwise it is truncated to two. Returns `None` when the string is too
/// short to carry both levels.
#[must_use]
pub fn split_administrative_area(location: &str, markers: &[char]) -> Option<(String, String)> {
    let chars: Vec<char> = location.chars().collect();
    if chars.len() < 5 {
        return None;
    }
    let area_1: String = chars[..3].iter().collect();
    let mut level_2: Vec<char> = chars[3..chars.len().min(6)].to_vec();
    if level_2.len() == 3 && !markers.contains(&level_2[2]) {
        level_2.truncate(2);
    }
    let area_2: String = level_2.into_iter().collect();
    Some((area_1, area_2))
}

/// Normalizes a seismic intensity label.
///
/// Single-character labels gain the 級 unit suffix; longer labels have
/// embedded whitespace stripped (`"5 弱"` becomes `"5弱"`).
#[must_use]
pub fn normalize_intensity(label: &str) -> String {
    let trimmed = label.trim();
    if trimmed.chars().count() == 1 {
        return format!("{trimmed}級");
    }
    trimmed.chars().filter(|c| !c.is_whitespace()).collect()
}
