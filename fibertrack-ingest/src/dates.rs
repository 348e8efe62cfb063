//! Start/end time normalization
//!
//! Sheets write timestamps as `15 Ocak 2025 14:30:00` (Turkish month name),
//! as native date cells, or as whatever a person typed. Parsing never fails:
//! anything unrecognized becomes `None`, never the current time.

use crate::batch::CellValue;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta};
use fibertrack_common::text::turkish_lowercase;

/// Fixed layout of the localized timestamps, after month substitution
pub const LOCALIZED_FORMAT: &str = "%d %B %Y %H:%M:%S";

/// Turkish month names, matched after [`fold_turkish`] on both sides
const TURKISH_MONTHS: &[(&str, &str)] = &[
    ("ocak", "January"),
    ("şubat", "February"),
    ("mart", "March"),
    ("nisan", "April"),
    ("mayıs", "May"),
    ("haziran", "June"),
    ("temmuz", "July"),
    ("ağustos", "August"),
    ("eylül", "September"),
    ("ekim", "October"),
    ("kasım", "November"),
    ("aralık", "December"),
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d %B %Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y", "%d %B %Y"];

/// Largest serial Excel can display (9999-12-31)
const EXCEL_MAX_SERIAL: f64 = 2_958_466.0;

/// Interpret a cell as a timestamp
pub fn normalize_datetime(cell: &CellValue) -> Option<NaiveDateTime> {
    match cell {
        CellValue::Empty => None,
        CellValue::DateTime(dt) => Some(*dt),
        CellValue::Number(serial) => excel_serial_to_datetime(*serial),
        CellValue::Text(raw) => parse_datetime_text(raw),
    }
}

/// Localized pattern first, then the general formats
pub fn parse_datetime_text(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let localized = localize_month_names(raw);
    NaiveDateTime::parse_from_str(&localized, LOCALIZED_FORMAT)
        .ok()
        .or_else(|| parse_best_effort(&localized))
}

/// Replace every Turkish month token with its English name
pub fn localize_month_names(raw: &str) -> String {
    raw.split_whitespace()
        .map(|token| {
            let folded = fold_turkish(token);
            TURKISH_MONTHS
                .iter()
                .find(|(tr, _)| fold_turkish(tr) == folded)
                .map(|(_, en)| *en)
                .unwrap_or(token)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lowercase, then drop Turkish diacritics and the dotless ı.
///
/// Sheets mix `MAYIS`, `Mayıs` and `mayis`; ASCII capitals also turn `NISAN`
/// into `nısan` under Turkish casing.
fn fold_turkish(token: &str) -> String {
    turkish_lowercase(token)
        .chars()
        .map(|ch| match ch {
            'ı' => 'i',
            'ş' => 's',
            'ğ' => 'g',
            'ü' => 'u',
            'ö' => 'o',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

fn parse_best_effort(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Excel 1900-system serial (days since 1899-12-30), rounded to the second
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(1.0..EXCEL_MAX_SERIAL).contains(&serial) {
        return None;
    }

    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let seconds = (serial * 86_400.0).round() as i64;
    epoch.checked_add_signed(TimeDelta::try_seconds(seconds)?)
}
