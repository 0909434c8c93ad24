use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

use crate::models::AlbumSubmission;

/// Release dates are always day-month-year.
pub const RELEASE_DATE_FORMAT: &str = "%d-%m-%Y";

/// A record as it appears in a submission file. Every field is loosely typed
/// because list exports disagree on whether numbers are quoted.
/// Legacy `rating` and `comments` keys are not declared and so are dropped.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawRecord {
    album: Value,
    artist: Value,
    country: Value,
    release_date: Value,
    rank: Value,
    points: Value,
    genre_1: Value,
    genre_2: Value,
    cover_image: Value,
}

impl RawRecord {
    /// Type the record. Returns `None` only when there is no album title to merge on.
    pub(crate) fn into_submission(self, username: &str) -> Option<AlbumSubmission> {
        let album = coerce_text(&self.album)?;
        Some(AlbumSubmission {
            album,
            artist: coerce_text(&self.artist),
            country: coerce_text(&self.country),
            release_date: coerce_text(&self.release_date)
                .as_deref()
                .and_then(parse_release_date),
            rank: coerce_int(&self.rank),
            points: coerce_int(&self.points),
            genre_1: coerce_text(&self.genre_1),
            genre_2: coerce_text(&self.genre_2),
            cover_image: match self.cover_image {
                Value::String(s) if !s.is_empty() => Some(s),
                _ => None,
            },
            username: username.to_string(),
        })
    }
}

/// Strict `DD-MM-YYYY`; anything else is treated as no date.
pub fn parse_release_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, RELEASE_DATE_FORMAT).ok()
}

/// Integers, integral floats and numeric strings become integers; everything else is `None`.
pub fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
        }
        _ => None,
    }
}

fn integral(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// Strings pass through; numeric titles (an album called "1989") are stringified.
fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
