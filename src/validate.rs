use std::collections::BTreeSet;

use thiserror::Error;

use crate::models::UnifiedAlbum;

#[derive(Error, Debug, PartialEq)]
pub enum YearError {
    #[error("No valid release dates found")]
    NoValidYear,
    #[error("Year mismatch: multiple years found: {}", format_years(.years))]
    YearMismatch { years: Vec<i32> },
}

fn format_years(years: &[i32]) -> String {
    years
        .iter()
        .map(i32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Require every dated album to share one release year.
///
/// Returns the year and the albums from that year; undated albums are dropped
/// and row numbers are reassigned so they stay contiguous.
pub fn validate_year(albums: Vec<UnifiedAlbum>) -> Result<(i32, Vec<UnifiedAlbum>), YearError> {
    let years: BTreeSet<i32> = albums.iter().filter_map(|a| a.year).collect();

    let year = match years.len() {
        0 => return Err(YearError::NoValidYear),
        1 => *years.iter().next().ok_or(YearError::NoValidYear)?,
        _ => {
            return Err(YearError::YearMismatch {
                years: years.into_iter().collect(),
            });
        }
    };

    let before = albums.len();
    let mut kept: Vec<UnifiedAlbum> = albums
        .into_iter()
        .filter(|a| a.year == Some(year))
        .collect();
    for (i, album) in kept.iter_mut().enumerate() {
        album.row_number = i + 1;
    }

    if kept.len() < before {
        log::info!("Dropped {} albums without a release date", before - kept.len());
    }
    log::info!("Report year: {year}");
    Ok((year, kept))
}
