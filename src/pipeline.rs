//! End-to-end report generation: merge, unify, year gate, then the three
//! independent analyses off the validated albums.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::charts::ChartData;
use crate::compat::{Compatibility, compute_compatibility};
use crate::config::AppConfig;
use crate::ingest::{IngestError, SubmissionSource, file_label, merge_sources};
use crate::models::{GenreCount, GenreFilter, ReportStats, UnifiedAlbum};
use crate::preprocess::unify;
use crate::report::{ReportError, Template, render_report, write_atomic};
use crate::stats::compute_stats;
use crate::usernames::UsernameMap;
use crate::validate::{YearError, validate_year};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Year(#[from] YearError),
    #[error(transparent)]
    Report(#[from] ReportError),
}

/// Everything the report page is built from.
#[derive(Debug, Clone)]
pub struct Report {
    pub year: i32,
    pub albums: Vec<UnifiedAlbum>,
    pub stats: ReportStats,
    pub genre_counts: Vec<GenreCount>,
    pub compatibility: Compatibility,
    pub charts: ChartData,
}

/// Run every stage up to (not including) rendering.
///
/// Input and validation errors abort before any statistics are computed.
pub fn generate_report(sources: &[SubmissionSource], config: &AppConfig) -> Result<Report, PipelineError> {
    let submissions = merge_sources(sources)?;
    log::info!(
        "Merged {} submissions from {} files",
        submissions.len(),
        sources.len()
    );

    let albums = unify(submissions, config.covers.max_size);
    let (year, albums) = validate_year(albums)?;

    let genres = GenreFilter::new(&config.placeholder_genres);
    let (stats, genre_counts) = compute_stats(&albums, &genres);
    let compatibility = compute_compatibility(&albums, &genres, &config.compatibility);
    let charts = ChartData::build(&albums, &genre_counts, &genres, &config.charts);

    Ok(Report {
        year,
        albums,
        stats,
        genre_counts,
        compatibility,
        charts,
    })
}

/// Render the report with the configured template and write it atomically.
/// Returns the path written.
pub fn write_report(report: &Report, config: &AppConfig) -> Result<PathBuf, PipelineError> {
    let template = Template::resolve(config.template_path.as_deref())?;
    let html = render_report(report, &template)?;
    let path = config.resolve_output_path();
    write_atomic(&path, &html)?;
    Ok(path)
}

/// Pair each file with its username: an explicit override (keyed by file name
/// or by the path as given) first, then the mapping.
pub fn assign_usernames(
    files: &[PathBuf],
    mapping: &UsernameMap,
    overrides: &HashMap<String, String>,
) -> Result<Vec<(PathBuf, String)>, IngestError> {
    files
        .iter()
        .map(|path| -> Result<(PathBuf, String), IngestError> {
            let label = file_label(path);
            let username = overrides
                .get(&label)
                .or_else(|| overrides.get(&path.display().to_string()))
                .map(String::as_str)
                .or_else(|| mapping.resolve(&label))
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .ok_or_else(|| IngestError::MissingUsername {
                    file: label.clone(),
                })?;
            log::debug!("{label} -> {username}");
            Ok((path.clone(), username.to_string()))
        })
        .collect()
}

/// Username the mapping assigns to a file, if any.
pub fn resolve_file<'a>(path: &Path, mapping: &'a UsernameMap) -> Option<&'a str> {
    mapping.resolve(&file_label(path))
}
