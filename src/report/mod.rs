pub mod html;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use thiserror::Error;

use crate::charts::plotly::render_charts;
use crate::pipeline::Report;

const BUILTIN_TEMPLATE: &str = include_str!("template.html");

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").unwrap());

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to read template {path}: {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to serialize album data: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Failed to write report to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// An HTML page with `{{ name }}` placeholders.
#[derive(Debug, Clone)]
pub struct Template {
    source: String,
}

impl Template {
    /// The page compiled into the binary.
    pub fn builtin() -> Self {
        Self {
            source: BUILTIN_TEMPLATE.to_string(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, ReportError> {
        let source = std::fs::read_to_string(path).map_err(|source| ReportError::Template {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Using template {}", path.display());
        Ok(Self { source })
    }

    /// `template_path` if set, else the built-in page.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ReportError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::builtin()),
        }
    }

    pub fn from_source(source: impl Into<String>) -> Self {
        Self { source: source.into() }
    }

    /// Replace every placeholder with its value. Values are inserted verbatim;
    /// names with no value become empty.
    pub fn render(&self, vars: &BTreeMap<&str, String>) -> String {
        PLACEHOLDER_RE
            .replace_all(&self.source, |caps: &Captures| {
                let name = &caps[1];
                match vars.get(name) {
                    Some(value) => value.clone(),
                    None => {
                        log::warn!("Template placeholder '{name}' has no value");
                        String::new()
                    }
                }
            })
            .into_owned()
    }
}

/// Every value the report page can reference.
pub fn template_vars(report: &Report) -> Result<BTreeMap<&'static str, String>, ReportError> {
    let stats = &report.stats;
    let mut vars = render_charts(&report.charts);
    vars.insert(
        "musical_compatibility_graph",
        html::compatibility_table(&report.compatibility),
    );

    vars.insert("current_year", report.year.to_string());
    vars.insert("total_albums", stats.total_albums.to_string());
    vars.insert("unique_artists", stats.unique_artists.to_string());
    vars.insert("unique_genres", stats.unique_genres.to_string());
    vars.insert("countries", stats.countries.to_string());
    vars.insert("unique_users", stats.unique_users.to_string());
    vars.insert("top_country", html::escape(&stats.top_country));
    vars.insert("avg_points", format!("{:.1}", stats.avg_points));
    vars.insert("top_genre", html::escape(&stats.top_genre));
    vars.insert("album_rows", html::album_rows(&report.albums));
    vars.insert(
        "albums_json",
        serde_json::to_string(&report.albums)?.replace("</", "<\\/"),
    );

    Ok(vars)
}

/// Render the full page for a report.
pub fn render_report(report: &Report, template: &Template) -> Result<String, ReportError> {
    Ok(template.render(&template_vars(report)?))
}

/// Write `content` next to `path` as `<path>.tmp`, then rename it over `path`.
/// On failure the previous report (if any) is left untouched.
pub fn write_atomic(path: &Path, content: &str) -> Result<(), ReportError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ReportError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }

    let result = std::fs::write(&tmp, content).and_then(|()| std::fs::rename(&tmp, path));
    if let Err(source) = result {
        let _ = std::fs::remove_file(&tmp);
        return Err(ReportError::Write {
            path: path.to_path_buf(),
            source,
        });
    }

    log::info!("Report written to {}", path.display());
    Ok(())
}
