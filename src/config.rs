use std::path::{Path, PathBuf};

use directories::{ProjectDirs, UserDirs};
use serde::Deserialize;

use crate::models::DEFAULT_PLACEHOLDER_GENRES;

/// File name of the generated report.
pub const REPORT_FILE_NAME: &str = "album_report.html";

/// Application configuration loaded from TOML config file.
/// Every field has a default, so the config file is optional.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Username mapping file (overrides the config-dir default).
    pub mapping_file: Option<PathBuf>,
    /// Where the report is written (overrides the desktop default).
    pub output_path: Option<PathBuf>,
    /// Custom HTML template; the built-in template is used when unset.
    pub template_path: Option<PathBuf>,
    /// Genre values that mean "not set".
    pub placeholder_genres: Vec<String>,
    pub covers: CoverConfig,
    pub charts: ChartConfig,
    pub compatibility: CompatibilityConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mapping_file: None,
            output_path: None,
            template_path: None,
            placeholder_genres: DEFAULT_PLACEHOLDER_GENRES
                .iter()
                .map(|g| g.to_string())
                .collect(),
            covers: CoverConfig::default(),
            charts: ChartConfig::default(),
            compatibility: CompatibilityConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CoverConfig {
    /// Covers are shrunk to fit a square of this many pixels.
    pub max_size: u32,
}

impl Default for CoverConfig {
    fn default() -> Self {
        Self { max_size: 100 }
    }
}

/// Size limits for the chart tables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// Albums shown in the consensus chart.
    pub consensus_limit: usize,
    /// Longer "artist - album" labels are cut and end in "...".
    pub label_max_chars: usize,
    pub max_countries: usize,
    pub max_genres: usize,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            consensus_limit: 10,
            label_max_chars: 40,
            max_countries: 10,
            max_genres: 15,
        }
    }
}

/// Blend weights for the four similarity components.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub genre: f64,
    pub weighted: f64,
    pub absence: f64,
    pub artist: f64,
}

/// Compatibility scoring parameters. The defaults are empirical; they are
/// exposed here for tuning, not derived from anything.
///
/// Any key left out of the file, including a single weight inside
/// `primary` or `artist_led`, keeps its default.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "CompatibilityFile")]
pub struct CompatibilityConfig {
    /// Below this avoidance similarity, a pair with shared artists uses `artist_led`.
    pub absence_threshold: f64,
    pub primary: ScoreWeights,
    pub artist_led: ScoreWeights,
}

impl Default for CompatibilityConfig {
    fn default() -> Self {
        Self {
            absence_threshold: 0.1,
            primary: ScoreWeights {
                genre: 0.25,
                weighted: 0.35,
                absence: 0.20,
                artist: 0.20,
            },
            artist_led: ScoreWeights {
                genre: 0.30,
                weighted: 0.40,
                absence: 0.05,
                artist: 0.25,
            },
        }
    }
}

/// `[compatibility]` as written in the file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CompatibilityFile {
    absence_threshold: Option<f64>,
    primary: WeightsFile,
    artist_led: WeightsFile,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WeightsFile {
    genre: Option<f64>,
    weighted: Option<f64>,
    absence: Option<f64>,
    artist: Option<f64>,
}

impl WeightsFile {
    fn over(self, base: ScoreWeights) -> ScoreWeights {
        ScoreWeights {
            genre: self.genre.unwrap_or(base.genre),
            weighted: self.weighted.unwrap_or(base.weighted),
            absence: self.absence.unwrap_or(base.absence),
            artist: self.artist.unwrap_or(base.artist),
        }
    }
}

impl From<CompatibilityFile> for CompatibilityConfig {
    fn from(file: CompatibilityFile) -> Self {
        let defaults = CompatibilityConfig::default();
        Self {
            absence_threshold: file.absence_threshold.unwrap_or(defaults.absence_threshold),
            primary: file.primary.over(defaults.primary),
            artist_led: file.artist_led.over(defaults.artist_led),
        }
    }
}

impl AppConfig {
    /// Load config from `~/.config/sushe-report/config.toml`.
    /// Returns default config if file doesn't exist.
    /// Logs a warning if the file exists but can't be parsed.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => {
                log::debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Load a specific config file, falling back to defaults on any error.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<AppConfig>(&contents) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    log::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                Self::default()
            }
        }
    }

    /// Resolve the mapping file: config value, else `<config dir>/username_mappings.json`.
    pub fn resolve_mapping_file(&self) -> PathBuf {
        self.mapping_file.clone().unwrap_or_else(|| {
            ProjectDirs::from("", "", crate::APP_NAME)
                .map(|dirs| dirs.config_dir().join("username_mappings.json"))
                .unwrap_or_else(|| PathBuf::from("username_mappings.json"))
        })
    }

    /// Resolve the report path: config value, else the default output location.
    pub fn resolve_output_path(&self) -> PathBuf {
        self.output_path.clone().unwrap_or_else(default_output_path)
    }

    /// Get the config file path.
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME).map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

/// Desktop if there is one, else the home directory, else the current directory.
pub fn default_output_path() -> PathBuf {
    match UserDirs::new() {
        Some(dirs) => dirs
            .desktop_dir()
            .unwrap_or_else(|| dirs.home_dir())
            .join(REPORT_FILE_NAME),
        None => PathBuf::from(REPORT_FILE_NAME),
    }
}
