use std::path::Path;

use regex::RegexSet;
use serde::Deserialize;

/// One entry of the mapping file: a canonical username and the spellings
/// that show up in people's file names.
#[derive(Debug, Deserialize, Clone)]
pub struct MappingEntry {
    pub standard: String,
    pub variations: Vec<String>,
}

/// Maps file names to canonical usernames by case-insensitive substring match.
///
/// Patterns are kept in mapping-file order; when a file name matches several
/// variations, the one listed first wins.
#[derive(Debug)]
pub struct UsernameMap {
    /// Canonical username for each pattern in `patterns`, by index.
    owners: Vec<String>,
    patterns: RegexSet,
}

impl UsernameMap {
    pub fn new(entries: &[MappingEntry]) -> Self {
        let mut owners = Vec::new();
        let mut sources = Vec::new();

        for entry in entries {
            for variation in &entry.variations {
                if variation.trim().is_empty() {
                    log::debug!("Skipping blank variation for {}", entry.standard);
                    continue;
                }
                sources.push(format!("(?i){}", regex::escape(variation)));
                owners.push(entry.standard.clone());
            }
        }

        match RegexSet::new(&sources) {
            Ok(patterns) => Self { owners, patterns },
            Err(e) => {
                log::warn!("Could not build username patterns: {e}");
                Self::empty()
            }
        }
    }

    pub fn empty() -> Self {
        Self {
            owners: Vec::new(),
            patterns: RegexSet::empty(),
        }
    }

    /// Parse a JSON mapping file body: `[{"standard": ..., "variations": [...]}, ...]`.
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        let entries: Vec<MappingEntry> = serde_json::from_str(content)?;
        Ok(Self::new(&entries))
    }

    /// Load the mapping file. A missing or malformed file yields an empty map,
    /// which means every username has to be given by hand.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                log::warn!(
                    "Mapping file {} not available ({e}); usernames must be entered manually",
                    path.display()
                );
                return Self::empty();
            }
        };

        match Self::from_json(&content) {
            Ok(map) => {
                log::info!(
                    "Loaded {} username variations from {}",
                    map.len(),
                    path.display()
                );
                map
            }
            Err(e) => {
                log::warn!("Failed to parse {}: {e}", path.display());
                Self::empty()
            }
        }
    }

    /// Canonical username whose variation occurs in `filename`, if any.
    pub fn resolve(&self, filename: &str) -> Option<&str> {
        self.patterns
            .matches(filename)
            .into_iter()
            .next()
            .map(|i| self.owners[i].as_str())
    }

    /// Number of variations known.
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}
