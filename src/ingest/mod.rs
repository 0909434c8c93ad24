pub mod record;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use thiserror::Error;
use walkdir::WalkDir;

use crate::models::AlbumSubmission;
use record::RawRecord;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON in {file}: {source}")]
    Json {
        file: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid JSON format in {file}. Expected a list of albums.")]
    NotAList { file: String },
    #[error("Entry {index} in {file} is not an object")]
    NotAnObject { file: String, index: usize },
    #[error("Entry {index} in {file} has no album title")]
    MissingAlbum { file: String, index: usize },
    #[error("Username required for {file}")]
    MissingUsername { file: String },
    #[error("No valid data was loaded from the JSON files")]
    Empty,
}

/// The contents of one submission file and the user it belongs to.
#[derive(Debug, Clone)]
pub struct SubmissionSource {
    /// Display name used in error messages (usually the file name).
    pub name: String,
    pub content: String,
    pub username: String,
}

/// Parse every source and concatenate the records in file order, then in-file order.
///
/// A single malformed file fails the whole batch.
pub fn merge_sources(sources: &[SubmissionSource]) -> Result<Vec<AlbumSubmission>, IngestError> {
    let mut merged = Vec::new();

    for source in sources {
        let username = source.username.trim();
        if username.is_empty() {
            return Err(IngestError::MissingUsername {
                file: source.name.clone(),
            });
        }

        let before = merged.len();
        merged.extend(parse_submissions(&source.name, &source.content, username)?);
        log::info!(
            "Loaded {} albums from {} as {}",
            merged.len() - before,
            source.name,
            username
        );
    }

    if merged.is_empty() {
        return Err(IngestError::Empty);
    }
    Ok(merged)
}

/// Parse one file's content: a JSON array of album objects.
pub fn parse_submissions(
    name: &str,
    content: &str,
    username: &str,
) -> Result<Vec<AlbumSubmission>, IngestError> {
    let value: Value = serde_json::from_str(content).map_err(|source| IngestError::Json {
        file: name.to_string(),
        source,
    })?;

    let Value::Array(items) = value else {
        return Err(IngestError::NotAList {
            file: name.to_string(),
        });
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            if !item.is_object() {
                return Err(IngestError::NotAnObject {
                    file: name.to_string(),
                    index,
                });
            }
            let raw: RawRecord = serde_json::from_value(item).map_err(|source| IngestError::Json {
                file: name.to_string(),
                source,
            })?;
            raw.into_submission(username)
                .ok_or_else(|| IngestError::MissingAlbum {
                    file: name.to_string(),
                    index,
                })
        })
        .collect()
}

/// Expand files and directories into a list of JSON files.
///
/// Directories are walked for `*.json` in sorted order. Each physical file is
/// returned once; repeats are skipped with a warning.
pub fn collect_json_paths<P: AsRef<Path>>(paths: &[P]) -> Vec<PathBuf> {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut files = Vec::new();

    for path in paths {
        let path = path.as_ref();
        let candidates: Vec<PathBuf> = if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file() && is_json(e.path()))
                .map(|e| e.into_path())
                .collect();
            found.sort();
            found
        } else {
            vec![path.to_path_buf()]
        };

        for candidate in candidates {
            let key = candidate.canonicalize().unwrap_or_else(|_| candidate.clone());
            if seen.insert(key) {
                files.push(candidate);
            } else {
                log::warn!("'{}' is already loaded, skipping", file_label(&candidate));
            }
        }
    }

    files
}

/// Read each `(path, username)` pair from disk into a [`SubmissionSource`].
pub fn read_sources(files: &[(PathBuf, String)]) -> Result<Vec<SubmissionSource>, IngestError> {
    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} files {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );

    let mut sources = Vec::with_capacity(files.len());
    for (path, username) in files {
        let name = file_label(path);
        pb.set_message(name.clone());
        let content = std::fs::read_to_string(path).map_err(|source| IngestError::Io {
            path: path.display().to_string(),
            source,
        })?;
        sources.push(SubmissionSource {
            name,
            content,
            username: username.clone(),
        });
        pb.inc(1);
    }

    pb.finish_and_clear();
    Ok(sources)
}

/// File name without directories, for messages and username resolution.
pub fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(name: &str, user: &str, content: &str) -> SubmissionSource {
        SubmissionSource {
            name: name.into(),
            content: content.into(),
            username: user.into(),
        }
    }

    #[test]
    fn test_merge_preserves_file_then_record_order() {
        let sources = vec![
            source("a.json", "A", r#"[{"album": "X"}, {"album": "Y"}]"#),
            source("b.json", "B", r#"[{"album": "Z"}]"#),
        ];
        let merged = merge_sources(&sources).unwrap();
        let order: Vec<(&str, &str)> = merged
            .iter()
            .map(|s| (s.username.as_str(), s.album.as_str()))
            .collect();
        assert_eq!(order, vec![("A", "X"), ("A", "Y"), ("B", "Z")]);
    }

    #[test]
    fn test_one_bad_file_fails_the_batch() {
        let sources = vec![
            source("a.json", "A", r#"[{"album": "X"}]"#),
            source("b.json", "B", r#"[{"album": "Y"}]"#),
            source("broken.json", "C", r#"[{"album": "#),
            source("d.json", "D", r#"[{"album": "Z"}]"#),
        ];
        let err = merge_sources(&sources).unwrap_err();
        assert!(matches!(err, IngestError::Json { ref file, .. } if file == "broken.json"));
    }

    #[test]
    fn test_top_level_object_is_rejected() {
        let sources = vec![source("obj.json", "A", r#"{"album": "X"}"#)];
        let err = merge_sources(&sources).unwrap_err();
        assert!(matches!(err, IngestError::NotAList { .. }));
        assert!(err.to_string().contains("obj.json"));
    }

    #[test]
    fn test_non_object_entry_is_rejected() {
        let err = parse_submissions("a.json", r#"[{"album": "X"}, 3]"#, "A").unwrap_err();
        assert!(matches!(err, IngestError::NotAnObject { index: 1, .. }));
    }

    #[test]
    fn test_empty_dataset_is_an_error() {
        let sources = vec![source("a.json", "A", "[]"), source("b.json", "B", "[]")];
        assert!(matches!(merge_sources(&sources), Err(IngestError::Empty)));
    }

    #[test]
    fn test_blank_username_is_rejected() {
        let sources = vec![source("a.json", "  ", r#"[{"album": "X"}]"#)];
        assert!(matches!(
            merge_sources(&sources),
            Err(IngestError::MissingUsername { .. })
        ));
    }

    #[test]
    fn test_collect_json_paths_walks_dirs_and_skips_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.json"), "[]").unwrap();
        std::fs::write(dir.path().join("a.JSON"), "[]").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();

        let direct = dir.path().join("b.json");
        let paths = collect_json_paths(&[dir.path().to_path_buf(), direct]);
        let names: Vec<String> = paths.iter().map(|p| file_label(p)).collect();
        assert_eq!(names, vec!["a.JSON", "b.json"]);
    }

    #[test]
    fn test_read_sources() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alice_list.json");
        std::fs::write(&path, r#"[{"album": "X"}]"#).unwrap();

        let sources = read_sources(&[(path, "alice".into())]).unwrap();
        assert_eq!(sources[0].name, "alice_list.json");
        assert_eq!(sources[0].username, "alice");

        let missing = read_sources(&[(dir.path().join("nope.json"), "bob".into())]);
        assert!(matches!(missing, Err(IngestError::Io { .. })));
    }
}
