use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Serialize, Serializer};

/// Genre values that mean "not set" when the submitting tool leaves its defaults in place.
pub const DEFAULT_PLACEHOLDER_GENRES: &[&str] = &["Genre 1", "Genre 2"];

/// One user's ranked entry for one album, typed at ingestion time.
/// Values that fail to parse (date, rank, points) are kept as `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlbumSubmission {
    pub album: String,
    pub artist: Option<String>,
    pub country: Option<String>,
    #[serde(serialize_with = "serialize_date")]
    pub release_date: Option<NaiveDate>,
    pub rank: Option<i64>,
    pub points: Option<i64>,
    pub genre_1: Option<String>,
    pub genre_2: Option<String>,
    pub cover_image: Option<String>,
    pub username: String,
}

/// A user who submitted an album, with the rank they gave it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contributor {
    pub username: String,
    pub rank: i64,
}

impl fmt::Display for Contributor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.username, self.rank)
    }
}

/// The deduplicated record for one album across all submissions.
///
/// Descriptive fields come from the first submission encountered; `total_points`,
/// `contributors` and `submitters` cover every submission of the album.
#[derive(Debug, Clone, Serialize)]
pub struct UnifiedAlbum {
    #[serde(flatten)]
    pub submission: AlbumSubmission,
    pub total_points: i64,
    #[serde(serialize_with = "serialize_contributors")]
    pub contributors: Vec<Contributor>,
    /// Every user who submitted the album, including entries without a usable rank.
    #[serde(skip)]
    pub submitters: Vec<String>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub row_number: usize,
}

impl UnifiedAlbum {
    pub fn album(&self) -> &str {
        &self.submission.album
    }

    pub fn artist(&self) -> Option<&str> {
        self.submission.artist.as_deref()
    }

    pub fn country(&self) -> Option<&str> {
        self.submission.country.as_deref()
    }

    /// `"alice (1); bob (4)"`, the format the report table has always shown.
    pub fn contributors_display(&self) -> String {
        join_contributors(&self.contributors)
    }

    /// Number of distinct users who submitted this album.
    pub fn user_count(&self) -> usize {
        let mut seen: HashSet<&str> = HashSet::new();
        self.submitters.iter().filter(|u| seen.insert(u.as_str())).count()
    }
}

/// Filters out unset genre values.
#[derive(Debug, Clone)]
pub struct GenreFilter {
    placeholders: HashSet<String>,
}

impl GenreFilter {
    pub fn new<S: AsRef<str>>(placeholders: &[S]) -> Self {
        Self {
            placeholders: placeholders
                .iter()
                .map(|p| p.as_ref().to_string())
                .collect(),
        }
    }

    /// A genre counts only if it is non-blank and not a placeholder.
    pub fn is_valid(&self, genre: &str) -> bool {
        !genre.trim().is_empty() && !self.placeholders.contains(genre)
    }

    /// Valid genres of an album, `genre_1` first.
    pub fn album_genres<'a>(&self, album: &'a UnifiedAlbum) -> impl Iterator<Item = &'a str> {
        [&album.submission.genre_1, &album.submission.genre_2]
            .into_iter()
            .filter_map(|g| g.as_deref())
            .filter(move |g| self.is_valid(g))
    }
}

impl Default for GenreFilter {
    fn default() -> Self {
        Self::new(DEFAULT_PLACEHOLDER_GENRES)
    }
}

/// Scalar statistics shown in the report header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportStats {
    pub total_albums: usize,
    pub unique_artists: usize,
    pub countries: usize,
    pub unique_users: usize,
    pub unique_genres: usize,
    pub top_country: String,
    pub top_genre: String,
    pub avg_points: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenreCount {
    pub genre: String,
    pub count: usize,
}

/// Taste similarity between two users. `user_a < user_b`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompatibilityPair {
    pub user_a: String,
    pub user_b: String,
    pub combined_score: f64,
    pub genre_similarity: f64,
    pub weighted_similarity: f64,
    pub absence_similarity: f64,
    pub artist_similarity: f64,
    /// Sorted.
    pub shared_avoided_genres: Vec<String>,
    pub shared_artist_count: usize,
}

pub(crate) fn join_contributors(contributors: &[Contributor]) -> String {
    contributors
        .iter()
        .map(Contributor::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn serialize_contributors<S: Serializer>(c: &[Contributor], s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&join_contributors(c))
}

fn serialize_date<S: Serializer>(d: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
    match d {
        Some(date) => s.serialize_str(&date.format("%d-%m-%Y").to_string()),
        None => s.serialize_none(),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Minimal submission for tests; callers fill in what they care about.
    pub fn submission(user: &str, album: &str, artist: &str, rank: i64, points: i64) -> AlbumSubmission {
        AlbumSubmission {
            album: album.to_string(),
            artist: Some(artist.to_string()),
            country: None,
            release_date: NaiveDate::from_ymd_opt(2023, 1, 1),
            rank: Some(rank),
            points: Some(points),
            genre_1: None,
            genre_2: None,
            cover_image: None,
            username: user.to_string(),
        }
    }

    pub fn album(name: &str, artist: &str, genres: &[&str], contributors: &[(&str, i64)]) -> UnifiedAlbum {
        let mut sub = submission(
            contributors.first().map(|c| c.0).unwrap_or("nobody"),
            name,
            artist,
            contributors.first().map(|c| c.1).unwrap_or(1),
            10,
        );
        sub.genre_1 = genres.first().map(|g| g.to_string());
        sub.genre_2 = genres.get(1).map(|g| g.to_string());
        UnifiedAlbum {
            submission: sub,
            total_points: 10 * contributors.len() as i64,
            contributors: contributors
                .iter()
                .map(|(u, r)| Contributor { username: u.to_string(), rank: *r })
                .collect(),
            submitters: contributors.iter().map(|(u, _)| u.to_string()).collect(),
            year: Some(2023),
            month: Some(1),
            row_number: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_contributors_display() {
        let a = album("X", "P", &[], &[("A", 1), ("B", 2)]);
        assert_eq!(a.contributors_display(), "A (1); B (2)");
    }

    #[test]
    fn test_genre_filter_skips_placeholders_and_blanks() {
        let filter = GenreFilter::default();
        assert!(filter.is_valid("Rock"));
        assert!(!filter.is_valid("Genre 1"));
        assert!(!filter.is_valid("Genre 2"));
        assert!(!filter.is_valid("   "));

        let a = album("X", "P", &["Genre 1", "Jazz"], &[("A", 1)]);
        assert_eq!(filter.album_genres(&a).collect::<Vec<_>>(), vec!["Jazz"]);
    }

    #[test]
    fn test_user_count_ignores_repeat_submitter() {
        let mut a = album("X", "P", &[], &[("A", 1), ("B", 2)]);
        a.submitters.push("A".into());
        assert_eq!(a.user_count(), 2);
    }

    #[test]
    fn test_serialized_album_is_flat() {
        let a = album("X", "P", &["Rock"], &[("A", 1), ("B", 2)]);
        let v = serde_json::to_value(&a).unwrap();
        assert_eq!(v["album"], "X");
        assert_eq!(v["release_date"], "01-01-2023");
        assert_eq!(v["contributors"], "A (1); B (2)");
        assert_eq!(v["total_points"], 20);
        assert!(v.get("submitters").is_none());
    }
}
