use std::collections::{HashMap, HashSet};

use crate::models::{GenreCount, GenreFilter, ReportStats, UnifiedAlbum};

/// Label used when there is nothing to rank.
pub const NOT_AVAILABLE: &str = "N/A";

/// Compute the summary statistics and the genre frequency table for the report year.
pub fn compute_stats(albums: &[UnifiedAlbum], genres: &GenreFilter) -> (ReportStats, Vec<GenreCount>) {
    let genre_counts: Vec<GenreCount> = ranked_counts(pooled_genres(albums, genres))
        .into_iter()
        .map(|(genre, count)| GenreCount { genre, count })
        .collect();

    let country_counts = ranked_counts(albums.iter().filter_map(|a| a.country()));

    let unique_users: HashSet<&str> = albums
        .iter()
        .flat_map(|a| a.submitters.iter().map(String::as_str))
        .collect();

    let avg_points = if albums.is_empty() {
        0.0
    } else {
        let total: f64 = albums.iter().map(|a| a.total_points as f64).sum();
        round1(total / albums.len() as f64)
    };

    let stats = ReportStats {
        total_albums: albums.len(),
        unique_artists: distinct(albums.iter().filter_map(|a| a.artist())),
        countries: country_counts.len(),
        unique_users: unique_users.len(),
        unique_genres: genre_counts.len(),
        top_country: country_counts
            .first()
            .map(|(c, _)| c.clone())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        top_genre: genre_counts
            .first()
            .map(|g| g.genre.clone())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        avg_points,
    };

    log::info!(
        "{} albums, {} artists, {} genres, {} users",
        stats.total_albums,
        stats.unique_artists,
        stats.unique_genres,
        stats.unique_users
    );

    (stats, genre_counts)
}

/// Every valid genre value: all `genre_1` slots in row order, then all `genre_2` slots.
pub fn pooled_genres<'a>(albums: &'a [UnifiedAlbum], genres: &'a GenreFilter) -> impl Iterator<Item = &'a str> + 'a {
    let first = albums.iter().filter_map(|a| a.submission.genre_1.as_deref());
    let second = albums.iter().filter_map(|a| a.submission.genre_2.as_deref());
    first.chain(second).filter(move |g| genres.is_valid(g))
}

/// Count occurrences, most frequent first. Ties keep first-encountered order.
pub fn ranked_counts<S, I>(items: I) -> Vec<(String, usize)>
where
    S: AsRef<str>,
    I: IntoIterator<Item = S>,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();

    for item in items {
        let key = item.as_ref();
        match index.get(key) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(key.to_string(), counts.len());
                counts.push((key.to_string(), 1));
            }
        }
    }

    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

fn distinct<'a>(items: impl Iterator<Item = &'a str>) -> usize {
    items.collect::<HashSet<_>>().len()
}

/// Round to one decimal place.
pub(crate) fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}
