//! Aggregated tables behind each report chart.
//!
//! Every function here is a pure group-and-count over the year's albums;
//! [`plotly`] turns the tables into HTML fragments.

pub mod plotly;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::Month;
use crate::config::ChartConfig;
use crate::models::{GenreCount, GenreFilter, UnifiedAlbum};
use crate::stats::ranked_counts;

#[derive(Debug, Clone, PartialEq)]
pub struct CountryAggregate {
    pub country: String,
    pub albums: usize,
    pub total_points: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthCount {
    pub month: u32,
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConsensusPick {
    pub display_name: String,
    pub user_count: usize,
}

/// Country × genre album counts, both axes ordered by total, most frequent first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CountryGenrePivot {
    pub countries: Vec<String>,
    pub genres: Vec<String>,
    /// `counts[country][genre]`
    pub counts: Vec<Vec<usize>>,
}

/// A per-user number: distinct genres, or albums submitted.
#[derive(Debug, Clone, PartialEq)]
pub struct UserCount {
    pub username: String,
    pub count: usize,
}

/// All chart tables for one report.
#[derive(Debug, Clone)]
pub struct ChartData {
    pub genres: Vec<GenreCount>,
    pub countries: Vec<CountryAggregate>,
    pub months: Vec<MonthCount>,
    pub consensus: Vec<ConsensusPick>,
    pub country_genre: CountryGenrePivot,
    pub genre_diversity: Vec<UserCount>,
    pub user_albums: Vec<UserCount>,
}

impl ChartData {
    pub fn build(
        albums: &[UnifiedAlbum],
        genre_counts: &[GenreCount],
        genres: &GenreFilter,
        config: &ChartConfig,
    ) -> Self {
        Self {
            genres: genre_counts.to_vec(),
            countries: country_aggregates(albums),
            months: monthly_releases(albums),
            consensus: consensus_picks(albums, config.consensus_limit, config.label_max_chars),
            country_genre: country_genre_pivot(albums, genres, config.max_countries, config.max_genres),
            genre_diversity: genre_diversity(albums, genres),
            user_albums: albums_per_user(albums),
        }
    }
}

/// Album count and summed points per country, most albums first.
pub fn country_aggregates(albums: &[UnifiedAlbum]) -> Vec<CountryAggregate> {
    let mut points: HashMap<&str, i64> = HashMap::new();
    for album in albums {
        if let Some(country) = album.country() {
            let sum = points.entry(country).or_insert(0);
            *sum = sum.saturating_add(album.total_points);
        }
    }

    ranked_counts(albums.iter().filter_map(|a| a.country()))
        .into_iter()
        .map(|(country, count)| CountryAggregate {
            total_points: points.get(country.as_str()).copied().unwrap_or(0),
            country,
            albums: count,
        })
        .collect()
}

/// Releases per calendar month, in month order. Months without releases are omitted.
pub fn monthly_releases(albums: &[UnifiedAlbum]) -> Vec<MonthCount> {
    let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
    for month in albums.iter().filter_map(|a| a.month) {
        *counts.entry(month).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .map(|(month, count)| MonthCount {
            month,
            name: month_name(month),
            count,
        })
        .collect()
}

fn month_name(month: u32) -> String {
    u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .map(|m| m.name().to_string())
        .unwrap_or_else(|| month.to_string())
}

/// Albums picked by more than one user, most users first, capped at `limit`.
pub fn consensus_picks(albums: &[UnifiedAlbum], limit: usize, label_max: usize) -> Vec<ConsensusPick> {
    let mut picks: Vec<ConsensusPick> = albums
        .iter()
        .filter(|a| a.contributors.len() > 1)
        .map(|a| {
            let label = match a.artist() {
                Some(artist) => format!("{} - {}", artist, a.album()),
                None => a.album().to_string(),
            };
            ConsensusPick {
                display_name: truncate_label(&label, label_max),
                user_count: a.contributors.len(),
            }
        })
        .collect();

    picks.sort_by(|a, b| b.user_count.cmp(&a.user_count));
    picks.truncate(limit);
    picks
}

/// Cut a label to at most `max` characters, ending in "..." when shortened.
pub fn truncate_label(label: &str, max: usize) -> String {
    if label.chars().count() <= max {
        return label.to_string();
    }
    let keep = max.saturating_sub(3);
    format!("{}...", label.chars().take(keep).collect::<String>())
}

/// Country × genre counts limited to the busiest countries and genres.
pub fn country_genre_pivot(
    albums: &[UnifiedAlbum],
    genres: &GenreFilter,
    max_countries: usize,
    max_genres: usize,
) -> CountryGenrePivot {
    let mut cells: HashMap<(&str, &str), usize> = HashMap::new();
    let mut by_country: Vec<&str> = Vec::new();
    let mut by_genre: Vec<&str> = Vec::new();

    for album in albums {
        let Some(country) = album.country() else {
            continue;
        };
        for genre in genres.album_genres(album) {
            *cells.entry((country, genre)).or_insert(0) += 1;
            by_country.push(country);
            by_genre.push(genre);
        }
    }

    let countries: Vec<String> = ranked_counts(by_country)
        .into_iter()
        .take(max_countries)
        .map(|(c, _)| c)
        .collect();
    let genre_axis: Vec<String> = ranked_counts(by_genre)
        .into_iter()
        .take(max_genres)
        .map(|(g, _)| g)
        .collect();

    let counts = countries
        .iter()
        .map(|c| {
            genre_axis
                .iter()
                .map(|g| cells.get(&(c.as_str(), g.as_str())).copied().unwrap_or(0))
                .collect()
        })
        .collect();

    CountryGenrePivot {
        countries,
        genres: genre_axis,
        counts,
    }
}

/// Distinct genres across the albums each user submitted, most diverse first.
pub fn genre_diversity(albums: &[UnifiedAlbum], genres: &GenreFilter) -> Vec<UserCount> {
    let mut per_user: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for album in albums {
        for user in &album.submitters {
            let seen = per_user.entry(user.as_str()).or_default();
            seen.extend(genres.album_genres(album));
        }
    }

    sorted_user_counts(per_user.into_iter().map(|(u, g)| (u, g.len())))
}

/// Number of distinct albums each user submitted, most first.
pub fn albums_per_user(albums: &[UnifiedAlbum]) -> Vec<UserCount> {
    let mut per_user: BTreeMap<&str, usize> = BTreeMap::new();
    for album in albums {
        let users: BTreeSet<&str> = album.submitters.iter().map(String::as_str).collect();
        for user in users {
            *per_user.entry(user).or_insert(0) += 1;
        }
    }

    sorted_user_counts(per_user)
}

/// Sort descending by count; names are already in order from the BTreeMap so ties stay alphabetical.
fn sorted_user_counts<'a>(counts: impl IntoIterator<Item = (&'a str, usize)>) -> Vec<UserCount> {
    let mut rows: Vec<UserCount> = counts
        .into_iter()
        .map(|(u, count)| UserCount {
            username: u.to_string(),
            count,
        })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count));
    rows
}
