//! Pairwise music-taste compatibility between users.
//!
//! Each user gets a profile built from the albums they ranked: genre share
//! percentages (plain and rank-weighted), the common genres they never picked,
//! and the artists they picked. Pairs are scored on four components and
//! blended into one score in [0, 1].

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::config::{CompatibilityConfig, ScoreWeights};
use crate::models::{CompatibilityPair, GenreFilter, UnifiedAlbum};
use crate::stats::round1;

/// Outcome of the compatibility analysis.
#[derive(Debug, Clone, PartialEq)]
pub enum Compatibility {
    /// No user tagged any valid genre; there is nothing to compare.
    InsufficientData,
    /// Pairs sorted by `combined_score` descending, then `(user_a, user_b)`.
    Ranked(Vec<CompatibilityPair>),
}

impl Compatibility {
    pub fn pairs(&self) -> &[CompatibilityPair] {
        match self {
            Compatibility::InsufficientData => &[],
            Compatibility::Ranked(pairs) => pairs,
        }
    }
}

/// One `(user, genre, rank)` observation.
struct GenreTag<'a> {
    user: &'a str,
    genre: &'a str,
    rank: i64,
}

#[derive(Default)]
struct GenreTally {
    count: usize,
    weighted: f64,
}

/// Everything the pair scoring needs about one user.
struct TasteProfile<'a> {
    /// Percent share per genre, aligned to the shared genre axis.
    raw: Vec<f64>,
    /// Same, with each tag weighted by how high it was ranked.
    weighted: Vec<f64>,
    avoided: BTreeSet<&'a str>,
    artists: BTreeSet<&'a str>,
}

/// Score every pair of users who tagged at least one genre.
pub fn compute_compatibility(
    albums: &[UnifiedAlbum],
    genres: &GenreFilter,
    config: &CompatibilityConfig,
) -> Compatibility {
    // Expand to per-user observations
    let mut tags: Vec<GenreTag> = Vec::new();
    let mut user_artists: HashMap<&str, BTreeSet<&str>> = HashMap::new();

    for album in albums {
        let album_genres: Vec<&str> = genres.album_genres(album).collect();
        for c in &album.contributors {
            for &genre in &album_genres {
                tags.push(GenreTag {
                    user: &c.username,
                    genre,
                    rank: c.rank,
                });
            }
            if let Some(artist) = album.artist() {
                user_artists.entry(&c.username).or_default().insert(artist);
            }
        }
    }

    if tags.is_empty() {
        log::info!("Not enough genre data to compare users");
        return Compatibility::InsufficientData;
    }

    // Rank 1 weighs 1.0; the deepest rank anyone used weighs 1/max_rank.
    let max_rank = tags.iter().map(|t| t.rank).max().unwrap_or(1).max(1) as f64;

    let mut tallies: BTreeMap<&str, BTreeMap<&str, GenreTally>> = BTreeMap::new();
    for tag in &tags {
        let tally = tallies.entry(tag.user).or_default().entry(tag.genre).or_default();
        tally.count += 1;
        tally.weighted += rank_weight(tag.rank, max_rank);
    }

    let axis: Vec<&str> = tags
        .iter()
        .map(|t| t.genre)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let valid = common_genres(albums, genres);
    log::debug!(
        "Genres users could avoid ({}): {}",
        valid.len(),
        valid.iter().copied().collect::<Vec<_>>().join(", ")
    );

    let profiles: BTreeMap<&str, TasteProfile> = tallies
        .iter()
        .map(|(&user, per_genre)| {
            let profile = build_profile(per_genre, &axis, &valid, user_artists.remove(user));
            log::debug!(
                "User {user} avoids {}/{} genres",
                profile.avoided.len(),
                valid.len()
            );
            (user, profile)
        })
        .collect();

    let users: Vec<&str> = profiles.keys().copied().collect();
    let mut pairs = Vec::new();
    for (i, &a) in users.iter().enumerate() {
        for &b in &users[i + 1..] {
            pairs.push(score_pair(a, &profiles[a], b, &profiles[b], config));
        }
    }

    pairs.sort_by(|x, y| {
        y.combined_score
            .total_cmp(&x.combined_score)
            .then_with(|| x.user_a.cmp(&y.user_a))
            .then_with(|| x.user_b.cmp(&y.user_b))
    });

    log::info!("Scored {} user pairs across {} users", pairs.len(), users.len());
    Compatibility::Ranked(pairs)
}

/// Rank 1 weighs 1.0, each deeper rank a step of `1/max_rank` less.
fn rank_weight(rank: i64, max_rank: f64) -> f64 {
    (max_rank - rank as f64 + 1.0) / max_rank
}

/// Valid genres found on at least two distinct albums. Genres seen once say
/// nothing about what anyone avoids.
fn common_genres<'a>(albums: &'a [UnifiedAlbum], genres: &GenreFilter) -> BTreeSet<&'a str> {
    let mut album_counts: HashMap<&str, usize> = HashMap::new();
    for album in albums {
        let distinct: BTreeSet<&str> = genres.album_genres(album).collect();
        for genre in distinct {
            *album_counts.entry(genre).or_insert(0) += 1;
        }
    }
    album_counts
        .into_iter()
        .filter(|&(_, n)| n >= 2)
        .map(|(g, _)| g)
        .collect()
}

fn build_profile<'a>(
    per_genre: &BTreeMap<&'a str, GenreTally>,
    axis: &[&'a str],
    valid: &BTreeSet<&'a str>,
    artists: Option<BTreeSet<&'a str>>,
) -> TasteProfile<'a> {
    let total: usize = per_genre.values().map(|t| t.count).sum();
    let weighted_total: f64 = per_genre.values().map(|t| t.weighted).sum();

    let (raw, weighted): (Vec<f64>, Vec<f64>) = axis
        .iter()
        .map(|g| match per_genre.get(g) {
            Some(t) => (
                percentage(t.count as f64, total as f64),
                percentage(t.weighted, weighted_total),
            ),
            None => (0.0, 0.0),
        })
        .unzip();

    let avoided = valid
        .iter()
        .filter(|g| !per_genre.contains_key(*g))
        .copied()
        .collect();

    TasteProfile {
        raw,
        weighted,
        avoided,
        artists: artists.unwrap_or_default(),
    }
}

fn percentage(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        round1(part / whole * 100.0)
    } else {
        0.0
    }
}

fn score_pair(
    user_a: &str,
    a: &TasteProfile,
    user_b: &str,
    b: &TasteProfile,
    config: &CompatibilityConfig,
) -> CompatibilityPair {
    let genre_similarity = cosine_similarity(&a.raw, &b.raw);
    let weighted_similarity = cosine_similarity(&a.weighted, &b.weighted);

    // Users who avoid nothing share no avoidance signal.
    let absence_similarity = if a.avoided.is_empty() || b.avoided.is_empty() {
        0.0
    } else {
        jaccard(&a.avoided, &b.avoided)
    };
    let artist_similarity = jaccard(&a.artists, &b.artists);

    let weights: &ScoreWeights =
        if absence_similarity < config.absence_threshold && artist_similarity > 0.0 {
            &config.artist_led
        } else {
            &config.primary
        };
    let combined_score = weights.genre * genre_similarity
        + weights.weighted * weighted_similarity
        + weights.absence * absence_similarity
        + weights.artist * artist_similarity;

    let shared_avoided_genres: Vec<String> = a
        .avoided
        .intersection(&b.avoided)
        .map(|g| g.to_string())
        .collect();

    log::debug!(
        "{user_a} & {user_b}: avoidance {absence_similarity:.2} ({} shared), artists {artist_similarity:.2}",
        shared_avoided_genres.len()
    );

    CompatibilityPair {
        user_a: user_a.to_string(),
        user_b: user_b.to_string(),
        combined_score,
        genre_similarity,
        weighted_similarity,
        absence_similarity,
        artist_similarity,
        shared_avoided_genres,
        shared_artist_count: a.artists.intersection(&b.artists).count(),
    }
}

/// Cosine similarity between two vectors; 0 when either has no magnitude.
fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;

    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        0.0
    } else {
        (dot / denom).clamp(0.0, 1.0)
    }
}

/// |A ∩ B| / |A ∪ B|; 0 when both sets are empty.
fn jaccard(a: &BTreeSet<&str>, b: &BTreeSet<&str>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

impl CompatibilityPair {
    /// Short text for the shared avoidances column, e.g.
    /// `"Folk, Metal (+ 3 more) [Total: 5]"`.
    ///
    /// With more than two genres, which two are shown rotates with the pair's
    /// names so different pairs surface different genres, but the same pair
    /// always shows the same ones.
    pub fn avoidance_summary(&self) -> String {
        let shared = &self.shared_avoided_genres;
        let head = match shared.len() {
            0 => return "None".to_string(),
            1 => shared[0].clone(),
            2 => format!("{}, {}", shared[0], shared[1]),
            n => {
                let start = self.name_seed() % n;
                format!(
                    "{}, {} (+ {} more)",
                    shared[start],
                    shared[(start + 1) % n],
                    n - 2
                )
            }
        };
        format!("{head} [Total: {}]", shared.len())
    }

    fn name_seed(&self) -> usize {
        self.user_a
            .bytes()
            .chain(self.user_b.bytes())
            .map(usize::from)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::album;

    fn ranked(result: Compatibility) -> Vec<CompatibilityPair> {
        match result {
            Compatibility::Ranked(p) => p,
            Compatibility::InsufficientData => panic!("expected ranked pairs"),
        }
    }

    fn run(albums: &[UnifiedAlbum]) -> Compatibility {
        compute_compatibility(albums, &GenreFilter::default(), &CompatibilityConfig::default())
    }

    #[test]
    fn test_cosine_identical() {
        let a = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_cosine_orthogonal_and_zero() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-10);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_jaccard() {
        let a: BTreeSet<&str> = ["x", "y"].into_iter().collect();
        let b: BTreeSet<&str> = ["y", "z"].into_iter().collect();
        let empty = BTreeSet::new();
        assert!((jaccard(&a, &b) - 1.0 / 3.0).abs() < 1e-10);
        assert_eq!(jaccard(&a, &a), 1.0);
        assert_eq!(jaccard(&a, &empty), 0.0);
        assert_eq!(jaccard(&empty, &empty), 0.0);
    }

    #[test]
    fn test_no_genres_is_insufficient_data() {
        let albums = vec![
            album("X", "P", &[], &[("A", 1), ("B", 2)]),
            album("Y", "Q", &["Genre 1", "Genre 2"], &[("A", 2)]),
        ];
        assert_eq!(run(&albums), Compatibility::InsufficientData);
    }

    #[test]
    fn test_same_proportions_give_full_genre_similarity() {
        let albums = vec![
            album("X1", "P", &["Rock"], &[("A", 1)]),
            album("X2", "P", &["Jazz"], &[("A", 2)]),
            album("Y1", "Q", &["Rock"], &[("B", 1)]),
            album("Y2", "Q", &["Rock"], &[("B", 2)]),
            album("Y3", "R", &["Jazz"], &[("B", 3)]),
            album("Y4", "R", &["Jazz"], &[("B", 4)]),
        ];
        let pairs = ranked(run(&albums));
        assert_eq!(pairs.len(), 1);
        assert!((pairs[0].genre_similarity - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_shared_album_scenario() {
        // A and B both ranked X (Rock); A also has Y (Jazz), B also has Z (Rock)
        let albums = vec![
            album("X", "P", &["Rock"], &[("A", 1), ("B", 2)]),
            album("Y", "Q", &["Jazz"], &[("A", 2)]),
            album("Z", "R", &["Rock"], &[("B", 1)]),
            album("W", "S", &["Jazz"], &[("C", 1)]),
        ];
        let pairs = ranked(run(&albums));
        assert_eq!(pairs.len(), 3);

        let ab = pairs.iter().find(|p| p.user_a == "A" && p.user_b == "B").unwrap();
        assert_eq!(ab.shared_artist_count, 1);
        // Artists {P, Q} vs {P, R}
        assert!((ab.artist_similarity - 1.0 / 3.0).abs() < 1e-9);
        // Common genres: Rock (X, Z) and Jazz (Y, W). B avoids Jazz, A avoids nothing.
        assert_eq!(ab.absence_similarity, 0.0);
        assert!(ab.shared_avoided_genres.is_empty());

        let bc = pairs.iter().find(|p| p.user_a == "B" && p.user_b == "C").unwrap();
        // B: only Rock, C: only Jazz
        assert_eq!(bc.genre_similarity, 0.0);
        assert_eq!(bc.weighted_similarity, 0.0);
        assert_eq!(bc.artist_similarity, 0.0);
        // B avoids {Jazz}, C avoids {Rock}
        assert_eq!(bc.absence_similarity, 0.0);
        assert_eq!(bc.combined_score, 0.0);
    }

    #[test]
    fn test_artist_led_weights_apply_with_low_avoidance_and_shared_artists() {
        let albums = vec![
            album("X", "P", &["Rock"], &[("A", 1), ("B", 1)]),
            album("Y", "Q", &["Rock"], &[("A", 2), ("B", 2)]),
        ];
        let pairs = ranked(run(&albums));
        let p = &pairs[0];
        // Identical taste, nothing avoided (Rock is the only common genre and both use it)
        assert!((p.genre_similarity - 1.0).abs() < 1e-9);
        assert!((p.weighted_similarity - 1.0).abs() < 1e-9);
        assert_eq!(p.absence_similarity, 0.0);
        assert_eq!(p.artist_similarity, 1.0);
        assert!((p.combined_score - 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_primary_weights_when_avoidance_is_shared() {
        let albums = vec![
            album("X", "P", &["Rock"], &[("A", 1), ("B", 1)]),
            album("Y", "Q", &["Rock"], &[("A", 2)]),
            album("Z1", "R", &["Folk"], &[("C", 1)]),
            album("Z2", "S", &["Folk"], &[("C", 2)]),
        ];
        let pairs = ranked(run(&albums));
        let ab = pairs.iter().find(|p| p.user_a == "A" && p.user_b == "B").unwrap();
        // Both avoid exactly {Folk}
        assert_eq!(ab.absence_similarity, 1.0);
        assert_eq!(ab.shared_avoided_genres, vec!["Folk"]);
        // Artists {P, Q} vs {P}
        assert!((ab.artist_similarity - 0.5).abs() < 1e-9);
        let expected = 0.25 * ab.genre_similarity
            + 0.35 * ab.weighted_similarity
            + 0.20 * 1.0
            + 0.20 * 0.5;
        assert!((ab.combined_score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_rank_weighting_changes_weighted_vector_only() {
        // Both users tag Rock once and Jazz once, but rank them in opposite order.
        let albums = vec![
            album("R1", "P", &["Rock"], &[("A", 1)]),
            album("J1", "Q", &["Jazz"], &[("A", 4)]),
            album("R2", "S", &["Rock"], &[("B", 4)]),
            album("J2", "T", &["Jazz"], &[("B", 1)]),
        ];
        let p = &ranked(run(&albums))[0];
        assert!((p.genre_similarity - 1.0).abs() < 1e-9);
        assert!(p.weighted_similarity < 0.9);
        assert!(p.weighted_similarity > 0.0);
    }

    #[test]
    fn test_rank_weight_steps_down_linearly() {
        assert!((rank_weight(1, 3.0) - 1.0).abs() < 1e-12);
        assert!((rank_weight(2, 3.0) - 2.0 / 3.0).abs() < 1e-12);
        assert!((rank_weight(3, 3.0) - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_weighted_vector_uses_linear_rank_weights() {
        // max rank 3. A: Rock@1 (1.0), Jazz@3 (1/3) -> Jazz 25%, Rock 75%.
        // B: Rock@2 (2/3), Jazz@3 (1/3) -> Jazz 33.3%, Rock 66.7%.
        let albums = vec![
            album("R1", "P", &["Rock"], &[("A", 1)]),
            album("J1", "Q", &["Jazz"], &[("A", 3)]),
            album("R2", "S", &["Rock"], &[("B", 2)]),
            album("J2", "T", &["Jazz"], &[("B", 3)]),
        ];
        let p = &ranked(run(&albums))[0];
        assert!((p.genre_similarity - 1.0).abs() < 1e-9);

        let expected = cosine_similarity(&[25.0, 75.0], &[33.3, 66.7]);
        assert!((p.weighted_similarity - expected).abs() < 1e-12);
        // 1/rank weighting would give B Jazz 40%, Rock 60%
        let reciprocal = cosine_similarity(&[25.0, 75.0], &[40.0, 60.0]);
        assert!((p.weighted_similarity - reciprocal).abs() > 1e-3);
    }

    #[test]
    fn test_singleton_genres_are_not_avoidable() {
        let albums = vec![
            album("X", "P", &["Rock"], &[("A", 1)]),
            album("Y", "Q", &["Rock"], &[("B", 1)]),
            album("Z", "R", &["Polka"], &[("A", 2)]),
        ];
        let valid = common_genres(&albums, &GenreFilter::default());
        assert_eq!(valid.into_iter().collect::<Vec<_>>(), vec!["Rock"]);
    }

    #[test]
    fn test_genre_repeated_in_both_slots_counts_one_album() {
        let albums = vec![album("X", "P", &["Rock", "Rock"], &[("A", 1)])];
        assert!(common_genres(&albums, &GenreFilter::default()).is_empty());
    }

    #[test]
    fn test_user_without_genres_is_excluded() {
        let albums = vec![
            album("X", "P", &["Rock"], &[("A", 1)]),
            album("Y", "Q", &["Rock"], &[("B", 1)]),
            album("Z", "R", &[], &[("C", 1)]),
        ];
        let pairs = ranked(run(&albums));
        assert_eq!(pairs.len(), 1);
        assert!(pairs.iter().all(|p| p.user_a != "C" && p.user_b != "C"));
    }

    #[test]
    fn test_scores_are_bounded_and_sorted() {
        let albums = vec![
            album("A1", "P", &["Rock", "Pop"], &[("ann", 1), ("bob", 3)]),
            album("A2", "Q", &["Jazz"], &[("ann", 2), ("cat", 1)]),
            album("A3", "R", &["Pop", "Folk"], &[("bob", 1), ("dan", 2)]),
            album("A4", "P", &["Folk"], &[("cat", 2), ("dan", 1)]),
            album("A5", "S", &["Jazz", "Rock"], &[("dan", 3), ("ann", 3)]),
            album("A6", "T", &["Metal"], &[("bob", 2)]),
        ];
        let pairs = ranked(run(&albums));
        assert_eq!(pairs.len(), 6);

        for p in &pairs {
            assert!(p.user_a < p.user_b);
            for s in [
                p.combined_score,
                p.genre_similarity,
                p.weighted_similarity,
                p.absence_similarity,
                p.artist_similarity,
            ] {
                assert!((0.0..=1.0).contains(&s), "{s} out of range for {p:?}");
            }
        }
        for w in pairs.windows(2) {
            assert!(w[0].combined_score >= w[1].combined_score);
        }

        // Same input, same ranking
        assert_eq!(pairs, ranked(run(&albums)));
    }

    #[test]
    fn test_ties_break_by_user_names() {
        let albums = vec![
            album("X", "P", &["Rock"], &[("c", 1)]),
            album("Y", "Q", &["Rock"], &[("b", 1)]),
            album("Z", "R", &["Rock"], &[("a", 1)]),
        ];
        let pairs = ranked(run(&albums));
        let order: Vec<(&str, &str)> = pairs
            .iter()
            .map(|p| (p.user_a.as_str(), p.user_b.as_str()))
            .collect();
        assert_eq!(order, vec![("a", "b"), ("a", "c"), ("b", "c")]);
    }

    fn pair_with_avoided(a: &str, b: &str, avoided: &[&str]) -> CompatibilityPair {
        CompatibilityPair {
            user_a: a.into(),
            user_b: b.into(),
            combined_score: 0.0,
            genre_similarity: 0.0,
            weighted_similarity: 0.0,
            absence_similarity: 0.0,
            artist_similarity: 0.0,
            shared_avoided_genres: avoided.iter().map(|s| s.to_string()).collect(),
            shared_artist_count: 0,
        }
    }

    #[test]
    fn test_avoidance_summary_formats() {
        assert_eq!(pair_with_avoided("a", "b", &[]).avoidance_summary(), "None");
        assert_eq!(
            pair_with_avoided("a", "b", &["Folk"]).avoidance_summary(),
            "Folk [Total: 1]"
        );
        assert_eq!(
            pair_with_avoided("a", "b", &["Folk", "Metal"]).avoidance_summary(),
            "Folk, Metal [Total: 2]"
        );
    }

    #[test]
    fn test_avoidance_summary_rotation_is_stable() {
        // "a" + "b" = 97 + 98 = 195; 195 % 4 = 3 → starts at "Rap", wraps to "Folk"
        let p = pair_with_avoided("a", "b", &["Folk", "Metal", "Pop", "Rap"]);
        assert_eq!(p.avoidance_summary(), "Rap, Folk (+ 2 more) [Total: 4]");
        assert_eq!(p.avoidance_summary(), p.clone().avoidance_summary());
    }
}
