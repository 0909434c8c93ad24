use std::collections::HashMap;

use chrono::Datelike;
use rayon::prelude::*;

use crate::cover::shrink_cover;
use crate::models::{AlbumSubmission, Contributor, UnifiedAlbum};

/// Per-album accumulator, in first-seen order.
struct AlbumGroup {
    representative: AlbumSubmission,
    total_points: i64,
    contributors: Vec<Contributor>,
    submitters: Vec<String>,
}

/// Collapse submissions into one row per album.
///
/// Covers are thumbnailed, points summed across every submission (missing
/// points count as 0), and the first submission of each album supplies the
/// descriptive fields. Rows are ordered by `total_points` descending with ties
/// kept in input order, then numbered from 1.
pub fn unify(mut submissions: Vec<AlbumSubmission>, cover_max_size: u32) -> Vec<UnifiedAlbum> {
    submissions.par_iter_mut().for_each(|sub| {
        if let Some(cover) = sub.cover_image.as_mut() {
            *cover = shrink_cover(cover, cover_max_size);
        }
    });

    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<AlbumGroup> = Vec::new();

    for sub in submissions {
        let slot = match index.get(&sub.album) {
            Some(&i) => i,
            None => {
                index.insert(sub.album.clone(), groups.len());
                groups.push(AlbumGroup {
                    representative: sub.clone(),
                    total_points: 0,
                    contributors: Vec::new(),
                    submitters: Vec::new(),
                });
                groups.len() - 1
            }
        };

        let group = &mut groups[slot];
        group.total_points = group.total_points.saturating_add(sub.points.unwrap_or(0));
        if let Some(rank) = sub.rank {
            group.contributors.push(Contributor {
                username: sub.username.clone(),
                rank,
            });
        }
        group.submitters.push(sub.username);
    }

    // sort_by is stable: equal totals keep first-seen order
    groups.sort_by(|a, b| b.total_points.cmp(&a.total_points));

    let albums: Vec<UnifiedAlbum> = groups
        .into_iter()
        .enumerate()
        .map(|(i, g)| {
            let date = g.representative.release_date;
            UnifiedAlbum {
                submission: g.representative,
                total_points: g.total_points,
                contributors: g.contributors,
                submitters: g.submitters,
                year: date.map(|d| d.year()),
                month: date.map(|d| d.month()),
                row_number: i + 1,
            }
        })
        .collect();

    log::info!("{} distinct albums after merging duplicates", albums.len());
    albums
}
