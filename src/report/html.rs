//! Hand-built HTML pieces: escaping, the album table and the compatibility table.

use std::fmt::Write;

use crate::compat::Compatibility;
use crate::models::UnifiedAlbum;

/// Escape text for use in HTML element content and quoted attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// A centred notice shown in place of a chart.
pub fn message(text: &str) -> String {
    format!("<div class=\"text-center text-light p-5\">{}</div>", escape(text))
}

/// One `<tr>` per album, in ranking order.
pub fn album_rows(albums: &[UnifiedAlbum]) -> String {
    let mut html = String::new();
    for album in albums {
        let cover = match album.submission.cover_image.as_deref() {
            Some(data) if !data.is_empty() => format!(
                "<img src=\"data:image/png;base64,{}\" alt=\"cover\" class=\"album-cover\" loading=\"lazy\">",
                escape(data)
            ),
            _ => String::new(),
        };
        let release = album
            .submission
            .release_date
            .map(|d| d.format("%d-%m-%Y").to_string())
            .unwrap_or_default();

        let _ = write!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            album.row_number,
            cover,
            escape(album.album()),
            escape(album.artist().unwrap_or_default()),
            escape(album.country().unwrap_or_default()),
            escape(&genre_cell(album)),
            release,
            album.total_points,
            escape(&album.contributors_display()),
        );
    }
    html
}

fn genre_cell(album: &UnifiedAlbum) -> String {
    [&album.submission.genre_1, &album.submission.genre_2]
        .into_iter()
        .filter_map(|g| g.as_deref())
        .filter(|g| !g.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" / ")
}

/// The ranked compatibility table, or a notice when there is nothing to compare.
pub fn compatibility_table(compat: &Compatibility) -> String {
    let pairs = match compat {
        Compatibility::InsufficientData => {
            return message("Not enough genre data available to analyze user compatibility");
        }
        Compatibility::Ranked(pairs) => pairs,
    };

    let mut html = String::from(
        "<div class=\"section-frame mt-4 mb-4\">\n\
         <div class=\"table-responsive\">\n\
         <table class=\"table table-dark table-striped table-bordered\">\n\
         <thead><tr>\
         <th scope=\"col\">#</th>\
         <th scope=\"col\">User Pair</th>\
         <th scope=\"col\">Compatibility</th>\
         <th scope=\"col\">Similarity Breakdown</th>\
         <th scope=\"col\">Shared Avoidances</th>\
         <th scope=\"col\">Shared Artists</th>\
         </tr></thead>\n<tbody>\n",
    );

    for (i, pair) in pairs.iter().enumerate() {
        let _ = write!(
            html,
            "<tr><td>{}</td><td><strong>{} &amp; {}</strong></td><td><strong>{:.2}</strong></td><td>\
             <div><strong>Standard Genre:</strong> {:.2}</div>\
             <div><strong>Rank-Weighted:</strong> {:.2}</div>\
             <div><strong>Genre Avoidance:</strong> {:.2}</div>\
             <div><strong>Artist Overlap:</strong> {:.2}</div>\
             </td><td>{}</td><td>{}</td></tr>\n",
            i + 1,
            escape(&pair.user_a),
            escape(&pair.user_b),
            pair.combined_score,
            pair.genre_similarity,
            pair.weighted_similarity,
            pair.absence_similarity,
            pair.artist_similarity,
            escape(&pair.avoidance_summary()),
            pair.shared_artist_count,
        );
    }

    html.push_str("</tbody>\n</table>\n</div>\n</div>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CompatibilityPair;
    use crate::models::fixtures::album;

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"<a href="x">R&B's</a>"#), "&lt;a href=&quot;x&quot;&gt;R&amp;B&#39;s&lt;/a&gt;");
        assert_eq!(escape("Sigur Rós"), "Sigur Rós");
    }

    #[test]
    fn test_album_rows_escape_and_cover() {
        let mut a = album("<Untitled>", "P&Q", &["Rock", "Genre 2"], &[("A", 1), ("B", 3)]);
        a.submission.cover_image = Some("iVBORw0KGgo=".into());
        let html = album_rows(&[a]);
        assert!(html.contains("&lt;Untitled&gt;"));
        assert!(html.contains("P&amp;Q"));
        assert!(html.contains("data:image/png;base64,iVBORw0KGgo="));
        assert!(html.contains("A (1); B (3)"));
        assert!(html.contains("01-01-2023"));
        assert_eq!(html.matches("<tr>").count(), 1);
    }

    #[test]
    fn test_album_row_without_cover() {
        let html = album_rows(&[album("X", "P", &[], &[("A", 1)])]);
        assert!(!html.contains("<img"));
    }

    #[test]
    fn test_compatibility_table_insufficient() {
        let html = compatibility_table(&Compatibility::InsufficientData);
        assert!(html.contains("Not enough genre data available to analyze user compatibility"));
        assert!(!html.contains("<table"));
    }

    #[test]
    fn test_compatibility_table_rows() {
        let pair = CompatibilityPair {
            user_a: "A".into(),
            user_b: "<B>".into(),
            combined_score: 0.8765,
            genre_similarity: 1.0,
            weighted_similarity: 0.5,
            absence_similarity: 0.0,
            artist_similarity: 0.25,
            shared_avoided_genres: vec!["Folk".into()],
            shared_artist_count: 2,
        };
        let html = compatibility_table(&Compatibility::Ranked(vec![pair]));
        assert!(html.contains("<td>1</td>"));
        assert!(html.contains("A &amp; &lt;B&gt;"));
        assert!(html.contains("<strong>0.88</strong>"));
        assert!(html.contains("Folk [Total: 1]"));
        assert!(html.contains("<td>2</td></tr>"));
    }
}
