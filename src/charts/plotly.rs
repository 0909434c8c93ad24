//! Plotly fragments for the report.
//!
//! Each fragment is a `<div>` plus a `<script>` that hands a JSON figure to
//! `Plotly.newPlot`. The page template loads plotly.js once.

use std::collections::BTreeMap;

use serde_json::{Value, json};

use super::ChartData;
use crate::report::html::{escape, message};

const ACCENT: &str = "#1DB954";
const MUTED: &str = "#b3b3b3";
const CLEAR: &str = "rgba(30, 30, 30, 0)";

/// Render every chart fragment, keyed by the template placeholder it fills.
pub fn render_charts(data: &ChartData) -> BTreeMap<&'static str, String> {
    let mut charts = BTreeMap::new();
    charts.insert("treemap_graph", genre_treemap(data));
    charts.insert("genre_graph", genre_bars(data));
    charts.insert("map_graph", country_map(data));
    charts.insert("user_counts_graph", user_album_bars(data));
    charts.insert("release_timeline_graph", release_timeline(data));
    charts.insert("user_agreement_graph", consensus_bars(data));
    charts.insert("country_genre_graph", country_genre_heatmap(data));
    charts.insert("user_genre_diversity_graph", diversity_bars(data));
    charts
}

fn genre_treemap(data: &ChartData) -> String {
    let labels: Vec<&str> = data.genres.iter().map(|g| g.genre.as_str()).collect();
    let values: Vec<usize> = data.genres.iter().map(|g| g.count).collect();
    figure(
        "treemap_graph",
        json!([{
            "type": "treemap",
            "labels": labels,
            "parents": vec![""; labels.len()],
            "values": values,
            "hovertemplate": "<b>%{label}</b><br>Count: %{value}<extra></extra>",
        }]),
        json!({ "margin": { "t": 0, "l": 0, "r": 0, "b": 0 }, "height": 500 }),
    )
}

fn genre_bars(data: &ChartData) -> String {
    let genres: Vec<&str> = data.genres.iter().map(|g| g.genre.as_str()).collect();
    let counts: Vec<usize> = data.genres.iter().map(|g| g.count).collect();
    figure(
        "genre_graph",
        json!([bar(&genres, &counts, "Sunset")]),
        json!({
            "margin": { "t": 0, "l": 0, "r": 0, "b": 0 },
            "height": 500,
            "showlegend": false,
            "xaxis": axis("Genre"),
            "yaxis": axis("Count"),
        }),
    )
}

fn country_map(data: &ChartData) -> String {
    let countries: Vec<&str> = data.countries.iter().map(|c| c.country.as_str()).collect();
    let albums: Vec<usize> = data.countries.iter().map(|c| c.albums).collect();
    let points: Vec<[i64; 1]> = data.countries.iter().map(|c| [c.total_points]).collect();
    figure(
        "map_graph",
        json!([{
            "type": "choropleth",
            "locations": countries,
            "locationmode": "country names",
            "z": albums,
            "customdata": points,
            "colorscale": "Viridis",
            "hovertemplate": "<b>%{location}</b><br>Albums: %{z}<br>Points: %{customdata[0]}<extra></extra>",
            "marker": { "line": { "width": 0.8, "color": "white" } },
            "colorbar": { "title": { "text": "Number of Albums", "font": { "color": MUTED } }, "tickfont": { "color": MUTED } },
        }]),
        titled(
            "Geographic Distribution of Albums",
            json!({
                "margin": { "t": 50, "l": 0, "r": 0, "b": 0 },
                "geo": {
                    "showframe": false,
                    "showcoastlines": true,
                    "coastlinecolor": "LightGrey",
                    "projection": { "type": "natural earth", "scale": 0.95 },
                    "bgcolor": CLEAR,
                },
            }),
        ),
    )
}

fn user_album_bars(data: &ChartData) -> String {
    let users: Vec<&str> = data.user_albums.iter().map(|u| u.username.as_str()).collect();
    let counts: Vec<usize> = data.user_albums.iter().map(|u| u.count).collect();
    figure(
        "user_counts_graph",
        json!([bar(&users, &counts, "Portland")]),
        json!({
            "margin": { "t": 0, "l": 0, "r": 0, "b": 0 },
            "height": 500,
            "showlegend": false,
            "xaxis": axis("User"),
            "yaxis": axis("Album Count"),
        }),
    )
}

fn release_timeline(data: &ChartData) -> String {
    let months: Vec<&str> = data.months.iter().map(|m| m.name.as_str()).collect();
    let counts: Vec<usize> = data.months.iter().map(|m| m.count).collect();
    figure(
        "release_timeline_graph",
        json!([bar(&months, &counts, "Viridis")]),
        titled(
            "Album Releases by Month",
            json!({
                "margin": { "t": 50, "l": 50, "r": 50, "b": 50 },
                "xaxis": axis("Month"),
                "yaxis": axis("Number of Albums"),
            }),
        ),
    )
}

fn consensus_bars(data: &ChartData) -> String {
    if data.consensus.is_empty() {
        return message("No albums selected by multiple users");
    }

    let names: Vec<&str> = data.consensus.iter().map(|c| c.display_name.as_str()).collect();
    let counts: Vec<usize> = data.consensus.iter().map(|c| c.user_count).collect();
    let max = counts.iter().copied().max().unwrap_or(0) as f64;
    figure(
        "user_agreement_graph",
        json!([{
            "type": "bar",
            "orientation": "h",
            "y": names,
            "x": counts,
            "text": counts,
            "textposition": "outside",
            "textfont": { "color": MUTED },
            "marker": { "color": counts, "colorscale": "Viridis", "showscale": false },
        }]),
        titled(
            "Most Agreed Upon Albums",
            json!({
                "margin": { "t": 50, "l": 200, "r": 50, "b": 50 },
                "xaxis": { "title": { "text": "Number of Users" }, "range": [0.0, max + 0.5], "tickfont": { "color": MUTED } },
                "yaxis": { "autorange": "reversed", "tickfont": { "color": MUTED } },
            }),
        ),
    )
}

fn country_genre_heatmap(data: &ChartData) -> String {
    let pivot = &data.country_genre;
    let height = 450_usize.max(100 + pivot.countries.len() * 40);
    figure(
        "country_genre_graph",
        json!([{
            "type": "heatmap",
            "x": pivot.genres,
            "y": pivot.countries,
            "z": pivot.counts,
            "colorscale": "Viridis",
            "xgap": 2,
            "ygap": 2,
            "colorbar": { "thickness": 20, "len": 0.8, "title": { "text": "Album Count", "font": { "color": MUTED } }, "tickfont": { "color": MUTED } },
            "hovertemplate": "%{y} / %{x}: %{z}<extra></extra>",
        }]),
        titled(
            "Genre Distribution by Country",
            json!({
                "height": height,
                "margin": { "t": 50, "l": 120, "r": 50, "b": 100 },
                "xaxis": { "tickangle": 45, "automargin": true, "fixedrange": true },
                "yaxis": { "automargin": true, "fixedrange": true, "autorange": "reversed" },
            }),
        ),
    )
}

fn diversity_bars(data: &ChartData) -> String {
    let users: Vec<&str> = data.genre_diversity.iter().map(|u| u.username.as_str()).collect();
    let counts: Vec<usize> = data.genre_diversity.iter().map(|u| u.count).collect();
    figure(
        "user_genre_diversity_graph",
        json!([bar(&users, &counts, "Viridis")]),
        titled(
            "Genre Diversity by User",
            json!({
                "margin": { "t": 50, "l": 50, "r": 50, "b": 50 },
                "xaxis": axis("User"),
                "yaxis": axis("Number of Unique Genres"),
            }),
        ),
    )
}

/// Vertical bar trace colored by value.
fn bar(x: &[&str], y: &[usize], colorscale: &str) -> Value {
    json!({
        "type": "bar",
        "x": x,
        "y": y,
        "marker": { "color": y, "colorscale": colorscale },
    })
}

fn axis(title: &str) -> Value {
    json!({
        "title": { "text": title, "font": { "color": MUTED } },
        "tickfont": { "color": MUTED },
    })
}

fn titled(title: &str, mut layout: Value) -> Value {
    layout["title"] = json!({
        "text": title,
        "y": 0.98,
        "x": 0.5,
        "xanchor": "center",
        "yanchor": "top",
        "font": { "color": ACCENT, "size": 18 },
    });
    layout
}

/// Wrap traces and layout into a self-contained fragment with the dark theme applied.
fn figure(id: &str, traces: Value, mut layout: Value) -> String {
    layout["paper_bgcolor"] = json!(CLEAR);
    layout["plot_bgcolor"] = json!(CLEAR);
    layout["font"] = json!({ "color": MUTED });

    let fig = json!({
        "data": traces,
        "layout": layout,
        "config": { "displayModeBar": false, "responsive": true },
    });

    format!(
        "<div id=\"{id}\" class=\"plotly-graph-div\"></div>\n\
         <script>(function() {{ var fig = {}; Plotly.newPlot(\"{id}\", fig.data, fig.layout, fig.config); }})();</script>",
        script_safe(&fig),
        id = escape(id),
    )
}

/// JSON that can sit inside a `<script>` element.
fn script_safe(value: &Value) -> String {
    value.to_string().replace("</", "<\\/")
}
