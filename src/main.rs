use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use sushe_report::compat::Compatibility;
use sushe_report::config::AppConfig;
use sushe_report::ingest::{collect_json_paths, file_label, read_sources};
use sushe_report::pipeline::{Report, assign_usernames, generate_report, resolve_file, write_report};
use sushe_report::usernames::UsernameMap;

#[derive(Parser)]
#[command(name = "sushe-report", version, about = "Yearly album list report generator")]
struct Cli {
    /// Config file (defaults to the XDG config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Username mapping file
    #[arg(long, global = true)]
    mapping: Option<PathBuf>,

    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Submission files plus per-file username overrides.
#[derive(Args)]
struct Inputs {
    /// JSON files or directories containing them
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Username for a file the mapping does not cover (FILE=NAME, repeatable)
    #[arg(short = 'u', long = "user", value_parser = parse_user_override)]
    users: Vec<(String, String)>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the HTML report
    Generate {
        #[command(flatten)]
        inputs: Inputs,

        /// Output file (defaults to album_report.html on the desktop)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Custom HTML template
        #[arg(long)]
        template: Option<PathBuf>,
    },

    /// Show which username each file resolves to
    Resolve {
        /// JSON files or directories containing them
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Print summary statistics and the top genres
    Stats {
        #[command(flatten)]
        inputs: Inputs,
    },

    /// Print the ranked user compatibility table
    Compat {
        #[command(flatten)]
        inputs: Inputs,

        /// Number of pairs to show
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
}

fn parse_user_override(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((file, name)) if !file.trim().is_empty() && !name.trim().is_empty() => {
            Ok((file.trim().to_string(), name.trim().to_string()))
        }
        _ => Err(format!("expected FILE=NAME, got '{raw}'")),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load config file (optional, defaults if missing)
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };
    if cli.mapping.is_some() {
        config.mapping_file = cli.mapping;
    }

    let mapping_path = config.resolve_mapping_file();
    log::info!("Username mapping: {}", mapping_path.display());
    let mapping = UsernameMap::load(&mapping_path);

    match cli.command {
        Commands::Generate {
            inputs,
            output,
            template,
        } => {
            if output.is_some() {
                config.output_path = output;
            }
            if template.is_some() {
                config.template_path = template;
            }

            let report = build_report(&inputs, &mapping, &config)?;
            let output_path = write_report(&report, &config).context("Failed to save report")?;
            println!(
                "Report for {}: {} albums from {} users written to {}",
                report.year,
                report.stats.total_albums,
                report.stats.unique_users,
                output_path.display()
            );
        }

        Commands::Resolve { paths } => {
            let files = collect_json_paths(&paths);
            if files.is_empty() {
                anyhow::bail!("No JSON files found");
            }
            println!("{:<40} {}", "File", "Username");
            println!("{}", "-".repeat(60));
            for file in &files {
                println!(
                    "{:<40} {}",
                    file_label(file),
                    resolve_file(file, &mapping).unwrap_or("<manual entry required>")
                );
            }
        }

        Commands::Stats { inputs } => {
            let report = build_report(&inputs, &mapping, &config)?;
            print_stats(&report);
        }

        Commands::Compat { inputs, limit } => {
            let report = build_report(&inputs, &mapping, &config)?;
            print_compat_table(&report.compatibility, limit);
        }
    }

    Ok(())
}

/// Resolve, read and run the pipeline over the given inputs.
fn build_report(inputs: &Inputs, mapping: &UsernameMap, config: &AppConfig) -> Result<Report> {
    let files = collect_json_paths(&inputs.paths);
    if files.is_empty() {
        anyhow::bail!("No JSON files found in the given paths");
    }
    log::info!("Found {} submission files", files.len());

    let overrides: HashMap<String, String> = inputs.users.iter().cloned().collect();
    let assigned = assign_usernames(&files, mapping, &overrides)
        .context("Pass -u FILE=NAME for files the mapping does not cover")?;
    let sources = read_sources(&assigned).context("Failed to read submissions")?;

    generate_report(&sources, config).context("Report generation failed")
}

fn print_stats(report: &Report) {
    let s = &report.stats;
    println!("Year:            {}", report.year);
    println!("Albums:          {}", s.total_albums);
    println!("Artists:         {}", s.unique_artists);
    println!("Genres:          {}", s.unique_genres);
    println!("Countries:       {}", s.countries);
    println!("Users:           {}", s.unique_users);
    println!("Top country:     {}", s.top_country);
    println!("Top genre:       {}", s.top_genre);
    println!("Average points:  {:.1}", s.avg_points);

    if !report.genre_counts.is_empty() {
        println!();
        println!("{:<30} {:>5}", "Genre", "Count");
        println!("{}", "-".repeat(36));
        for g in report.genre_counts.iter().take(15) {
            println!("{:<30} {:>5}", g.genre, g.count);
        }
    }
}

/// Print the compatibility ranking, best pairs first.
fn print_compat_table(compat: &Compatibility, limit: usize) {
    let pairs = match compat {
        Compatibility::InsufficientData => {
            println!("Not enough genre data available to analyze user compatibility");
            return;
        }
        Compatibility::Ranked(pairs) => pairs,
    };

    println!(
        "{:>3}  {:<30} {:>5}  {:>4} {:>4} {:>4} {:>4}  {}",
        "#", "Pair", "Score", "Gen", "Wgt", "Abs", "Art", "Shared Avoidances"
    );
    println!("{}", "-".repeat(95));

    for (i, p) in pairs.iter().take(limit).enumerate() {
        let pair = format!("{} & {}", p.user_a, p.user_b);
        let pair: String = if pair.chars().count() > 30 {
            format!("{}...", pair.chars().take(27).collect::<String>())
        } else {
            pair
        };

        println!(
            "{:>3}  {:<30} {:>5.2}  {:>4.2} {:>4.2} {:>4.2} {:>4.2}  {}",
            i + 1,
            pair,
            p.combined_score,
            p.genre_similarity,
            p.weighted_similarity,
            p.absence_similarity,
            p.artist_similarity,
            p.avoidance_summary(),
        );
    }

    println!();
    println!("Gen=Genre  Wgt=Rank-Weighted  Abs=Genre Avoidance  Art=Artist Overlap");
    if pairs.len() > limit {
        println!("Showing {} of {} pairs", limit, pairs.len());
    }
}
