// src/main.rs

use anyhow::Result;
use chrono::TimeZone;
use clap::Parser;
use codestats::cli::Args;
use codestats::model::{ProjectSnapshot, SkipReason, TimeSeries};
use codestats::repo::StatsRepository;
use codestats::scanner::DirectoryScanner;
use codestats::GitHistory;
use std::sync::Arc;
use std::time::Instant;

fn main() -> Result<()> {
    let args = Args::parse();
    let start_time = Instant::now();

    let config = Arc::new(args.to_config()?);
    let scanner = Arc::new(DirectoryScanner::new(config));
    let repo = StatsRepository::new(args.path.clone(), scanner);
    repo.set_point_mode(args.point_mode);
    repo.set_line_mode(args.line_mode);

    if args.history {
        let source = GitHistory::open(&args.path)?;
        let series = repo.replay_now(&source, args.points)?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&*series)?);
        } else {
            print_series(&series);
        }
        if let Some(cache) = &args.cache {
            repo.save_cache(cache)?;
            println!("Series cache written to {}", cache.display());
        }
    } else {
        let snapshot = repo.scan_now();
        if args.json {
            println!("{}", serde_json::to_string_pretty(&*snapshot)?);
        } else {
            print_snapshot(&snapshot);
        }
    }

    println!("Total time: {:.2?}", start_time.elapsed());
    Ok(())
}

fn print_snapshot(snapshot: &ProjectSnapshot) {
    println!(
        "{:<12} {:>6} {:>9} {:>9} {:>9} {:>9} {:>10} {:>6}",
        "Language", "Files", "Lines", "Code", "Comment", "Blank", "Size kb", "Share"
    );
    for lang in &snapshot.languages {
        println!(
            "{:<12} {:>6} {:>9} {:>9} {:>9} {:>9} {:>10.1} {:>5}%",
            lang.language,
            lang.files,
            lang.total_lines,
            lang.code_lines,
            lang.comment_lines,
            lang.blank_lines,
            lang.size_bytes as f64 / 1024.0,
            lang.line_share_pct,
        );
    }
    println!(
        "{:<12} {:>6} {:>9} {:>9} {:>9} {:>9} {:>10.1}",
        "Total",
        snapshot.total_files,
        snapshot.total_lines,
        snapshot.code_lines,
        snapshot.comment_lines,
        snapshot.blank_lines,
        snapshot.total_size_bytes as f64 / 1024.0,
    );
    print_skip_summary(snapshot);
}

fn print_skip_summary(snapshot: &ProjectSnapshot) {
    if snapshot.skipped.is_empty() {
        return;
    }
    let count_by = |reason: SkipReason| {
        snapshot
            .skipped
            .iter()
            .filter(|s| s.reason == reason)
            .count()
    };
    println!(
        "{} files skipped (excluded {}, encoding {}, too large {}, symlink {}, io error {})",
        snapshot.skipped.len(),
        count_by(SkipReason::Excluded),
        count_by(SkipReason::Encoding),
        count_by(SkipReason::TooLarge),
        count_by(SkipReason::Symlink),
        count_by(SkipReason::IoError),
    );
}

fn print_series(series: &TimeSeries) {
    if let Some((first, last)) = series.span() {
        println!(
            "History spans from {} to {}.",
            chrono::Utc.timestamp_opt(first, 0).unwrap().to_rfc2822(),
            chrono::Utc.timestamp_opt(last, 0).unwrap().to_rfc2822(),
        );
    }
    println!(
        "{} points ({:?} spacing, {:?} scalar), {} gaps",
        series.snapshots.len(),
        series.point_mode,
        series.line_mode,
        series.gaps.len(),
    );
    for (timestamp, value) in series.chart_points() {
        let stamp = chrono::Utc
            .timestamp_opt(timestamp, 0)
            .single()
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| timestamp.to_string());
        println!("{stamp}  {value:>9}");
    }
    for gap in &series.gaps {
        println!("gap at {} ({:?})", gap.revision, gap.reason);
    }
}
