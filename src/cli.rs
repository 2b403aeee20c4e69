// src/cli.rs

use crate::config::ScanConfig;
use crate::model::{LineCountMode, TimePointMode};
use anyhow::Context;
use clap::Parser;
use glob::Pattern;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the project root (a git repository when --history is set)
    pub path: PathBuf,

    /// Replay the git history into a time series instead of a single scan
    #[arg(long)]
    pub history: bool,

    /// How time points are spaced along the series
    #[arg(long, value_enum, default_value_t = TimePointMode::Commit)]
    pub point_mode: TimePointMode,

    /// Number of sample points in generic mode
    #[arg(long, default_value_t = 30)]
    pub points: usize,

    /// Which per-snapshot line count feeds the chart output
    #[arg(long, value_enum, default_value_t = LineCountMode::CodeLines)]
    pub line_mode: LineCountMode,

    /// Exclusion globs, matched against root-relative paths (repeatable)
    #[arg(short, long)]
    pub exclude: Vec<String>,

    /// Include globs; when given, only matching files are counted (repeatable)
    #[arg(long)]
    pub include: Vec<String>,

    /// Skip files larger than this many bytes
    #[arg(long, default_value_t = 10 * 1024 * 1024)]
    pub max_file_size: u64,

    /// Per-file read timeout in milliseconds
    #[arg(long)]
    pub read_timeout_ms: Option<u64>,

    /// Emit the snapshot or series as JSON instead of a table
    #[arg(long)]
    pub json: bool,

    /// Write the time series cache to this file after a replay
    #[arg(long)]
    pub cache: Option<PathBuf>,
}

impl Args {
    /// Build the scan configuration from the defaults plus CLI overrides.
    pub fn to_config(&self) -> anyhow::Result<ScanConfig> {
        let mut config = ScanConfig::default();
        config.max_file_size = self.max_file_size;
        config.read_timeout = self.read_timeout_ms.map(Duration::from_millis);
        config.exclude = parse_globs(&self.exclude)?;
        config.include = parse_globs(&self.include)?;
        Ok(config)
    }
}

fn parse_globs(raw: &[String]) -> anyhow::Result<Vec<Pattern>> {
    raw.iter()
        .map(|g| Pattern::new(g).with_context(|| format!("invalid glob pattern: {g}")))
        .collect()
}
