// src/lib.rs

//! codestats - per-language code statistics with a history time series.
//!
//! The engine walks a file tree, classifies each file into blank /
//! comment / code line counts, aggregates per-language summaries with
//! percentage columns, and can replay a git history to build a time
//! series of snapshots. Results live in a [`repo::StatsRepository`]
//! that presentation layers read through atomic reference swaps.

pub mod aggregate;
pub mod classify;
pub mod cli;
pub mod config;
pub mod history;
pub mod model;
pub mod repo;
pub mod scanner;

pub use aggregate::aggregate;
pub use classify::{classify, Charset};
pub use config::{LanguageSpec, ScanConfig};
pub use history::{replay, GitHistory, RevisionSource, RevisionTree};
pub use model::{
    FileMetrics, GapReason, LanguageSummary, LineCountMode, ProjectSnapshot, ReplayGap,
    RevisionId, SkipReason, SkippedFile, TimePointMode, TimeSeries,
};
pub use repo::StatsRepository;
pub use scanner::{DirectoryScanner, ScanOutcome};
