// src/model.rs

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Identifies a version-control revision (hex object id).
pub type RevisionId = String;

/// Why a file was left out of aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// Content could not be decoded with any configured charset,
    /// or looked binary.
    Encoding,
    /// File size exceeds the configured ceiling.
    TooLarge,
    /// Symbolic links are never followed.
    Symlink,
    /// Read failure (permissions, I/O error, timeout).
    IoError,
    /// Matched an exclusion rule, missed the include rules, or has
    /// no registered language.
    Excluded,
}

/// One entry in the skip log attached to a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// Why a time point is missing from a replayed series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GapReason {
    MissingRevision,
    CorruptTree,
}

/// One entry in the gap log attached to a time series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayGap {
    pub revision: RevisionId,
    pub reason: GapReason,
}

/// Raw metrics for a single file, immutable once computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetrics {
    /// Path relative to the scanned root.
    pub path: PathBuf,
    pub language: String,
    pub total_lines: u64,
    pub code_lines: u64,
    pub comment_lines: u64,
    pub blank_lines: u64,
    pub size_bytes: u64,
}

/// Aggregated metrics for one language within a snapshot.
///
/// Recomputed wholly on each scan, never mutated field-by-field.
/// `code_pct`/`comment_pct`/`blank_pct` are shares of this language's
/// own total lines; `line_share_pct` is this language's share of the
/// snapshot's grand total. All rounded half away from zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageSummary {
    pub language: String,
    pub files: u64,
    pub total_lines: u64,
    pub code_lines: u64,
    pub comment_lines: u64,
    pub blank_lines: u64,
    pub size_bytes: u64,
    pub code_pct: u32,
    pub comment_pct: u32,
    pub blank_pct: u32,
    pub line_share_pct: u32,
}

/// Aggregated metrics for the whole tree at one point in time.
///
/// Language summaries are ordered descending by total line count,
/// ties broken lexicographically, so presentation defaults are stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    /// Unix timestamp of the scan, or of the commit in a replay.
    pub timestamp: i64,
    /// Commit id when the snapshot came from a history replay.
    pub revision: Option<RevisionId>,
    pub languages: Vec<LanguageSummary>,
    pub total_files: u64,
    pub total_lines: u64,
    pub code_lines: u64,
    pub comment_lines: u64,
    pub blank_lines: u64,
    pub total_size_bytes: u64,
    /// Files excluded from aggregation, with reasons. Always computed.
    pub skipped: Vec<SkippedFile>,
}

impl ProjectSnapshot {
    /// An empty snapshot, used as the repository's initial state.
    pub fn empty() -> Self {
        ProjectSnapshot {
            timestamp: 0,
            revision: None,
            languages: Vec::new(),
            total_files: 0,
            total_lines: 0,
            code_lines: 0,
            comment_lines: 0,
            blank_lines: 0,
            total_size_bytes: 0,
            skipped: Vec::new(),
        }
    }

    /// The scalar a chart reads for this snapshot under the given mode.
    pub fn line_count(&self, mode: LineCountMode) -> u64 {
        match mode {
            LineCountMode::CodeLines => self.code_lines,
            LineCountMode::TotalLines => self.total_lines,
        }
    }
}

/// How time points are spaced along a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum TimePointMode {
    /// One point per version-control revision.
    Commit,
    /// A fixed count of evenly spaced sample revisions.
    Generic,
}

/// Which per-snapshot scalar feeds a chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum LineCountMode {
    CodeLines,
    TotalLines,
}

/// An ordered series of snapshots, oldest first.
///
/// Append-only while a replay runs, replaced whole on re-scan. Every
/// snapshot carries both line-count scalars, so flipping either mode
/// tag is a display-only operation that triggers no new scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub point_mode: TimePointMode,
    pub line_mode: LineCountMode,
    pub snapshots: Vec<ProjectSnapshot>,
    /// Time points that could not be reconstructed. Always computed.
    pub gaps: Vec<ReplayGap>,
}

impl TimeSeries {
    pub fn new(point_mode: TimePointMode, line_mode: LineCountMode) -> Self {
        TimeSeries {
            point_mode,
            line_mode,
            snapshots: Vec::new(),
            gaps: Vec::new(),
        }
    }

    /// (timestamp, value) pairs for the chart, selected by `line_mode`.
    pub fn chart_points(&self) -> Vec<(i64, u64)> {
        self.snapshots
            .iter()
            .map(|s| (s.timestamp, s.line_count(self.line_mode)))
            .collect()
    }

    pub fn span(&self) -> Option<(i64, i64)> {
        let first = self.snapshots.first()?.timestamp;
        let last = self.snapshots.last()?.timestamp;
        Some((first, last))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(code: u64, total: u64) -> ProjectSnapshot {
        ProjectSnapshot {
            code_lines: code,
            total_lines: total,
            ..ProjectSnapshot::empty()
        }
    }

    #[test]
    fn line_count_selects_scalar_by_mode() {
        let snap = snapshot(70, 100);
        assert_eq!(snap.line_count(LineCountMode::CodeLines), 70);
        assert_eq!(snap.line_count(LineCountMode::TotalLines), 100);
    }

    #[test]
    fn chart_points_follow_line_mode_without_touching_snapshots() {
        let mut series = TimeSeries::new(TimePointMode::Commit, LineCountMode::CodeLines);
        series.snapshots.push(ProjectSnapshot {
            timestamp: 10,
            ..snapshot(7, 10)
        });
        series.snapshots.push(ProjectSnapshot {
            timestamp: 20,
            ..snapshot(9, 15)
        });

        assert_eq!(series.chart_points(), vec![(10, 7), (20, 9)]);
        series.line_mode = LineCountMode::TotalLines;
        assert_eq!(series.chart_points(), vec![(10, 10), (20, 15)]);
    }
}
