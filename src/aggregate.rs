// src/aggregate.rs

use crate::model::{FileMetrics, LanguageSummary, ProjectSnapshot, RevisionId, SkippedFile};
use std::collections::BTreeMap;

/// Integer percentage, rounded half away from zero. Zero when the
/// whole is zero so empty snapshots report 0 everywhere.
fn percentage(part: u64, whole: u64) -> u32 {
    if whole == 0 {
        return 0;
    }
    (part as f64 * 100.0 / whole as f64).round() as u32
}

/// Fold per-file metrics into a snapshot.
///
/// Grand totals are recomputed from scratch on every call, never
/// carried over. Summaries are ordered descending by total lines with
/// lexicographic tag tie-breaks, so two scans of the same tree produce
/// identical snapshots.
pub fn aggregate(
    files: Vec<FileMetrics>,
    skipped: Vec<SkippedFile>,
    timestamp: i64,
    revision: Option<RevisionId>,
) -> ProjectSnapshot {
    #[derive(Default)]
    struct Acc {
        files: u64,
        total_lines: u64,
        code_lines: u64,
        comment_lines: u64,
        blank_lines: u64,
        size_bytes: u64,
    }

    // BTreeMap keeps the grouping order stable before the final sort.
    let mut groups: BTreeMap<String, Acc> = BTreeMap::new();
    for metrics in &files {
        let acc = groups.entry(metrics.language.clone()).or_default();
        acc.files += 1;
        acc.total_lines += metrics.total_lines;
        acc.code_lines += metrics.code_lines;
        acc.comment_lines += metrics.comment_lines;
        acc.blank_lines += metrics.blank_lines;
        acc.size_bytes += metrics.size_bytes;
    }

    let grand_total_lines: u64 = groups.values().map(|acc| acc.total_lines).sum();

    let mut languages: Vec<LanguageSummary> = groups
        .into_iter()
        .map(|(language, acc)| LanguageSummary {
            code_pct: percentage(acc.code_lines, acc.total_lines),
            comment_pct: percentage(acc.comment_lines, acc.total_lines),
            blank_pct: percentage(acc.blank_lines, acc.total_lines),
            line_share_pct: percentage(acc.total_lines, grand_total_lines),
            language,
            files: acc.files,
            total_lines: acc.total_lines,
            code_lines: acc.code_lines,
            comment_lines: acc.comment_lines,
            blank_lines: acc.blank_lines,
            size_bytes: acc.size_bytes,
        })
        .collect();

    languages.sort_by(|a, b| {
        b.total_lines
            .cmp(&a.total_lines)
            .then_with(|| a.language.cmp(&b.language))
    });

    ProjectSnapshot {
        timestamp,
        revision,
        total_files: languages.iter().map(|l| l.files).sum(),
        total_lines: grand_total_lines,
        code_lines: languages.iter().map(|l| l.code_lines).sum(),
        comment_lines: languages.iter().map(|l| l.comment_lines).sum(),
        blank_lines: languages.iter().map(|l| l.blank_lines).sum(),
        total_size_bytes: languages.iter().map(|l| l.size_bytes).sum(),
        languages,
        skipped,
    }
}
