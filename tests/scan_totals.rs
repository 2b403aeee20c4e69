use std::fs;
use std::path::Path;
use std::sync::Arc;

use codestats::aggregate::aggregate;
use codestats::config::ScanConfig;
use codestats::model::SkipReason;
use codestats::scanner::DirectoryScanner;
use tempfile::TempDir;

fn write_file(path: &Path, contents: &str) {
    fs::write(path, contents).expect("failed to write test file");
}

fn scanner() -> DirectoryScanner {
    DirectoryScanner::new(Arc::new(ScanConfig::default()))
}

const A_PY: &str = "# header\n\nx = 1\ny = 2\nz = 3\ndef f():\n    return x\n\na = f()\nb = a + 1\n";
const B_GO: &str = "package main\nfunc main() {\n\t_ = 1\n\t_ = 2\n}\n";

#[test]
fn two_language_tree_matches_expected_totals() {
    let dir = TempDir::new().unwrap();
    write_file(&dir.path().join("a.py"), A_PY);
    write_file(&dir.path().join("b.go"), B_GO);

    let scanner = scanner();
    let outcome = scanner.scan(dir.path(), None);
    let snapshot = aggregate(outcome.files, outcome.skipped, 0, None);

    assert_eq!(snapshot.total_lines, 15);
    assert_eq!(snapshot.total_files, 2);

    // Descending by total lines: python (10) before go (5).
    assert_eq!(snapshot.languages[0].language, "python");
    assert_eq!(snapshot.languages[0].total_lines, 10);
    assert_eq!(snapshot.languages[0].code_lines, 7);
    assert_eq!(snapshot.languages[0].comment_lines, 1);
    assert_eq!(snapshot.languages[0].blank_lines, 2);
    assert_eq!(snapshot.languages[0].line_share_pct, 67);

    assert_eq!(snapshot.languages[1].language, "go");
    assert_eq!(snapshot.languages[1].total_lines, 5);
    assert_eq!(snapshot.languages[1].code_lines, 5);
    assert_eq!(snapshot.languages[1].line_share_pct, 33);

    // Shares cover the whole project within rounding tolerance.
    let share_sum: u32 = snapshot.languages.iter().map(|l| l.line_share_pct).sum();
    assert!((99..=101).contains(&share_sum));
}

#[test]
fn language_sums_equal_grand_totals() {
    let dir = TempDir::new().unwrap();
    write_file(&dir.path().join("a.py"), A_PY);
    write_file(&dir.path().join("b.go"), B_GO);
    write_file(&dir.path().join("c.rs"), "// only a comment\n");

    let scanner = scanner();
    let outcome = scanner.scan(dir.path(), None);
    let snapshot = aggregate(outcome.files, outcome.skipped, 0, None);

    let lines: u64 = snapshot.languages.iter().map(|l| l.total_lines).sum();
    let files: u64 = snapshot.languages.iter().map(|l| l.files).sum();
    assert_eq!(lines, snapshot.total_lines);
    assert_eq!(files, snapshot.total_files);
}

#[test]
fn rescanning_an_unchanged_tree_is_deterministic() {
    let dir = TempDir::new().unwrap();
    write_file(&dir.path().join("a.py"), A_PY);
    write_file(&dir.path().join("b.go"), B_GO);
    fs::create_dir(dir.path().join("nested")).unwrap();
    write_file(&dir.path().join("nested/c.rs"), "fn c() {}\n");

    let scanner = scanner();
    let first = scanner.scan(dir.path(), None);
    let second = scanner.scan(dir.path(), None);

    let snap_a = aggregate(first.files, first.skipped, 7, None);
    let snap_b = aggregate(second.files, second.skipped, 7, None);
    assert_eq!(snap_a, snap_b);
}

#[test]
fn binary_and_oversized_files_never_contribute() {
    let dir = TempDir::new().unwrap();
    write_file(&dir.path().join("good.rs"), "fn main() {}\n");
    fs::write(dir.path().join("blob.rs"), b"\x00\x01\x02\x03").unwrap();
    write_file(&dir.path().join("huge.rs"), &"x\n".repeat(100));

    let mut config = ScanConfig::default();
    config.max_file_size = 50;
    let scanner = DirectoryScanner::new(Arc::new(config));
    let outcome = scanner.scan(dir.path(), None);
    let snapshot = aggregate(outcome.files, outcome.skipped, 0, None);

    assert_eq!(snapshot.total_files, 1);
    assert_eq!(snapshot.languages.len(), 1);
    assert_eq!(snapshot.languages[0].files, 1);
    assert!(snapshot
        .skipped
        .iter()
        .any(|s| s.reason == SkipReason::Encoding));
    assert!(snapshot
        .skipped
        .iter()
        .any(|s| s.reason == SkipReason::TooLarge));
}

#[test]
fn empty_tree_reports_zero_percentages() {
    let dir = TempDir::new().unwrap();
    let scanner = scanner();
    let outcome = scanner.scan(dir.path(), None);
    let snapshot = aggregate(outcome.files, outcome.skipped, 0, None);
    assert_eq!(snapshot.total_files, 0);
    assert!(snapshot.languages.is_empty());
}
