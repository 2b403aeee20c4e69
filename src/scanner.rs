// src/scanner.rs

use crate::classify;
use crate::config::ScanConfig;
use crate::model::{FileMetrics, SkipReason, SkippedFile};
use rayon::prelude::*;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use walkdir::WalkDir;

/// Everything one scan pass produced: successes plus the skip log.
/// A single bad file degrades completeness, never the rest of the pass.
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub files: Vec<FileMetrics>,
    pub skipped: Vec<SkippedFile>,
    /// Set when the pass was cancelled before finishing; the partial
    /// result must not be published.
    pub cancelled: bool,
}

/// What the walk decided about one directory entry, before any file
/// content is read.
enum EntryRule {
    /// A readable candidate: absolute path plus root-relative path.
    Candidate(PathBuf, PathBuf),
    Skip(SkippedFile),
    /// Directories and other non-file entries.
    Ignore,
}

/// Walks a file tree and classifies each file against the config.
///
/// Per-file classification is independent, so `scan` runs it on the
/// rayon pool; the walk and the fold stay sequential to keep output
/// order deterministic (lexicographic by path).
pub struct DirectoryScanner {
    config: Arc<ScanConfig>,
    scans_started: AtomicUsize,
}

impl DirectoryScanner {
    pub fn new(config: Arc<ScanConfig>) -> Self {
        DirectoryScanner {
            config,
            scans_started: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// How many scan passes have been started. Lets callers verify
    /// that display-only operations trigger no rescans.
    pub fn scans_started(&self) -> usize {
        self.scans_started.load(Ordering::Relaxed)
    }

    /// Lazy, restartable per-file generator over the tree, depth-first
    /// in lexicographic path order. Each call starts a fresh pass.
    pub fn iter_files<'a>(
        &'a self,
        root: &'a Path,
    ) -> impl Iterator<Item = Result<FileMetrics, SkippedFile>> + 'a {
        self.scans_started.fetch_add(1, Ordering::Relaxed);
        self.walk(root).filter_map(move |rule| match rule {
            EntryRule::Candidate(abs, rel) => Some(self.read_and_classify(&abs, rel)),
            EntryRule::Skip(skip) => Some(Err(skip)),
            EntryRule::Ignore => None,
        })
    }

    /// Scan a filesystem tree rooted at `root`, classifying candidate
    /// files in parallel.
    ///
    /// The cancellation token is checked between files, not mid-file.
    pub fn scan(&self, root: &Path, cancel: Option<&AtomicBool>) -> ScanOutcome {
        self.scans_started.fetch_add(1, Ordering::Relaxed);

        let mut skipped = Vec::new();
        let mut candidates: Vec<(PathBuf, PathBuf)> = Vec::new();
        for rule in self.walk(root) {
            match rule {
                EntryRule::Candidate(abs, rel) => candidates.push((abs, rel)),
                EntryRule::Skip(skip) => skipped.push(skip),
                EntryRule::Ignore => {}
            }
        }

        // Order of the retained results matches the candidate order.
        let results: Vec<Result<FileMetrics, SkippedFile>> = candidates
            .par_iter()
            .filter_map(|(abs, rel)| {
                if cancel.is_some_and(|token| token.load(Ordering::Relaxed)) {
                    return None;
                }
                Some(self.read_and_classify(abs, rel.clone()))
            })
            .collect();

        let cancelled = cancel.is_some_and(|token| token.load(Ordering::Relaxed));
        fold(results, skipped, cancelled)
    }

    /// Scan an in-memory tree, as reconstructed from a VCS revision.
    /// Entries are sorted by path first so results are deterministic
    /// regardless of the source's ordering.
    pub fn scan_tree(&self, entries: &[(PathBuf, Vec<u8>)]) -> ScanOutcome {
        self.scans_started.fetch_add(1, Ordering::Relaxed);

        let mut sorted: Vec<&(PathBuf, Vec<u8>)> = entries.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));

        let mut skipped = Vec::new();
        let mut candidates = Vec::new();
        for (path, bytes) in sorted {
            if let Some(reason) = self.path_rule_skip(path) {
                skipped.push(SkippedFile {
                    path: path.clone(),
                    reason,
                });
                continue;
            }
            if bytes.len() as u64 > self.config.max_file_size {
                skipped.push(SkippedFile {
                    path: path.clone(),
                    reason: SkipReason::TooLarge,
                });
                continue;
            }
            candidates.push((path, bytes));
        }

        let results: Vec<Result<FileMetrics, SkippedFile>> = candidates
            .par_iter()
            .map(|(path, bytes)| classify::classify(&self.config, path, bytes))
            .collect();

        fold(results, skipped, false)
    }

    /// The sequential walk shared by `scan` and `iter_files`. Applies
    /// every rule that needs no file content.
    fn walk<'a>(&'a self, root: &'a Path) -> impl Iterator<Item = EntryRule> + 'a {
        WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                let name = entry.file_name().to_string_lossy();
                !(entry.file_type().is_dir()
                    && entry.depth() > 0
                    && self.config.skip_dirs.iter().any(|d| name == d.as_str()))
            })
            .map(move |entry| self.apply_entry_rules(root, entry))
    }

    fn apply_entry_rules(&self, root: &Path, entry: walkdir::Result<walkdir::DirEntry>) -> EntryRule {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                return match err.path() {
                    Some(path) => EntryRule::Skip(SkippedFile {
                        path: relative_to(path, root),
                        reason: SkipReason::IoError,
                    }),
                    None => EntryRule::Ignore,
                }
            }
        };
        let rel = relative_to(entry.path(), root);

        if entry.path_is_symlink() {
            return EntryRule::Skip(SkippedFile {
                path: rel,
                reason: SkipReason::Symlink,
            });
        }
        if !entry.file_type().is_file() {
            return EntryRule::Ignore;
        }
        if let Some(reason) = self.path_rule_skip(&rel) {
            return EntryRule::Skip(SkippedFile { path: rel, reason });
        }
        match entry.metadata() {
            Ok(meta) if meta.len() > self.config.max_file_size => EntryRule::Skip(SkippedFile {
                path: rel,
                reason: SkipReason::TooLarge,
            }),
            Ok(_) => EntryRule::Candidate(entry.path().to_path_buf(), rel),
            Err(_) => EntryRule::Skip(SkippedFile {
                path: rel,
                reason: SkipReason::IoError,
            }),
        }
    }

    fn read_and_classify(&self, abs: &Path, rel: PathBuf) -> Result<FileMetrics, SkippedFile> {
        let bytes = match read_with_timeout(abs, self.config.read_timeout) {
            Ok(bytes) => bytes,
            Err(_) => {
                return Err(SkippedFile {
                    path: rel,
                    reason: SkipReason::IoError,
                })
            }
        };
        classify::classify(&self.config, &rel, &bytes)
    }

    /// Exclude rules run before include rules; exclude wins.
    fn path_rule_skip(&self, rel: &Path) -> Option<SkipReason> {
        if self.config.exclude.iter().any(|p| p.matches_path(rel)) {
            return Some(SkipReason::Excluded);
        }
        if !self.config.include.is_empty()
            && !self.config.include.iter().any(|p| p.matches_path(rel))
        {
            return Some(SkipReason::Excluded);
        }
        None
    }
}

fn fold(
    results: Vec<Result<FileMetrics, SkippedFile>>,
    mut skipped: Vec<SkippedFile>,
    cancelled: bool,
) -> ScanOutcome {
    let mut files = Vec::new();
    for result in results {
        match result {
            Ok(metrics) => files.push(metrics),
            Err(skip) => skipped.push(skip),
        }
    }
    ScanOutcome {
        files,
        skipped,
        cancelled,
    }
}

fn relative_to(path: &Path, root: &Path) -> PathBuf {
    path.strip_prefix(root).unwrap_or(path).to_path_buf()
}

/// Read a whole file, giving up after `timeout` if one is configured.
/// The read itself runs on a helper thread; expiry surfaces as a
/// TimedOut error and the skip log records it as an I/O failure.
fn read_with_timeout(path: &Path, timeout: Option<Duration>) -> io::Result<Vec<u8>> {
    let Some(limit) = timeout else {
        return std::fs::read(path);
    };
    let (tx, rx) = mpsc::channel();
    let path = path.to_path_buf();
    thread::spawn(move || {
        let _ = tx.send(std::fs::read(&path));
    });
    match rx.recv_timeout(limit) {
        Ok(result) => result,
        Err(_) => Err(io::Error::new(
            io::ErrorKind::TimedOut,
            "file read exceeded the configured timeout",
        )),
    }
}
