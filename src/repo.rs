// src/repo.rs

use crate::aggregate::aggregate;
use crate::history::{replay, RevisionSource};
use crate::model::{LineCountMode, ProjectSnapshot, TimePointMode, TimeSeries};
use crate::scanner::DirectoryScanner;
use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread;

/// Owns the latest snapshot and time series for one project root.
///
/// Readers get the last fully committed state through cheap `Arc`
/// clones; writers swap whole references, never mutate in place, so a
/// presentation layer can read at any time without observing a
/// half-built aggregation. One instance per project root; this is an
/// explicitly owned object, not a process-wide singleton.
pub struct StatsRepository {
    root: PathBuf,
    scanner: Arc<DirectoryScanner>,
    snapshot: RwLock<Arc<ProjectSnapshot>>,
    series: RwLock<Arc<TimeSeries>>,
    /// Cancellation token of the in-flight pass, if any. A new request
    /// trips the old token before starting fresh, so at most one
    /// scan/replay runs per repository.
    inflight: Mutex<Option<Arc<AtomicBool>>>,
}

impl StatsRepository {
    pub fn new(root: PathBuf, scanner: Arc<DirectoryScanner>) -> Self {
        StatsRepository {
            root,
            scanner,
            snapshot: RwLock::new(Arc::new(ProjectSnapshot::empty())),
            series: RwLock::new(Arc::new(TimeSeries::new(
                TimePointMode::Commit,
                LineCountMode::CodeLines,
            ))),
            inflight: Mutex::new(None),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn scanner(&self) -> &DirectoryScanner {
        &self.scanner
    }

    /// The last fully committed snapshot.
    pub fn current(&self) -> Arc<ProjectSnapshot> {
        Arc::clone(&self.snapshot.read().expect("snapshot lock poisoned"))
    }

    /// The last fully committed time series.
    pub fn current_series(&self) -> Arc<TimeSeries> {
        Arc::clone(&self.series.read().expect("series lock poisoned"))
    }

    /// Replace the snapshot whole. Never merges.
    pub fn update(&self, snapshot: ProjectSnapshot) {
        *self.snapshot.write().expect("snapshot lock poisoned") = Arc::new(snapshot);
    }

    /// Replace the series whole. Never merges.
    pub fn update_series(&self, series: TimeSeries) {
        *self.series.write().expect("series lock poisoned") = Arc::new(series);
    }

    /// Cancel any in-flight pass and hand out a fresh token.
    fn begin_pass(&self) -> Arc<AtomicBool> {
        let mut guard = self.inflight.lock().expect("inflight lock poisoned");
        if let Some(token) = guard.take() {
            token.store(true, Ordering::Relaxed);
        }
        let token = Arc::new(AtomicBool::new(false));
        *guard = Some(token.clone());
        token
    }

    /// Scan the root synchronously, publish and return the snapshot.
    pub fn scan_now(&self) -> Arc<ProjectSnapshot> {
        let token = self.begin_pass();
        let outcome = self.scanner.scan(&self.root, Some(&token));
        if !outcome.cancelled {
            self.update(aggregate(
                outcome.files,
                outcome.skipped,
                chrono::Utc::now().timestamp(),
                None,
            ));
        }
        self.current()
    }

    /// Scan on a background worker so an interactive thread stays
    /// responsive. A request issued while another pass runs cancels it.
    /// Cancelled results are discarded, never published.
    pub fn request_scan(self: &Arc<Self>) -> thread::JoinHandle<()> {
        let token = self.begin_pass();
        let repo = Arc::clone(self);
        thread::spawn(move || {
            let outcome = repo.scanner.scan(&repo.root, Some(&token));
            if outcome.cancelled || token.load(Ordering::Relaxed) {
                return;
            }
            repo.update(aggregate(
                outcome.files,
                outcome.skipped,
                chrono::Utc::now().timestamp(),
                None,
            ));
        })
    }

    /// Replay history synchronously, publish and return the series.
    /// Mode tags carry over from the stored series.
    pub fn replay_now<S: RevisionSource>(
        &self,
        source: &S,
        points: usize,
    ) -> anyhow::Result<Arc<TimeSeries>> {
        let (point_mode, line_mode) = {
            let current = self.current_series();
            (current.point_mode, current.line_mode)
        };
        let token = self.begin_pass();
        let series = replay(
            source,
            &self.scanner,
            point_mode,
            line_mode,
            points,
            Some(&token),
        )?;
        if !token.load(Ordering::Relaxed) {
            self.update_series(series);
        }
        Ok(self.current_series())
    }

    /// Display-only: retag the stored series. Triggers no scan because
    /// every snapshot already carries both line-count scalars.
    pub fn set_line_mode(&self, mode: LineCountMode) {
        let mut guard = self.series.write().expect("series lock poisoned");
        let mut series = (**guard).clone();
        series.line_mode = mode;
        *guard = Arc::new(series);
    }

    /// Display-only, same contract as `set_line_mode`.
    pub fn set_point_mode(&self, mode: TimePointMode) {
        let mut guard = self.series.write().expect("series lock poisoned");
        let mut series = (**guard).clone();
        series.point_mode = mode;
        *guard = Arc::new(series);
    }

    /// Persist the current series so a later run can reload without
    /// re-scanning.
    pub fn save_cache(&self, path: &Path) -> anyhow::Result<()> {
        let series = self.current_series();
        let json = serde_json::to_string_pretty(&*series)?;
        fs::write(path, json).with_context(|| format!("writing cache to {}", path.display()))?;
        Ok(())
    }

    /// Load a cached series, replacing the stored one. The newest
    /// snapshot in the cache also becomes the current snapshot.
    pub fn load_cache(&self, path: &Path) -> anyhow::Result<()> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("reading cache from {}", path.display()))?;
        let series: TimeSeries = serde_json::from_str(&json)?;
        if let Some(latest) = series.snapshots.last() {
            self.update(latest.clone());
        }
        self.update_series(series);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanConfig;
    use std::fs as stdfs;
    use tempfile::TempDir;

    fn repository(root: &Path) -> Arc<StatsRepository> {
        let scanner = Arc::new(DirectoryScanner::new(Arc::new(ScanConfig::default())));
        Arc::new(StatsRepository::new(root.to_path_buf(), scanner))
    }

    #[test]
    fn update_swaps_the_whole_snapshot() {
        let dir = TempDir::new().unwrap();
        let repo = repository(dir.path());
        let before = repo.current();
        assert_eq!(before.total_files, 0);

        let mut snapshot = ProjectSnapshot::empty();
        snapshot.total_files = 3;
        repo.update(snapshot);

        // The old reference is untouched; readers holding it see the
        // state they started with.
        assert_eq!(before.total_files, 0);
        assert_eq!(repo.current().total_files, 3);
    }

    #[test]
    fn scan_now_publishes_an_aggregate() {
        let dir = TempDir::new().unwrap();
        stdfs::write(dir.path().join("a.rs"), "fn a() {}\n").unwrap();
        let repo = repository(dir.path());
        let snap = repo.scan_now();
        assert_eq!(snap.total_files, 1);
        assert_eq!(snap.languages[0].language, "rust");
    }

    #[test]
    fn background_scan_lands_in_the_repository() {
        let dir = TempDir::new().unwrap();
        stdfs::write(dir.path().join("a.py"), "x = 1\n").unwrap();
        let repo = repository(dir.path());
        repo.request_scan().join().unwrap();
        assert_eq!(repo.current().total_files, 1);
    }

    #[test]
    fn new_request_cancels_the_inflight_token() {
        let dir = TempDir::new().unwrap();
        let repo = repository(dir.path());
        let first = repo.begin_pass();
        let _second = repo.begin_pass();
        assert!(first.load(Ordering::Relaxed), "first pass should be cancelled");
    }

    #[test]
    fn mode_toggle_triggers_zero_scans() {
        let dir = TempDir::new().unwrap();
        stdfs::write(dir.path().join("a.rs"), "fn a() {}\n").unwrap();
        let repo = repository(dir.path());
        repo.scan_now();

        let scans_before = repo.scanner().scans_started();
        repo.set_line_mode(LineCountMode::TotalLines);
        repo.set_point_mode(TimePointMode::Generic);
        assert_eq!(repo.scanner().scans_started(), scans_before);
        assert_eq!(repo.current_series().line_mode, LineCountMode::TotalLines);
        assert_eq!(repo.current_series().point_mode, TimePointMode::Generic);
    }

    #[test]
    fn cache_round_trips_through_json() {
        let dir = TempDir::new().unwrap();
        stdfs::write(dir.path().join("a.rs"), "fn a() {}\n// c\n").unwrap();
        let repo = repository(dir.path());

        let mut series = TimeSeries::new(TimePointMode::Commit, LineCountMode::CodeLines);
        let snap = repo.scan_now();
        series.snapshots.push((*snap).clone());
        repo.update_series(series);

        let cache = dir.path().join("stats.json");
        repo.save_cache(&cache).unwrap();

        let restored = repository(dir.path());
        restored.load_cache(&cache).unwrap();
        assert_eq!(*restored.current_series(), *repo.current_series());
        assert_eq!(restored.current().total_files, 1);
    }
}
