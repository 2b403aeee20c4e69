// src/history.rs

use crate::aggregate::aggregate;
use crate::model::{GapReason, LineCountMode, ReplayGap, RevisionId, TimePointMode, TimeSeries};
use crate::scanner::DirectoryScanner;
use git2::{ErrorCode, ObjectType, Oid, Repository, TreeWalkMode, TreeWalkResult};
use indicatif::ProgressBar;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// The file tree as of one revision, reconstructed in memory.
pub struct RevisionTree {
    /// Commit timestamp in unix seconds.
    pub timestamp: i64,
    pub files: Vec<(PathBuf, Vec<u8>)>,
}

/// The version-control collaborator the replayer drives.
///
/// A failed reconstruction is reported as a `GapReason` so the replay
/// can log it and continue; it is data, not a fatal error.
pub trait RevisionSource {
    /// Revisions in chronological order, oldest first.
    fn list_revisions(&self) -> anyhow::Result<Vec<RevisionId>>;
    /// The file tree as of `revision`.
    fn tree_at(&self, revision: &RevisionId) -> Result<RevisionTree, GapReason>;
}

/// Git-backed revision source for the first-parent history of HEAD.
pub struct GitHistory {
    repo: Repository,
}

impl GitHistory {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let repo = Repository::open(path)?;
        Ok(GitHistory { repo })
    }
}

impl RevisionSource for GitHistory {
    fn list_revisions(&self) -> anyhow::Result<Vec<RevisionId>> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.push_head()?;
        revwalk.set_sorting(git2::Sort::TIME)?;

        let mut revisions = Vec::new();
        for oid in revwalk {
            revisions.push(oid?.to_string());
        }
        revisions.reverse(); // walk from the first commit to the last
        Ok(revisions)
    }

    fn tree_at(&self, revision: &RevisionId) -> Result<RevisionTree, GapReason> {
        let oid = Oid::from_str(revision).map_err(|_| GapReason::MissingRevision)?;
        let commit = self.repo.find_commit(oid).map_err(|err| {
            if err.code() == ErrorCode::NotFound {
                GapReason::MissingRevision
            } else {
                GapReason::CorruptTree
            }
        })?;
        let tree = commit.tree().map_err(|_| GapReason::CorruptTree)?;

        let mut files = Vec::new();
        let mut broken = false;
        tree.walk(TreeWalkMode::PreOrder, |dir, entry| {
            if entry.kind() != Some(ObjectType::Blob) {
                return TreeWalkResult::Ok;
            }
            let name = match entry.name() {
                Some(name) => name,
                None => return TreeWalkResult::Ok, // non-UTF-8 path
            };
            match self.repo.find_blob(entry.id()) {
                Ok(blob) => {
                    files.push((PathBuf::from(dir).join(name), blob.content().to_vec()));
                    TreeWalkResult::Ok
                }
                Err(_) => {
                    broken = true;
                    TreeWalkResult::Abort
                }
            }
        })
        .map_err(|_| GapReason::CorruptTree)?;
        if broken {
            return Err(GapReason::CorruptTree);
        }

        Ok(RevisionTree {
            timestamp: commit.time().seconds(),
            files,
        })
    }
}

/// Pick `points` evenly spaced indices out of `0..len`, endpoints
/// included. More points than revisions means every revision.
pub fn sample_indices(len: usize, points: usize) -> Vec<usize> {
    if len == 0 || points == 0 {
        return Vec::new();
    }
    if points >= len {
        return (0..len).collect();
    }
    if points == 1 {
        return vec![len - 1];
    }
    let mut indices: Vec<usize> = (0..points)
        .map(|k| k * (len - 1) / (points - 1))
        .collect();
    indices.dedup();
    indices
}

/// Re-run scan+aggregate at each time point and build the series.
///
/// Failed reconstructions become logged gaps, never aborts; the chart
/// tolerates holes. Cancellation is checked between time points.
pub fn replay<S: RevisionSource>(
    source: &S,
    scanner: &DirectoryScanner,
    point_mode: TimePointMode,
    line_mode: LineCountMode,
    points: usize,
    cancel: Option<&AtomicBool>,
) -> anyhow::Result<TimeSeries> {
    let revisions = source.list_revisions()?;
    let selected: Vec<RevisionId> = match point_mode {
        TimePointMode::Commit => revisions,
        TimePointMode::Generic => sample_indices(revisions.len(), points)
            .into_iter()
            .map(|i| revisions[i].clone())
            .collect(),
    };

    let bar = ProgressBar::new(selected.len() as u64);
    bar.set_message("Replaying history");

    let mut series = TimeSeries::new(point_mode, line_mode);
    for revision in selected {
        if cancel.is_some_and(|token| token.load(Ordering::Relaxed)) {
            break;
        }
        match source.tree_at(&revision) {
            Ok(tree) => {
                let outcome = scanner.scan_tree(&tree.files);
                series.snapshots.push(aggregate(
                    outcome.files,
                    outcome.skipped,
                    tree.timestamp,
                    Some(revision),
                ));
            }
            Err(reason) => {
                eprintln!("skipping revision {revision}: {reason:?}");
                series.gaps.push(ReplayGap { revision, reason });
            }
        }
        bar.inc(1);
    }
    bar.finish_with_message("Replay complete");

    Ok(series)
}
