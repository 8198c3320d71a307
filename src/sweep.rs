use crate::clock::Clock;
use chrono::{DateTime, TimeDelta, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: usize,
    pub kept: usize,
}

/// Deletes files under a directory once they are older than the retention
/// window.
///
/// Eligibility is purely by modification time. Artifacts are renamed into
/// place only after they are fully written, so anything old enough to be
/// removed is no longer being written.
#[derive(Clone)]
pub struct Sweeper {
    root: PathBuf,
    retention: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl Sweeper {
    pub fn new(root: impl Into<PathBuf>, retention: TimeDelta, clock: Arc<dyn Clock>) -> Self {
        Sweeper {
            root: root.into(),
            retention,
            clock,
        }
    }

    pub fn sweep_once(&self) -> SweepReport {
        let mut report = SweepReport::default();
        if !self.root.is_dir() {
            return report;
        }

        let cutoff = self.clock.now() - self.retention;

        for entry in WalkDir::new(&self.root).min_depth(1) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(%err, "Skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let modified = match entry.metadata().ok().and_then(|m| m.modified().ok()) {
                Some(time) => DateTime::<Utc>::from(time),
                None => {
                    warn!(path = %entry.path().display(), "No modification time, keeping");
                    report.kept += 1;
                    continue;
                }
            };

            if modified >= cutoff {
                report.kept += 1;
                continue;
            }

            match std::fs::remove_file(entry.path()) {
                Ok(()) => {
                    debug!(path = %entry.path().display(), "Removed stale file");
                    report.removed += 1;
                }
                Err(err) => warn!(path = %entry.path().display(), %err, "Failed to remove stale file"),
            }
        }

        report
    }

    /// Sweep every `interval` until the task is dropped or aborted.
    pub async fn run(self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;

            let sweeper = self.clone();
            match tokio::task::spawn_blocking(move || sweeper.sweep_once()).await {
                Ok(report) if report.removed > 0 => {
                    info!(removed = report.removed, kept = report.kept, "Swept stale artifacts");
                }
                Ok(_) => {}
                Err(err) => warn!(%err, "Sweep task failed"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn test_removes_only_stale_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.pdf"), b"a").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("b.zip"), b"b").unwrap();

        let clock = Arc::new(ManualClock::new(Utc::now()));
        let sweeper = Sweeper::new(dir.path(), TimeDelta::hours(1), clock.clone());

        assert_eq!(sweeper.sweep_once(), SweepReport { removed: 0, kept: 2 });

        clock.advance(TimeDelta::minutes(61));
        assert_eq!(sweeper.sweep_once(), SweepReport { removed: 2, kept: 0 });
        assert!(!dir.path().join("a.pdf").exists());
        assert!(dir.path().join("nested").is_dir());
    }

    #[test]
    fn test_missing_root_is_noop() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let sweeper = Sweeper::new("/nonexistent/quire-sweep", TimeDelta::hours(1), clock);
        assert_eq!(sweeper.sweep_once(), SweepReport::default());
    }

    #[tokio::test]
    async fn test_run_sweeps_on_first_tick() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("old.pdf"), b"old").unwrap();

        let clock = Arc::new(ManualClock::new(Utc::now()));
        clock.advance(TimeDelta::hours(2));
        let sweeper = Sweeper::new(dir.path(), TimeDelta::hours(1), clock);

        let handle = tokio::spawn(sweeper.run(Duration::from_secs(60)));
        for _ in 0..50 {
            if !dir.path().join("old.pdf").exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.abort();
        assert!(!dir.path().join("old.pdf").exists());
    }
}
