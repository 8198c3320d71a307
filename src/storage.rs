use crate::clock::Clock;
use crate::error::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// A persisted output file.
#[derive(Debug, Clone, Serialize)]
pub struct Artifact {
    pub name: String,
    pub path: PathBuf,
    pub size: usize,
}

/// Writes outputs into one directory under unique, ordered names.
pub struct ArtifactStore {
    root: PathBuf,
    sequence: AtomicU64,
    clock: Arc<dyn Clock>,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(ArtifactStore {
            root,
            sequence: AtomicU64::new(0),
            clock,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<stem>-<timestamp>-<sequence>.<ext>` derived from `hint`.
    pub fn unique_name(&self, hint: &str) -> String {
        let hint = sanitize(hint);
        let (stem, ext) = match hint.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
            _ => (hint.as_str(), None),
        };
        let timestamp = self.clock.now().format("%Y%m%dT%H%M%S%3f");
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);

        match ext {
            Some(ext) => format!("{}-{}-{:06}.{}", stem, timestamp, seq, ext),
            None => format!("{}-{}-{:06}", stem, timestamp, seq),
        }
    }

    /// Write `bytes` under a fresh name.
    ///
    /// The file only appears under its final name once fully written; on
    /// failure nothing is left behind.
    pub fn write_artifact(&self, hint: &str, bytes: &[u8]) -> Result<Artifact> {
        let name = self.unique_name(hint);
        let path = self.root.join(&name);
        let partial = self.root.join(format!("{}.partial", name));

        let written = std::fs::write(&partial, bytes).and_then(|_| std::fs::rename(&partial, &path));
        if let Err(err) = written {
            if let Err(cleanup) = std::fs::remove_file(&partial) {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %partial.display(), %cleanup, "Failed to remove partial artifact");
                }
            }
            return Err(err.into());
        }

        debug!(name = %name, size = bytes.len(), "Artifact written");
        Ok(Artifact {
            name,
            path,
            size: bytes.len(),
        })
    }

    /// Delete an artifact written earlier in a request that later failed.
    pub fn discard(&self, artifact: &Artifact) {
        if let Err(err) = std::fs::remove_file(&artifact.path) {
            warn!(path = %artifact.path.display(), %err, "Failed to discard artifact");
        }
    }
}

fn sanitize(hint: &str) -> String {
    let file_name = Path::new(hint)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("artifact");
    let cleaned: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "artifact".to_string()
    } else {
        cleaned
    }
}
