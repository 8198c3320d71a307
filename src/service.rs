//! Request boundary: one call per request, bytes in, stored artifacts out.
//!
//! Every document a request loads or builds lives only for that call. Inputs
//! are all parsed before anything is written, and a request that fails part
//! way through removes the artifacts it already wrote.

use crate::archive::pack_parts;
use crate::assemble::{self, Part};
use crate::clock::Clock;
use crate::config::Config;
use crate::error::{ProcessError, Result};
use crate::pdf::SourceDocument;
use crate::storage::{Artifact, ArtifactStore};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// An uploaded file.
#[derive(Debug, Clone)]
pub struct Input {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Input {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Input {
            name: name.into(),
            bytes,
        }
    }

    fn load(&self) -> Result<SourceDocument> {
        SourceDocument::from_bytes(self.name.as_str(), &self.bytes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitMode {
    /// One part per comma-separated token, e.g. "1-3, 5, 7-10".
    Ranges(String),
    /// This many evenly sized parts.
    Size(usize),
}

impl SplitMode {
    /// Pick the mode from optional request parameters; exactly one must be set.
    pub fn from_params(ranges: Option<String>, parts: Option<usize>) -> Result<Self> {
        match (ranges, parts) {
            (Some(ranges), None) => Ok(SplitMode::Ranges(ranges)),
            (None, Some(parts)) => Ok(SplitMode::Size(parts)),
            (None, None) => Err(ProcessError::validation(
                "either a page range expression or a part count is required",
            )),
            (Some(_), Some(_)) => Err(ProcessError::validation(
                "page ranges and part count are mutually exclusive",
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentOutcome {
    pub artifact: Artifact,
    pub page_count: usize,
}

/// What a split request hands back: the archive, plus a listing of its entries.
#[derive(Debug, Clone, Serialize)]
pub struct SplitOutcome {
    pub archive: Artifact,
    pub entries: Vec<ArchiveEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveEntry {
    pub name: String,
    pub page_count: usize,
}

/// Split `source` and serialise every part; nothing is written to disk.
pub fn build_split_parts(
    source: &SourceDocument,
    mode: &SplitMode,
    strict_ranges: bool,
) -> Result<Vec<Part>> {
    let outputs = match mode {
        SplitMode::Ranges(expression) => {
            assemble::split_by_ranges(source, expression, strict_ranges)?
        }
        SplitMode::Size(parts) => assemble::split_by_size(source, *parts)?,
    };
    assemble::serialize_parts(source.stem(), outputs)
}

pub struct DocumentService {
    store: ArtifactStore,
    strict_ranges: bool,
    watermark_font_size: f32,
}

impl DocumentService {
    pub fn new(config: &Config, clock: Arc<dyn Clock>) -> Result<Self> {
        Ok(DocumentService {
            store: ArtifactStore::new(&config.storage_dir, clock)?,
            strict_ranges: config.strict_ranges,
            watermark_font_size: config.watermark_font_size,
        })
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    #[instrument(skip_all, fields(inputs = inputs.len()))]
    pub fn merge(&self, inputs: &[Input]) -> Result<DocumentOutcome> {
        if inputs.len() < 2 {
            return Err(ProcessError::validation("at least 2 files required"));
        }

        let sources = inputs
            .iter()
            .map(Input::load)
            .collect::<Result<Vec<_>>>()?;

        let mut merged = assemble::merge(&sources)?;
        let page_count = merged.page_count();
        let bytes = merged.to_bytes()?;
        let artifact = self.store.write_artifact("merged.pdf", &bytes)?;

        info!(artifact = %artifact.name, page_count, "Merge request complete");
        Ok(DocumentOutcome {
            artifact,
            page_count,
        })
    }

    #[instrument(skip_all, fields(input = %input.name, mode = ?mode))]
    pub fn split(&self, input: &Input, mode: &SplitMode) -> Result<SplitOutcome> {
        let source = input.load()?;
        let parts = build_split_parts(&source, mode, self.strict_ranges)?;

        // parts stay on disk alongside the archive but are not handed back
        let mut written: Vec<Artifact> = Vec::with_capacity(parts.len());
        for part in &parts {
            match self.store.write_artifact(&part.name, &part.bytes) {
                Ok(artifact) => written.push(artifact),
                Err(err) => {
                    self.discard_parts(&written);
                    return Err(err);
                }
            }
        }

        let archive = pack_parts(&parts)
            .and_then(|bytes| {
                self.store
                    .write_artifact(&format!("{}_split.zip", source.stem()), &bytes)
            })
            .inspect_err(|_| self.discard_parts(&written))?;

        info!(
            archive = %archive.name,
            parts = written.len(),
            "Split request complete"
        );
        Ok(SplitOutcome {
            archive,
            entries: parts
                .iter()
                .map(|part| ArchiveEntry {
                    name: part.name.clone(),
                    page_count: part.page_count,
                })
                .collect(),
        })
    }

    #[instrument(skip_all, fields(input = %input.name))]
    pub fn watermark(&self, input: &Input, text: &str) -> Result<DocumentOutcome> {
        let source = input.load()?;
        let mut output = assemble::watermark(&source, text, self.watermark_font_size)?;
        let page_count = output.page_count();
        let bytes = output.to_bytes()?;
        let artifact = self
            .store
            .write_artifact(&format!("{}_watermarked.pdf", source.stem()), &bytes)?;

        info!(artifact = %artifact.name, page_count, "Watermark request complete");
        Ok(DocumentOutcome {
            artifact,
            page_count,
        })
    }

    fn discard_parts(&self, written: &[Artifact]) {
        if !written.is_empty() {
            warn!(parts = written.len(), "Request failed, discarding written parts");
        }
        for artifact in written {
            self.store.discard(artifact);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, SystemClock};
    use chrono::{TimeZone, Utc};
    use crate::pdf::fixtures::{page_markers, sample_pdf};
    use std::io::{Cursor, Read};
    use zip::ZipArchive;

    fn service(dir: &std::path::Path, strict_ranges: bool) -> DocumentService {
        let config = Config {
            storage_dir: dir.to_path_buf(),
            strict_ranges,
            ..Config::default()
        };
        DocumentService::new(&config, Arc::new(SystemClock)).unwrap()
    }

    fn stored_files(dir: &std::path::Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    /// A service whose artifact names are fixed by a stopped clock.
    fn fixed_service(dir: &std::path::Path) -> DocumentService {
        let config = Config {
            storage_dir: dir.to_path_buf(),
            ..Config::default()
        };
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 0).unwrap());
        DocumentService::new(&config, Arc::new(clock)).unwrap()
    }

    /// Occupy the temp name of the `seq`-th write so that write fails.
    fn block_write(dir: &std::path::Path, stem: &str, seq: u64, ext: &str) -> std::path::PathBuf {
        let blocker = dir.join(format!(
            "{}-20260301T123000000-{:06}.{}.partial",
            stem, seq, ext
        ));
        std::fs::create_dir(&blocker).unwrap();
        std::fs::write(blocker.join("keep"), b"x").unwrap();
        blocker
    }

    fn remaining(dir: &std::path::Path) -> Vec<std::path::PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect()
    }

    #[test]
    fn test_merge_request() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), false);
        let inputs = vec![
            Input::new("a.pdf", sample_pdf("A", 2)),
            Input::new("b.pdf", sample_pdf("B", 3)),
        ];

        let outcome = service.merge(&inputs).unwrap();
        assert_eq!(outcome.page_count, 5);
        let bytes = std::fs::read(&outcome.artifact.path).unwrap();
        assert_eq!(page_markers(&bytes), vec!["A1", "A2", "B1", "B2", "B3"]);
    }

    #[test]
    fn test_merge_single_input_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), false);
        let result = service.merge(&[Input::new("a.pdf", sample_pdf("A", 2))]);
        assert!(matches!(result, Err(ProcessError::Validation(_))));
        assert_eq!(stored_files(dir.path()), 0);
    }

    #[test]
    fn test_merge_malformed_input_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), false);
        let inputs = vec![
            Input::new("a.pdf", sample_pdf("A", 2)),
            Input::new("broken.pdf", b"not a pdf at all".to_vec()),
        ];
        let result = service.merge(&inputs);
        assert!(matches!(result, Err(ProcessError::Format(_))));
        assert_eq!(stored_files(dir.path()), 0);
    }

    #[test]
    fn test_split_by_ranges_request() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), false);
        let input = Input::new("report.pdf", sample_pdf("R", 10));

        let outcome = service
            .split(&input, &SplitMode::Ranges("1-3, 5, 7-10".into()))
            .unwrap();
        let counts: Vec<usize> = outcome.entries.iter().map(|e| e.page_count).collect();
        assert_eq!(counts, vec![3, 1, 4]);
        // three parts plus the archive
        assert_eq!(stored_files(dir.path()), 4);

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["entries"][0]["name"], "report_part01.pdf");
        assert!(json["entries"][0].get("path").is_none());
        assert!(!json.to_string().contains("report_part01-"));

        let bytes = std::fs::read(&outcome.archive.path).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 3);
        let mut entry = archive.by_name("report_part03.pdf").unwrap();
        let mut pdf = Vec::new();
        entry.read_to_end(&mut pdf).unwrap();
        assert_eq!(page_markers(&pdf), vec!["R7", "R8", "R9", "R10"]);
    }

    #[test]
    fn test_split_by_size_request() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), false);
        let input = Input::new("report.pdf", sample_pdf("R", 10));

        let outcome = service.split(&input, &SplitMode::Size(4)).unwrap();
        let counts: Vec<usize> = outcome.entries.iter().map(|e| e.page_count).collect();
        assert_eq!(counts, vec![3, 3, 3, 1]);
        // four parts plus the archive
        assert_eq!(stored_files(dir.path()), 5);
    }

    #[test]
    fn test_strict_split_rejects_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), true);
        let input = Input::new("report.pdf", sample_pdf("R", 10));

        let result = service.split(&input, &SplitMode::Ranges("9-12".into()));
        assert!(matches!(result, Err(ProcessError::Range(_))));
        assert_eq!(stored_files(dir.path()), 0);
    }

    #[test]
    fn test_split_archive_failure_discards_parts() {
        let dir = tempfile::tempdir().unwrap();
        let service = fixed_service(dir.path());
        let input = Input::new("report.pdf", sample_pdf("R", 10));
        // parts take sequence 0 and 1, the archive takes 2
        let blocker = block_write(dir.path(), "report_split", 2, "zip");

        let result = service.split(&input, &SplitMode::Ranges("1-3, 5".into()));
        assert!(matches!(result, Err(ProcessError::Io(_))));
        assert_eq!(remaining(dir.path()), vec![blocker]);
    }

    #[test]
    fn test_split_part_failure_discards_earlier_parts() {
        let dir = tempfile::tempdir().unwrap();
        let service = fixed_service(dir.path());
        let input = Input::new("report.pdf", sample_pdf("R", 10));
        let blocker = block_write(dir.path(), "report_part03", 2, "pdf");

        let result = service.split(&input, &SplitMode::Size(4));
        assert!(matches!(result, Err(ProcessError::Io(_))));
        assert_eq!(remaining(dir.path()), vec![blocker]);
    }

    #[test]
    fn test_split_mode_params() {
        assert_eq!(
            SplitMode::from_params(Some("1-2".into()), None).unwrap(),
            SplitMode::Ranges("1-2".into())
        );
        assert_eq!(SplitMode::from_params(None, Some(3)).unwrap(), SplitMode::Size(3));
        assert!(matches!(
            SplitMode::from_params(None, None),
            Err(ProcessError::Validation(_))
        ));
        assert!(SplitMode::from_params(Some("1".into()), Some(2)).is_err());
    }

    #[test]
    fn test_watermark_request() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), false);
        let input = Input::new("memo.pdf", sample_pdf("M", 2));

        let outcome = service.watermark(&input, "CONFIDENTIAL").unwrap();
        assert_eq!(outcome.page_count, 2);
        assert!(outcome.artifact.name.starts_with("memo_watermarked-"));
        let bytes = std::fs::read(&outcome.artifact.path).unwrap();
        assert_eq!(page_markers(&bytes), vec!["M1", "M2"]);
    }
}
