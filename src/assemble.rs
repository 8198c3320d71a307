use crate::error::{ProcessError, Result};
use crate::page_range::{parse_ranges, resolve_ranges, PageGroup};
use crate::pdf::watermark::apply_watermark;
use crate::pdf::{OutputDocument, SourceDocument};
use tracing::{debug, info, instrument};

/// One serialised output of a split, named for its place in the archive.
#[derive(Debug, Clone)]
pub struct Part {
    pub name: String,
    pub page_count: usize,
    pub bytes: Vec<u8>,
}

/// Concatenate every page of every source, in the order given.
#[instrument(skip_all, fields(sources = sources.len()))]
pub fn merge(sources: &[SourceDocument]) -> Result<OutputDocument> {
    if sources.len() < 2 {
        return Err(ProcessError::validation("at least 2 files required"));
    }

    let mut merged = OutputDocument::new();
    for source in sources {
        merged.append_document(source)?;
    }

    info!(
        files = sources.len(),
        pages = merged.page_count(),
        "Merged documents"
    );
    Ok(merged)
}

/// Build one output per token of `expression`, in token order.
///
/// Tokens that select nothing still produce a (zero-page) output.
#[instrument(skip(source), fields(source = source.name(), pages = source.page_count()))]
pub fn split_by_ranges(
    source: &SourceDocument,
    expression: &str,
    strict: bool,
) -> Result<Vec<OutputDocument>> {
    let tokens = parse_ranges(expression)?;
    let groups = resolve_ranges(&tokens, source.page_count(), strict)?;

    let outputs = build_outputs(source, &groups)?;
    info!(parts = outputs.len(), "Split by ranges");
    Ok(outputs)
}

/// Partition the pages into `parts` contiguous outputs of `ceil(total / parts)`
/// pages; trailing outputs may be short or empty.
#[instrument(skip(source), fields(source = source.name(), pages = source.page_count()))]
pub fn split_by_size(source: &SourceDocument, parts: usize) -> Result<Vec<OutputDocument>> {
    if parts == 0 {
        return Err(ProcessError::validation("part count must be at least 1"));
    }

    let groups = size_groups(source.page_count(), parts);
    let outputs = build_outputs(source, &groups)?;
    info!(parts = outputs.len(), "Split by size");
    Ok(outputs)
}

/// Page groups for splitting `total_pages` pages into `parts` parts.
pub fn size_groups(total_pages: usize, parts: usize) -> Vec<PageGroup> {
    let per_part = total_pages.div_ceil(parts.max(1));
    (0..parts)
        .map(|i| {
            let start = (i * per_part).min(total_pages);
            let end = (start + per_part).min(total_pages);
            (start..end).collect()
        })
        .collect()
}

/// Copy of `source` with `text` stamped across every page.
#[instrument(skip(source), fields(source = source.name()))]
pub fn watermark(source: &SourceDocument, text: &str, font_size: f32) -> Result<OutputDocument> {
    let mut output = OutputDocument::new();
    output.append_document(source)?;
    apply_watermark(&mut output, text, font_size)?;
    Ok(output)
}

fn build_outputs(source: &SourceDocument, groups: &[PageGroup]) -> Result<Vec<OutputDocument>> {
    groups
        .iter()
        .map(|group| {
            let mut output = OutputDocument::new();
            output.append_pages(source, group)?;
            debug!(pages = group.len(), "Built part");
            Ok(output)
        })
        .collect()
}

/// Serialise split outputs as `<stem>_partNN.pdf`, numbered from 1.
pub fn serialize_parts(stem: &str, outputs: Vec<OutputDocument>) -> Result<Vec<Part>> {
    outputs
        .into_iter()
        .enumerate()
        .map(|(i, mut output)| {
            Ok(Part {
                name: format!("{}_part{:02}.pdf", stem, i + 1),
                page_count: output.page_count(),
                bytes: output.to_bytes()?,
            })
        })
        .collect()
}
