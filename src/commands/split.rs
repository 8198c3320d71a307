use crate::archive::pack_parts;
use crate::pdf::SourceDocument;
use crate::service::{build_split_parts, SplitMode};
use anyhow::{Context, Result};
use std::path::Path;

pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    mode: &SplitMode,
    strict_ranges: bool,
    output: Q,
) -> Result<()> {
    let input = input.as_ref();
    let output = output.as_ref();

    let source = SourceDocument::open(input)
        .with_context(|| format!("Failed to load PDF: {}", input.display()))?;
    let parts = build_split_parts(&source, mode, strict_ranges)?;
    let archive = pack_parts(&parts)?;

    std::fs::write(output, archive)
        .with_context(|| format!("Failed to save archive: {}", output.display()))?;

    for part in &parts {
        println!("{}: {} page(s)", part.name, part.page_count);
    }
    println!(
        "Split {} pages into {} parts in {}",
        source.page_count(),
        parts.len(),
        output.display()
    );

    Ok(())
}
