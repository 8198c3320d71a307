use crate::assemble;
use crate::pdf::SourceDocument;
use anyhow::{Context, Result};
use std::path::Path;

pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(inputs: &[P], output: Q) -> Result<()> {
    let output = output.as_ref();

    // Load everything up front so a bad input leaves no output behind
    let sources = inputs
        .iter()
        .map(|input| {
            SourceDocument::open(input)
                .with_context(|| format!("Failed to load PDF: {}", input.as_ref().display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut merged = assemble::merge(&sources)?;
    let bytes = merged.to_bytes()?;
    std::fs::write(output, bytes)
        .with_context(|| format!("Failed to save merged PDF: {}", output.display()))?;

    println!(
        "Merged {} files ({} pages) into {}",
        sources.len(),
        merged.page_count(),
        output.display()
    );

    Ok(())
}
