use crate::assemble;
use crate::pdf::SourceDocument;
use anyhow::{Context, Result};
use std::path::Path;

pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    text: &str,
    font_size: f32,
    output: Q,
) -> Result<()> {
    let input = input.as_ref();
    let output = output.as_ref();

    let source = SourceDocument::open(input)
        .with_context(|| format!("Failed to load PDF: {}", input.display()))?;
    let mut stamped = assemble::watermark(&source, text, font_size)?;
    std::fs::write(output, stamped.to_bytes()?)
        .with_context(|| format!("Failed to save PDF: {}", output.display()))?;

    println!(
        "Watermarked {} page(s) into {}",
        stamped.page_count(),
        output.display()
    );

    Ok(())
}
