pub mod document;
pub mod watermark;

#[cfg(test)]
pub mod fixtures;

pub use document::{OutputDocument, SourceDocument};
