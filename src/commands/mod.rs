pub mod merge;
pub mod split;
pub mod sweep;
pub mod watermark;
