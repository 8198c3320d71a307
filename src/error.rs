use thiserror::Error;

/// Errors produced while processing a document request.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Bad caller input: too few merge sources, missing parameter, ...
    #[error("{0}")]
    Validation(String),

    /// Source bytes are not a readable PDF.
    #[error("not a readable PDF: {0}")]
    Format(String),

    /// Page range rejected (strict mode only).
    #[error("invalid page range: {0}")]
    Range(String),

    /// Page copy or serialization failed while building an output.
    #[error("PDF operation failed: {0}")]
    Document(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ProcessError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ProcessError::Validation(msg.into())
    }

    /// Whether the request failed because of what the caller sent.
    pub fn is_caller_fault(&self) -> bool {
        matches!(
            self,
            ProcessError::Validation(_) | ProcessError::Format(_) | ProcessError::Range(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ProcessError>;
