use std::path::PathBuf;
use thiserror::Error;

/// Failures a tagging run can end with
#[derive(Debug, Error)]
pub enum TaggerError {
    /// No usable credential or category selection; raised before any network call
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The thumbnail host produced nothing for a file. Non-fatal, the file is skipped.
    #[error("Failed to generate preview for {}: {reason}", path.display())]
    PreviewGeneration { path: PathBuf, reason: String },

    /// Transport failure or non-2xx status from the tagging endpoint
    #[error("Tagging request failed: {0}")]
    Network(String),

    /// The endpoint answered, but not with the expected JSON shape
    #[error("Malformed tagging response: {0}")]
    ResponseShape(String),

    #[error("Not all images were tagged [Received {received}, requested {requested}]")]
    IncompleteBatch { received: usize, requested: usize },

    #[error("The number of categories ({received}) does not match the number of attributes ({expected})")]
    CategoryMismatch { received: usize, expected: usize },

    #[error("No supported files selected")]
    NoSupportedFiles,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TaggerError {
    /// Errors that stand in for "the backend returned zero tags"
    pub fn is_empty_response(&self) -> bool {
        matches!(self, TaggerError::Network(_) | TaggerError::ResponseShape(_))
    }
}

impl From<std::io::Error> for TaggerError {
    fn from(err: std::io::Error) -> Self {
        TaggerError::Other(err.into())
    }
}
