use thiserror::Error;

/// Failures surfaced by the fetch pipeline.
///
/// Wrapped extractor failures keep the underlying message as-is so callers
/// (and HTTP clients) see what actually went wrong.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Invalid URL provided: {0}")]
    InvalidUrl(String),

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Invalid output template: {0}")]
    InvalidTemplate(String),

    #[error("{0}")]
    ExtractionFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("No download URL found: {0}")]
    NoStreamFound(String),
}

impl FetchError {
    /// True for failures caused by the caller's input rather than the remote side.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidUrl(_) | Self::UnsupportedPlatform(_) | Self::InvalidTemplate(_)
        )
    }
}

/// Opaque failure reported by an [`Extractor`](crate::core::Extractor).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ExtractorError {
    pub message: String,
}

impl ExtractorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for ExtractorError {
    fn from(err: std::io::Error) -> Self {
        Self::new(err.to_string())
    }
}

impl From<serde_json::Error> for ExtractorError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(format!("Invalid extractor output: {}", err))
    }
}
