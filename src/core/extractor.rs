use crate::core::error::ExtractorError;
use crate::core::progress::ProgressObserver;
use crate::core::VideoMetadata;
use async_trait::async_trait;
use std::path::PathBuf;

/// Format selection used for downloads: best separate video and audio
/// streams merged, or the best single combined stream.
pub const BEST_FORMAT: &str = "bestvideo+bestaudio/best";

/// Parameters for a media transfer to local storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    /// Final path of the downloaded file.
    pub output_path: PathBuf,
    pub format_selector: String,
    pub concurrent_fragments: u32,
}

impl TransferRequest {
    pub fn new(output_path: PathBuf) -> Self {
        Self {
            output_path,
            format_selector: BEST_FORMAT.to_string(),
            concurrent_fragments: 3,
        }
    }
}

/// The external capability that resolves URLs into metadata and media.
#[async_trait]
pub trait Extractor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Resolve metadata without fetching any media.
    async fn extract_info(&self, url: &str) -> Result<VideoMetadata, ExtractorError>;

    /// Transfer media for `url` to `request.output_path`, reporting progress.
    async fn download(
        &self,
        url: &str,
        request: &TransferRequest,
        progress: &dyn ProgressObserver,
    ) -> Result<(), ExtractorError>;

    /// Resolve a direct stream URL for the given selector. `Ok(None)` means
    /// no stream satisfies the selector.
    async fn resolve_stream_url(
        &self,
        url: &str,
        format_selector: &str,
    ) -> Result<Option<String>, ExtractorError>;

    /// Names of every site extractor known to the backend.
    async fn list_extractors(&self) -> Result<Vec<String>, ExtractorError>;
}

/// Build a selector for a direct stream no taller than `quality` (e.g.
/// `"720p"`), preferring the container `format` when given.
pub fn stream_selector(format: &str, quality: &str) -> String {
    let height = quality
        .trim()
        .trim_end_matches(['p', 'P'])
        .parse::<u32>()
        .ok();
    let bound = height
        .map(|h| format!("[height<={}]", h))
        .unwrap_or_default();
    let ext = format.trim();

    if ext.is_empty() {
        format!("bestvideo{bound}+bestaudio/best{bound}")
    } else {
        format!("bestvideo{bound}[ext={ext}]+bestaudio/best{bound}[ext={ext}]/best{bound}")
    }
}
