use crate::core::extractor::{stream_selector, Extractor, TransferRequest};
use crate::core::progress::{ProgressObserver, SilentProgress};
use crate::core::{DownloadResult, FetchError, Platform, RateLimiter, VideoInfo};
use crate::utils::{generate_output_filename, validate_template, validate_url, DEFAULT_TEMPLATE};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Extractor names that match any URL rather than a specific site.
const CATCH_ALL_EXTRACTORS: &[&str] = &["generic"];

// A rendered name must stay inside the output directory.
fn is_plain_filename(filename: &Path) -> bool {
    let mut components = filename.components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Validation, platform detection, rate limiting and extraction for one
/// request at a time. Shared between concurrent callers.
pub struct Pipeline {
    extractor: Arc<dyn Extractor>,
    limiter: Arc<RateLimiter>,
    output_dir: PathBuf,
    progress: Arc<dyn ProgressObserver>,
}

impl Pipeline {
    pub fn new(
        extractor: Arc<dyn Extractor>,
        limiter: Arc<RateLimiter>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            extractor,
            limiter,
            output_dir: output_dir.into(),
            progress: Arc::new(SilentProgress),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressObserver>) -> Self {
        self.progress = progress;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Validate the URL, detect its platform and wait for rate-limit clearance.
    pub async fn admit(&self, url: &str) -> Result<Platform, FetchError> {
        if !validate_url(url) {
            return Err(FetchError::InvalidUrl(url.to_string()));
        }

        let platform =
            Platform::detect(url).ok_or_else(|| FetchError::UnsupportedPlatform(url.to_string()))?;

        debug!("Waiting for {} rate limit clearance", platform);
        self.limiter.acquire(platform).await;
        Ok(platform)
    }

    /// Resolve metadata for `url` without downloading any media.
    pub async fn fetch_metadata(&self, url: &str) -> Result<VideoInfo, FetchError> {
        let platform = self.admit(url).await?;
        debug!(
            "Extracting {} metadata for {} via {}",
            platform,
            url,
            self.extractor.name()
        );

        let metadata = self.extractor.extract_info(url).await.map_err(|e| {
            warn!("Metadata extraction failed for {}: {}", url, e);
            FetchError::ExtractionFailed(e.message)
        })?;

        Ok(VideoInfo::from_metadata(url, &metadata))
    }

    /// Download the best available stream for `url` into the output directory.
    ///
    /// `filename_template` is relative to the output directory and defaults
    /// to `{title}.{ext}`.
    pub async fn download(
        &self,
        url: &str,
        filename_template: Option<&str>,
    ) -> Result<DownloadResult, FetchError> {
        if let Some(template) = filename_template {
            if !validate_template(template) {
                return Err(FetchError::InvalidTemplate(template.to_string()));
            }
        }

        let platform = self.admit(url).await?;

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| FetchError::DownloadFailed(e.to_string()))?;

        let metadata = self.extractor.extract_info(url).await.map_err(|e| {
            warn!("Metadata extraction failed for {}: {}", url, e);
            FetchError::DownloadFailed(e.message)
        })?;

        let template = filename_template.unwrap_or(DEFAULT_TEMPLATE);
        let filename = generate_output_filename(template, &metadata);
        if !is_plain_filename(&filename) {
            return Err(FetchError::InvalidTemplate(template.to_string()));
        }
        let output_path = self.output_dir.join(filename);
        info!(
            "Downloading {} video to {}",
            platform,
            output_path.display()
        );

        let request = TransferRequest::new(output_path.clone());
        self.extractor
            .download(url, &request, self.progress.as_ref())
            .await
            .map_err(|e| {
                warn!("Download failed for {}: {}", url, e);
                FetchError::DownloadFailed(e.message)
            })?;

        Ok(DownloadResult::from_metadata(&metadata, output_path))
    }

    /// Resolve a direct stream URL no taller than `quality`.
    pub async fn resolve_stream_url(
        &self,
        url: &str,
        format: &str,
        quality: &str,
    ) -> Result<String, FetchError> {
        self.admit(url).await?;

        let selector = stream_selector(format, quality);
        debug!("Resolving stream for {} with selector {}", url, selector);

        match self.extractor.resolve_stream_url(url, &selector).await {
            Ok(Some(stream)) => Ok(stream),
            Ok(None) => Err(FetchError::NoStreamFound(format!(
                "no {} stream at or below {} for {}",
                if format.is_empty() { "matching" } else { format },
                quality,
                url
            ))),
            Err(e) => Err(FetchError::ExtractionFailed(e.message)),
        }
    }

    /// Site extractors known to the backend, without catch-all entries.
    pub async fn supported_platforms(&self) -> Result<Vec<String>, FetchError> {
        let names = self
            .extractor
            .list_extractors()
            .await
            .map_err(|e| FetchError::ExtractionFailed(e.message))?;

        Ok(names
            .into_iter()
            .filter(|name| !CATCH_ALL_EXTRACTORS.contains(&name.as_str()))
            .collect())
    }
}
