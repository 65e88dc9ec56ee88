#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use vidfetch::core::{
    Extractor, ExtractorError, ProgressEvent, ProgressObserver, TransferRequest, VideoFormat,
    VideoMetadata,
};

/// In-memory extractor returning canned responses.
#[derive(Default)]
pub struct ScriptedExtractor {
    pub metadata: VideoMetadata,
    pub stream_url: Option<String>,
    pub info_error: Option<String>,
    pub download_error: Option<String>,
    pub extractors: Vec<String>,
    pub info_calls: AtomicUsize,
    pub download_calls: AtomicUsize,
    pub selectors: Mutex<Vec<String>>,
}

impl ScriptedExtractor {
    pub fn new(metadata: VideoMetadata) -> Self {
        Self {
            metadata,
            ..Default::default()
        }
    }

    pub fn info_calls(&self) -> usize {
        self.info_calls.load(Ordering::SeqCst)
    }

    pub fn download_calls(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Extractor for ScriptedExtractor {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn extract_info(&self, _url: &str) -> Result<VideoMetadata, ExtractorError> {
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        match &self.info_error {
            Some(message) => Err(ExtractorError::new(message.clone())),
            None => Ok(self.metadata.clone()),
        }
    }

    async fn download(
        &self,
        _url: &str,
        request: &TransferRequest,
        progress: &dyn ProgressObserver,
    ) -> Result<(), ExtractorError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.download_error {
            return Err(ExtractorError::new(message.clone()));
        }

        let filename = request.output_path.to_string_lossy().to_string();
        progress.on_progress(&ProgressEvent::Downloading {
            filename: Some(filename.clone()),
            downloaded_bytes: 4,
            total_bytes: Some(8),
        });
        tokio::fs::write(&request.output_path, b"fakedata").await?;
        progress.on_progress(&ProgressEvent::Downloading {
            filename: Some(filename.clone()),
            downloaded_bytes: 8,
            total_bytes: Some(8),
        });
        progress.on_progress(&ProgressEvent::Finished {
            filename: Some(filename),
        });
        Ok(())
    }

    async fn resolve_stream_url(
        &self,
        _url: &str,
        format_selector: &str,
    ) -> Result<Option<String>, ExtractorError> {
        self.selectors
            .lock()
            .unwrap()
            .push(format_selector.to_string());
        if let Some(message) = &self.info_error {
            return Err(ExtractorError::new(message.clone()));
        }
        Ok(self.stream_url.clone())
    }

    async fn list_extractors(&self) -> Result<Vec<String>, ExtractorError> {
        Ok(self.extractors.clone())
    }
}

/// Records every progress event it receives.
#[derive(Default)]
pub struct RecordingProgress {
    pub events: Mutex<Vec<ProgressEvent>>,
}

impl ProgressObserver for RecordingProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

pub fn sample_metadata() -> VideoMetadata {
    VideoMetadata {
        id: Some("abc".to_string()),
        title: Some("Test Video".to_string()),
        uploader: Some("Test Channel".to_string()),
        upload_date: Some("20240101".to_string()),
        duration: Some(120.0),
        view_count: Some(1000),
        like_count: Some(50),
        thumbnail: Some("https://i.ytimg.com/vi/abc/hq.jpg".to_string()),
        format: Some("137 - 1920x1080+140 - audio only".to_string()),
        ext: Some("mp4".to_string()),
        url: None,
        formats: vec![
            VideoFormat {
                format_id: Some("18".to_string()),
                ext: Some("mp4".to_string()),
                format_note: Some("360p".to_string()),
                height: Some(360),
                filesize: Some(5000),
                ..Default::default()
            },
            VideoFormat {
                format_id: Some("140".to_string()),
                ext: Some("m4a".to_string()),
                ..Default::default()
            },
        ],
    }
}
