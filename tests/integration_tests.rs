mod support;

use futures::future::join_all;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use support::{sample_metadata, RecordingProgress, ScriptedExtractor};
use tokio::time::Instant;
use vidfetch::core::ProgressEvent;
use vidfetch::{FetchError, Pipeline, Platform, RateLimitPolicy, RateLimiter, VideoMetadata};

fn pipeline_with(
    extractor: Arc<ScriptedExtractor>,
    policy: RateLimitPolicy,
    output_dir: PathBuf,
) -> Pipeline {
    Pipeline::new(extractor, Arc::new(RateLimiter::new(policy)), output_dir)
}

#[tokio::test]
async fn test_download_end_to_end() -> anyhow::Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let output_dir = temp_dir.path().join("downloads");
    let extractor = Arc::new(ScriptedExtractor::new(sample_metadata()));
    let progress = Arc::new(RecordingProgress::default());
    let pipeline = pipeline_with(
        extractor.clone(),
        RateLimitPolicy::new(Duration::from_secs(30)),
        output_dir.clone(),
    )
    .with_progress(progress.clone());

    let started = Instant::now();
    let result = pipeline
        .download("https://www.youtube.com/watch?v=abc", None)
        .await?;

    // No prior platform state, so no rate-limit wait.
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(result.filepath, output_dir.join("Test Video.mp4"));
    assert!(result.filepath.exists());
    assert_eq!(result.title.as_deref(), Some("Test Video"));
    assert_eq!(result.uploader.as_deref(), Some("Test Channel"));
    assert_eq!(result.upload_date.as_deref(), Some("20240101"));
    assert_eq!(result.duration, Some(120));
    assert_eq!(result.view_count, Some(1000));
    assert_eq!(result.like_count, Some(50));
    assert_eq!(
        result.format.as_deref(),
        Some("137 - 1920x1080+140 - audio only")
    );

    let events = progress.events.lock().unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].status(), "downloading");
    assert!(matches!(events[2], ProgressEvent::Finished { .. }));
    Ok(())
}

#[tokio::test]
async fn test_download_with_custom_template() -> anyhow::Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let extractor = Arc::new(ScriptedExtractor::new(sample_metadata()));
    let pipeline = pipeline_with(
        extractor,
        RateLimitPolicy::default(),
        temp_dir.path().to_path_buf(),
    );

    let result = pipeline
        .download("https://youtu.be/abc", Some("{uploader} - {title} [{id}].{ext}"))
        .await?;

    assert_eq!(
        result.filepath,
        temp_dir.path().join("Test Channel - Test Video [abc].mp4")
    );
    Ok(())
}

#[tokio::test]
async fn test_download_rejects_hostile_template() {
    let temp_dir = tempfile::tempdir().unwrap();
    let extractor = Arc::new(ScriptedExtractor::new(sample_metadata()));
    let pipeline = pipeline_with(
        extractor.clone(),
        RateLimitPolicy::default(),
        temp_dir.path().to_path_buf(),
    );

    let err = pipeline
        .download("https://youtu.be/abc", Some("../bad<name>.mp4"))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::InvalidTemplate(_)));
    assert_eq!(extractor.info_calls(), 0);
    assert_eq!(extractor.download_calls(), 0);
}

#[tokio::test]
async fn test_invalid_and_unsupported_urls_fail_before_extraction() {
    let temp_dir = tempfile::tempdir().unwrap();
    let extractor = Arc::new(ScriptedExtractor::new(sample_metadata()));
    let pipeline = pipeline_with(
        extractor.clone(),
        RateLimitPolicy::default(),
        temp_dir.path().to_path_buf(),
    );

    let err = pipeline.fetch_metadata("not a url").await.unwrap_err();
    assert!(matches!(err, FetchError::InvalidUrl(_)));

    let err = pipeline.download("www.youtube.com/watch?v=abc", None).await.unwrap_err();
    assert!(matches!(err, FetchError::InvalidUrl(_)));

    let err = pipeline.fetch_metadata("https://example.com/video").await.unwrap_err();
    assert!(matches!(err, FetchError::UnsupportedPlatform(_)));

    let err = pipeline.download("https://vimeo.com/123456", None).await.unwrap_err();
    assert!(matches!(err, FetchError::UnsupportedPlatform(_)));

    assert_eq!(extractor.info_calls(), 0);
    assert_eq!(extractor.download_calls(), 0);
}

#[tokio::test]
async fn test_extraction_failure_preserves_message() {
    let temp_dir = tempfile::tempdir().unwrap();
    let extractor = Arc::new(ScriptedExtractor {
        info_error: Some("[youtube] abc: Video unavailable".to_string()),
        ..Default::default()
    });
    let pipeline = pipeline_with(
        extractor,
        RateLimitPolicy::default(),
        temp_dir.path().to_path_buf(),
    );

    let err = pipeline
        .fetch_metadata("https://www.youtube.com/watch?v=abc")
        .await
        .unwrap_err();
    assert_eq!(
        err,
        FetchError::ExtractionFailed("[youtube] abc: Video unavailable".to_string())
    );
}

#[tokio::test]
async fn test_transfer_failure_is_download_failed() {
    let temp_dir = tempfile::tempdir().unwrap();
    let extractor = Arc::new(ScriptedExtractor {
        metadata: sample_metadata(),
        download_error: Some("HTTP Error 403: Forbidden".to_string()),
        ..Default::default()
    });
    let pipeline = pipeline_with(
        extractor.clone(),
        RateLimitPolicy::default(),
        temp_dir.path().to_path_buf(),
    );

    let err = pipeline
        .download("https://www.instagram.com/p/xyz/", None)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        FetchError::DownloadFailed("HTTP Error 403: Forbidden".to_string())
    );
    assert_eq!(extractor.download_calls(), 1);
}

#[tokio::test]
async fn test_metadata_failure_during_download_is_download_failed() {
    let temp_dir = tempfile::tempdir().unwrap();
    let extractor = Arc::new(ScriptedExtractor {
        info_error: Some("[youtube] abc: Private video".to_string()),
        ..Default::default()
    });
    let pipeline = pipeline_with(
        extractor.clone(),
        RateLimitPolicy::default(),
        temp_dir.path().to_path_buf(),
    );

    let err = pipeline
        .download("https://www.youtube.com/watch?v=abc", None)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        FetchError::DownloadFailed("[youtube] abc: Private video".to_string())
    );
    assert_eq!(extractor.info_calls(), 1);
    assert_eq!(extractor.download_calls(), 0);
}

#[tokio::test]
async fn test_download_rejects_templates_leaving_output_dir() {
    let temp_dir = tempfile::tempdir().unwrap();
    let extractor = Arc::new(ScriptedExtractor::new(VideoMetadata {
        title: Some("..".to_string()),
        ..sample_metadata()
    }));
    let pipeline = pipeline_with(
        extractor.clone(),
        RateLimitPolicy::new(Duration::from_millis(1)),
        temp_dir.path().to_path_buf(),
    );

    let err = pipeline
        .download("https://youtu.be/abc", Some(".."))
        .await
        .unwrap_err();
    assert_eq!(err, FetchError::InvalidTemplate("..".to_string()));
    assert_eq!(extractor.info_calls(), 0);

    // Only detectable once the title has been substituted.
    let err = pipeline
        .download("https://youtu.be/abc", Some("{title}"))
        .await
        .unwrap_err();
    assert_eq!(err, FetchError::InvalidTemplate("{title}".to_string()));
    assert_eq!(extractor.download_calls(), 0);
}

#[tokio::test]
async fn test_fetch_metadata_normalizes_and_repeats() -> anyhow::Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let extractor = Arc::new(ScriptedExtractor::new(sample_metadata()));
    let pipeline = pipeline_with(
        extractor.clone(),
        RateLimitPolicy::new(Duration::from_millis(20)),
        temp_dir.path().to_path_buf(),
    );

    let url = "https://www.tiktok.com/@user/video/1";
    let first = pipeline.fetch_metadata(url).await?;
    let second = pipeline.fetch_metadata(url).await?;

    assert_eq!(first, second);
    assert_eq!(first.url, url);
    assert_eq!(first.title, "Test Video");
    assert_eq!(first.duration, Some(120));
    assert_eq!(first.formats.len(), 2);
    assert_eq!(first.formats[0].quality, "360p");
    assert_eq!(first.formats[0].filesize, 5000);
    assert_eq!(first.formats[1].quality, "unknown");
    assert_eq!(first.formats[1].filesize, 0);
    assert_eq!(extractor.info_calls(), 2);
    Ok(())
}

#[tokio::test]
async fn test_fetch_metadata_tolerates_empty_metadata() -> anyhow::Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let extractor = Arc::new(ScriptedExtractor::new(VideoMetadata::default()));
    let pipeline = pipeline_with(
        extractor,
        RateLimitPolicy::default(),
        temp_dir.path().to_path_buf(),
    );

    let info = pipeline
        .fetch_metadata("https://twitter.com/user/status/1")
        .await?;
    assert_eq!(info.title, "");
    assert!(info.thumbnail.is_none());
    assert!(info.formats.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_concurrent_acquires_are_spaced_by_interval() {
    let interval = Duration::from_millis(60);
    let limiter = RateLimiter::new(RateLimitPolicy::new(interval));

    let mut admitted =
        join_all((0..4).map(|_| limiter.acquire(Platform::YouTube))).await;
    admitted.sort();

    for pair in admitted.windows(2) {
        assert!(pair[1].duration_since(pair[0]) >= interval);
    }
}

#[tokio::test]
async fn test_concurrent_acquires_across_tasks() {
    let interval = Duration::from_millis(50);
    let limiter = Arc::new(RateLimiter::new(RateLimitPolicy::new(interval)));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.acquire(Platform::Facebook).await })
        })
        .collect();

    let mut admitted = Vec::new();
    for handle in handles {
        admitted.push(handle.await.unwrap());
    }
    admitted.sort();

    for pair in admitted.windows(2) {
        assert!(pair[1].duration_since(pair[0]) >= interval);
    }
}

#[tokio::test]
async fn test_platforms_do_not_block_each_other() {
    let policy = RateLimitPolicy::new(Duration::from_millis(10))
        .with_interval(Platform::Instagram, Duration::from_secs(30));
    let limiter = RateLimiter::new(policy);

    limiter.acquire(Platform::Instagram).await;

    let started = Instant::now();
    limiter.acquire(Platform::YouTube).await;
    assert!(started.elapsed() < Duration::from_secs(1));

    // A pending Instagram wait must not hold up other platforms either.
    let pending = limiter.acquire(Platform::Instagram);
    let other = async {
        let started = Instant::now();
        limiter.acquire(Platform::Twitter).await;
        started.elapsed()
    };
    tokio::select! {
        _ = pending => panic!("instagram should still be waiting"),
        elapsed = other => assert!(elapsed < Duration::from_secs(1)),
    }
}

#[tokio::test]
async fn test_pipeline_spaces_calls_to_same_platform() -> anyhow::Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let interval = Duration::from_millis(80);
    let extractor = Arc::new(ScriptedExtractor::new(sample_metadata()));
    let pipeline = pipeline_with(
        extractor,
        RateLimitPolicy::new(interval),
        temp_dir.path().to_path_buf(),
    );

    let started = Instant::now();
    let (a, b) = tokio::join!(
        pipeline.fetch_metadata("https://www.youtube.com/watch?v=a"),
        pipeline.fetch_metadata("https://youtu.be/b"),
    );
    a?;
    b?;
    assert!(started.elapsed() >= interval);
    Ok(())
}

#[tokio::test]
async fn test_resolve_stream_url() -> anyhow::Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let extractor = Arc::new(ScriptedExtractor {
        stream_url: Some("https://cdn.example/stream.mp4".to_string()),
        ..Default::default()
    });
    let pipeline = pipeline_with(
        extractor.clone(),
        RateLimitPolicy::default(),
        temp_dir.path().to_path_buf(),
    );

    let stream = pipeline
        .resolve_stream_url("https://www.youtube.com/watch?v=abc", "", "720p")
        .await?;
    assert_eq!(stream, "https://cdn.example/stream.mp4");
    assert_eq!(
        extractor.selectors.lock().unwrap().as_slice(),
        ["bestvideo[height<=720]+bestaudio/best[height<=720]"]
    );
    Ok(())
}

#[tokio::test]
async fn test_resolve_stream_url_without_match() {
    let temp_dir = tempfile::tempdir().unwrap();
    let extractor = Arc::new(ScriptedExtractor::default());
    let pipeline = pipeline_with(
        extractor,
        RateLimitPolicy::default(),
        temp_dir.path().to_path_buf(),
    );

    let err = pipeline
        .resolve_stream_url("https://www.youtube.com/watch?v=abc", "mp4", "720p")
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::NoStreamFound(_)));
}

#[tokio::test]
async fn test_supported_platforms_excludes_generic() -> anyhow::Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let extractor = Arc::new(ScriptedExtractor {
        extractors: vec![
            "youtube".to_string(),
            "generic".to_string(),
            "instagram".to_string(),
        ],
        ..Default::default()
    });
    let pipeline = pipeline_with(
        extractor,
        RateLimitPolicy::default(),
        temp_dir.path().to_path_buf(),
    );

    assert_eq!(
        pipeline.supported_platforms().await?,
        vec!["youtube".to_string(), "instagram".to_string()]
    );
    Ok(())
}
