use crate::core::extractor::BEST_FORMAT;
use crate::core::{
    Extractor, ExtractorError, ProgressEvent, ProgressObserver, TransferRequest, VideoMetadata,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

// Prefix yt-dlp puts in front of each JSON progress record on stdout.
const PROGRESS_MARKER: &str = "VIDFETCH-PROGRESS ";

const FORMAT_UNAVAILABLE: &str = "Requested format is not available";

/// Extractor backed by the `yt-dlp` command line program.
#[derive(Debug, Clone)]
pub struct YtDlpExtractor {
    binary: PathBuf,
}

impl YtDlpExtractor {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    async fn run(&self, args: &[&str]) -> Result<Vec<u8>, ExtractorError> {
        debug!("Running {} {:?}", self.binary.display(), args);
        let output = self.command().args(args).output().await.map_err(|e| {
            ExtractorError::new(format!(
                "Failed to run {}: {}",
                self.binary.display(),
                e
            ))
        })?;

        if !output.status.success() {
            return Err(failure_message(&output.stderr, output.status));
        }

        Ok(output.stdout)
    }
}

impl Default for YtDlpExtractor {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

#[async_trait]
impl Extractor for YtDlpExtractor {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn extract_info(&self, url: &str) -> Result<VideoMetadata, ExtractorError> {
        let stdout = self
            .run(&[
                "--dump-json",
                "--no-playlist",
                "--no-warnings",
                "-f",
                BEST_FORMAT,
                "--",
                url,
            ])
            .await?;

        Ok(serde_json::from_slice(&stdout)?)
    }

    async fn download(
        &self,
        url: &str,
        request: &TransferRequest,
        progress: &dyn ProgressObserver,
    ) -> Result<(), ExtractorError> {
        let output_template = escape_output_template(&request.output_path.to_string_lossy());
        let fragments = request.concurrent_fragments.to_string();
        let progress_template = format!("download:{}%(progress)j", PROGRESS_MARKER);

        let mut child = self
            .command()
            .args([
                "-f",
                request.format_selector.as_str(),
                "--concurrent-fragments",
                fragments.as_str(),
                "--no-playlist",
                "--no-warnings",
                "--newline",
                "--progress-template",
                progress_template.as_str(),
                "-o",
                output_template.as_str(),
                "--",
                url,
            ])
            .spawn()
            .map_err(|e| {
                ExtractorError::new(format!(
                    "Failed to run {}: {}",
                    self.binary.display(),
                    e
                ))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExtractorError::new("yt-dlp stdout was not captured"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ExtractorError::new("yt-dlp stderr was not captured"))?;

        let stderr_reader = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf).await;
            buf
        });

        // Titles echoed by yt-dlp follow the console encoding, which is not
        // always UTF-8.
        let mut segments = BufReader::new(stdout).split(b'\n');
        while let Some(raw) = segments.next_segment().await? {
            if let Some(event) = parse_progress_line(&String::from_utf8_lossy(&raw)) {
                progress.on_progress(&event);
            }
        }

        let status = child.wait().await?;
        let stderr = stderr_reader.await.unwrap_or_default();

        if !status.success() {
            return Err(failure_message(&stderr, status));
        }

        Ok(())
    }

    async fn resolve_stream_url(
        &self,
        url: &str,
        format_selector: &str,
    ) -> Result<Option<String>, ExtractorError> {
        let result = self
            .run(&[
                "-f",
                format_selector,
                "--get-url",
                "--no-playlist",
                "--no-warnings",
                "--",
                url,
            ])
            .await;

        match result {
            Ok(stdout) => Ok(String::from_utf8_lossy(&stdout)
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .map(str::to_string)),
            Err(e) if e.message.contains(FORMAT_UNAVAILABLE) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn list_extractors(&self) -> Result<Vec<String>, ExtractorError> {
        let stdout = self.run(&["--list-extractors"]).await?;
        Ok(String::from_utf8_lossy(&stdout)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct ProgressRecord {
    status: String,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    downloaded_bytes: Option<f64>,
    #[serde(default)]
    total_bytes: Option<f64>,
    #[serde(default)]
    total_bytes_estimate: Option<f64>,
}

/// Parse one line of `--progress-template` output into a progress event.
fn parse_progress_line(line: &str) -> Option<ProgressEvent> {
    let json = line.trim().strip_prefix(PROGRESS_MARKER)?;
    let record: ProgressRecord = serde_json::from_str(json).ok()?;

    match record.status.as_str() {
        "downloading" => Some(ProgressEvent::Downloading {
            filename: record.filename,
            downloaded_bytes: record.downloaded_bytes.map(bytes).unwrap_or(0),
            total_bytes: record.total_bytes.or(record.total_bytes_estimate).map(bytes),
        }),
        "finished" => Some(ProgressEvent::Finished {
            filename: record.filename,
        }),
        _ => None,
    }
}

fn bytes(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value as u64
    } else {
        0
    }
}

// `-o` is itself a template; a literal path must not be interpreted.
fn escape_output_template(path: &str) -> String {
    path.replace('%', "%%")
}

fn failure_message(stderr: &[u8], status: std::process::ExitStatus) -> ExtractorError {
    let stderr = String::from_utf8_lossy(stderr);
    let message = stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| line.starts_with("ERROR:"))
        .map(|line| line.trim_start_matches("ERROR:").trim().to_string())
        .or_else(|| {
            let trimmed = stderr.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| format!("yt-dlp exited with {}", status));
    ExtractorError::new(message)
}
