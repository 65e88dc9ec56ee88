use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// Raw metadata as reported by an extractor.
///
/// Every field is optional on the wire; missing or null keys deserialize to
/// `None`/empty rather than failing. Numeric fields accept any JSON number
/// and treat anything else as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoMetadata {
    pub id: Option<String>,
    pub title: Option<String>,
    pub uploader: Option<String>,
    pub upload_date: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub duration: Option<f64>,
    #[serde(deserialize_with = "lenient_u64")]
    pub view_count: Option<u64>,
    #[serde(deserialize_with = "lenient_u64")]
    pub like_count: Option<u64>,
    pub thumbnail: Option<String>,
    /// Human readable descriptor of the selected format(s).
    pub format: Option<String>,
    /// Extension of the selected (merged) output.
    pub ext: Option<String>,
    /// Direct stream URL, when the extractor resolved a single one.
    pub url: Option<String>,
    pub formats: Vec<VideoFormat>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoFormat {
    pub format_id: Option<String>,
    pub url: Option<String>,
    pub ext: Option<String>,
    pub format_note: Option<String>,
    #[serde(deserialize_with = "lenient_u32")]
    pub width: Option<u32>,
    #[serde(deserialize_with = "lenient_u32")]
    pub height: Option<u32>,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
    #[serde(deserialize_with = "lenient_u64")]
    pub filesize: Option<u64>,
    #[serde(deserialize_with = "lenient_u64")]
    pub filesize_approx: Option<u64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub tbr: Option<f64>, // total bitrate
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_f64()).filter(|n| n.is_finite()))
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_f64(deserializer)?
        .filter(|n| *n >= 0.0)
        .map(|n| n as u64))
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_u64(deserializer)?.and_then(|n| u32::try_from(n).ok()))
}

/// One entry of the available-formats list returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatDescriptor {
    pub format: String,
    pub quality: String,
    /// Size in bytes, 0 when unknown.
    pub filesize: u64,
}

impl From<&VideoFormat> for FormatDescriptor {
    fn from(f: &VideoFormat) -> Self {
        let quality = match (&f.format_note, f.height) {
            (Some(note), _) if !note.is_empty() => note.clone(),
            (_, Some(height)) => format!("{}p", height),
            _ => "unknown".to_string(),
        };

        Self {
            format: f.ext.clone().unwrap_or_else(|| "unknown".to_string()),
            quality,
            filesize: f.filesize.unwrap_or(0),
        }
    }
}

/// Metadata-only query result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub url: String,
    pub title: String,
    pub thumbnail: Option<String>,
    pub duration: Option<u64>,
    pub formats: Vec<FormatDescriptor>,
}

impl VideoInfo {
    pub fn from_metadata(url: &str, metadata: &VideoMetadata) -> Self {
        Self {
            url: url.to_string(),
            title: metadata.title.clone().unwrap_or_default(),
            thumbnail: metadata.thumbnail.clone(),
            duration: metadata.duration.map(seconds),
            formats: metadata.formats.iter().map(FormatDescriptor::from).collect(),
        }
    }
}

/// Outcome of a completed download.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadResult {
    pub title: Option<String>,
    pub uploader: Option<String>,
    pub upload_date: Option<String>,
    pub duration: Option<u64>,
    pub view_count: Option<u64>,
    pub like_count: Option<u64>,
    pub format: Option<String>,
    pub filepath: PathBuf,
}

impl DownloadResult {
    pub fn from_metadata(metadata: &VideoMetadata, filepath: PathBuf) -> Self {
        Self {
            title: metadata.title.clone(),
            uploader: metadata.uploader.clone(),
            upload_date: metadata.upload_date.clone(),
            duration: metadata.duration.map(seconds),
            view_count: metadata.view_count,
            like_count: metadata.like_count,
            format: metadata.format.clone(),
            filepath,
        }
    }
}

fn seconds(duration: f64) -> u64 {
    if duration.is_finite() && duration > 0.0 {
        duration.round() as u64
    } else {
        0
    }
}
