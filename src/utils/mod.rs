use crate::core::VideoMetadata;
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;
use url::Url;

pub const DEFAULT_TEMPLATE: &str = "{title}.{ext}";

static FORBIDDEN_TEMPLATE_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[<>:"/\\|?*]"#).expect("forbidden character pattern is valid")
});

/// True when `url` parses as an absolute URL with a scheme and a host.
pub fn validate_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => {
            !parsed.scheme().is_empty() && parsed.host_str().is_some_and(|h| !h.is_empty())
        }
        Err(_) => false,
    }
}

/// Rejects caller-supplied filename templates containing characters that are
/// invalid in filenames on common filesystems, and the bare `.` and `..`
/// directory names.
pub fn validate_template(template: &str) -> bool {
    !matches!(template, "." | "..") && !FORBIDDEN_TEMPLATE_CHARS.is_match(template)
}

pub fn sanitize_filename(filename: &str) -> String {
    // Remove or replace characters that are invalid in filenames
    filename
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' => '_',
            '/' | '\\' => '-',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Render an output filename from a template and the extractor's metadata.
///
/// Both `{title}` and yt-dlp style `%(title)s` placeholders are understood
/// for `title`, `id`, `uploader` and `ext`.
pub fn generate_output_filename(template: &str, metadata: &VideoMetadata) -> PathBuf {
    let title = sanitize_filename(metadata.title.as_deref().unwrap_or("video"));
    let id = sanitize_filename(metadata.id.as_deref().unwrap_or("unknown"));
    let uploader = sanitize_filename(metadata.uploader.as_deref().unwrap_or("Unknown"));
    let ext = sanitize_filename(metadata.ext.as_deref().unwrap_or("mp4"));

    let mut filename = template.to_string();
    for (key, value) in [
        ("title", title.as_str()),
        ("id", id.as_str()),
        ("uploader", uploader.as_str()),
        ("ext", ext.as_str()),
    ] {
        filename = filename
            .replace(&format!("{{{}}}", key), value)
            .replace(&format!("%({})s", key), value);
    }

    PathBuf::from(filename)
}
