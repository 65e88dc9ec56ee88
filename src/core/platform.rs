use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Video platforms the fetcher knows how to pace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    YouTube,
    Instagram,
    TikTok,
    Twitter,
    Facebook,
}

// Host substrings checked in order. Matching is by substring, so
// subdomains match and so does any host that merely contains the text.
const HOST_PATTERNS: &[(&str, Platform)] = &[
    ("youtube.com", Platform::YouTube),
    ("youtu.be", Platform::YouTube),
    ("instagram.com", Platform::Instagram),
    ("tiktok.com", Platform::TikTok),
    ("twitter.com", Platform::Twitter),
    ("facebook.com", Platform::Facebook),
];

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::YouTube,
        Platform::Instagram,
        Platform::TikTok,
        Platform::Twitter,
        Platform::Facebook,
    ];

    /// Detect the platform from a URL's host, case-insensitively.
    ///
    /// Returns `None` for unparseable URLs, URLs without a host and hosts
    /// that match none of the known platforms.
    pub fn detect(url: &str) -> Option<Platform> {
        let parsed = Url::parse(url).ok()?;
        let host = parsed.host_str()?.to_ascii_lowercase();

        HOST_PATTERNS
            .iter()
            .find(|(pattern, _)| host.contains(pattern))
            .map(|(_, platform)| *platform)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::YouTube => "youtube",
            Platform::Instagram => "instagram",
            Platform::TikTok => "tiktok",
            Platform::Twitter => "twitter",
            Platform::Facebook => "facebook",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown platform: {}", s))
    }
}
