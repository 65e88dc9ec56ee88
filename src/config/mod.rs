use crate::core::{Platform, RateLimitPolicy};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "vidfetch.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub output_dir: PathBuf,
    pub bind_address: String,
    pub cors_origins: Vec<String>,
    pub ytdlp_path: PathBuf,
    pub inbound_limit: InboundLimitConfig,
    pub rate_limits: RateLimitConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("downloads"),
            bind_address: "0.0.0.0:3000".to_string(),
            cors_origins: vec!["http://localhost:5173".to_string()],
            ytdlp_path: PathBuf::from("yt-dlp"),
            inbound_limit: InboundLimitConfig::default(),
            rate_limits: RateLimitConfig::default(),
        }
    }
}

/// Global budget for inbound HTTP requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InboundLimitConfig {
    pub max_requests: u32,
    pub window_secs: u64,
}

impl Default for InboundLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_secs: 60,
        }
    }
}

/// Minimum seconds between outbound calls, per platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub default_interval_secs: f64,
    pub platforms: BTreeMap<Platform, f64>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            default_interval_secs: 1.0,
            platforms: BTreeMap::from([
                (Platform::YouTube, 1.0),
                (Platform::Instagram, 2.0),
                (Platform::TikTok, 1.5),
                (Platform::Twitter, 1.0),
                (Platform::Facebook, 2.0),
            ]),
        }
    }
}

impl From<&RateLimitConfig> for RateLimitPolicy {
    fn from(config: &RateLimitConfig) -> Self {
        config.platforms.iter().fold(
            RateLimitPolicy::new(interval(config.default_interval_secs)),
            |policy, (platform, secs)| policy.with_interval(*platform, interval(*secs)),
        )
    }
}

fn interval(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
}

impl Config {
    /// Load configuration from `path`, or from `vidfetch.toml` in the working
    /// directory when present, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Apply `CORS_ORIGINS`, `BIND_ADDRESS`, `PORT`, `VIDFETCH_OUTPUT_DIR`
    /// and `YTDLP_PATH` overrides.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(origins) = lookup("CORS_ORIGINS") {
            self.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(bind) = lookup("BIND_ADDRESS") {
            self.bind_address = bind;
        }
        if let Some(port) = lookup("PORT") {
            let host = self
                .bind_address
                .rsplit_once(':')
                .map(|(host, _)| host)
                .unwrap_or("0.0.0.0");
            self.bind_address = format!("{}:{}", host, port.trim());
        }
        if let Some(dir) = lookup("VIDFETCH_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("YTDLP_PATH") {
            self.ytdlp_path = PathBuf::from(path);
        }
    }

    pub fn rate_limit_policy(&self) -> RateLimitPolicy {
        RateLimitPolicy::from(&self.rate_limits)
    }
}
