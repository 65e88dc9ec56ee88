pub mod cli;
pub mod config;
pub mod core;
pub mod extractors;
pub mod server;
pub mod utils;

pub use crate::core::{
    DownloadResult, Extractor, FetchError, FormatDescriptor, Pipeline, Platform, RateLimitPolicy,
    RateLimiter, VideoInfo, VideoMetadata,
};
pub use extractors::YtDlpExtractor;
