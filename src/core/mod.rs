pub mod error;
pub mod extractor;
pub mod metadata;
pub mod pipeline;
pub mod platform;
pub mod progress;
pub mod rate_limiter;

pub use error::{ExtractorError, FetchError};
pub use extractor::{Extractor, TransferRequest};
pub use metadata::{DownloadResult, FormatDescriptor, VideoFormat, VideoInfo, VideoMetadata};
pub use pipeline::Pipeline;
pub use platform::Platform;
pub use progress::{ConsoleProgress, ProgressEvent, ProgressObserver, SilentProgress};
pub use rate_limiter::{RateLimitPolicy, RateLimiter};
