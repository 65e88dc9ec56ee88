pub mod ytdlp;

pub use ytdlp::YtDlpExtractor;
