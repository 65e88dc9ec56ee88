use crate::config::Config;
use crate::core::{ConsoleProgress, Pipeline, RateLimiter};
use crate::extractors::YtDlpExtractor;
use crate::server;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

#[derive(Parser)]
#[command(name = "vidfetch")]
#[command(about = "Rate-limited video downloader and metadata API")]
#[command(version)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Download a video to the output directory
    Download {
        /// URL to download
        #[arg(value_name = "URL")]
        url: String,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output filename template, e.g. "{uploader} - {title}.{ext}"
        #[arg(short = 't', long)]
        output_template: Option<String>,
    },
    /// Show metadata and available formats without downloading
    Info {
        #[arg(value_name = "URL")]
        url: String,
    },
    /// List the site extractors known to yt-dlp
    Platforms,
    /// Serve the HTTP API
    Serve {
        /// Address to bind, overriding the configuration
        #[arg(long)]
        bind: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let mut config = Config::load(self.config.as_deref())?;
        debug!("Loaded configuration: {:?}", config);

        match self.command {
            Command::Download {
                url,
                output,
                output_template,
            } => {
                if let Some(output) = output {
                    config.output_dir = output;
                }
                let pipeline = build_pipeline(&config).with_progress(Arc::new(ConsoleProgress::new()));

                println!("Output directory: {}", config.output_dir.display());

                let result = pipeline.download(&url, output_template.as_deref()).await?;
                println!("Download completed!");

                println!("Title: {}", result.title.as_deref().unwrap_or("unknown"));
                if let Some(uploader) = &result.uploader {
                    println!("Uploader: {}", uploader);
                }
                if let Some(duration) = result.duration {
                    println!("Duration: {}s", duration);
                }
                if let Some(view_count) = result.view_count {
                    println!("Views: {}", view_count);
                }
                println!("Saved to: {}", result.filepath.display());
            }
            Command::Info { url } => {
                let info = build_pipeline(&config).fetch_metadata(&url).await?;

                println!("Title: {}", info.title);
                if let Some(duration) = info.duration {
                    println!("Duration: {}s", duration);
                }
                if let Some(thumbnail) = &info.thumbnail {
                    println!("Thumbnail: {}", thumbnail);
                }
                println!("Available formats: {}", info.formats.len());
                for (i, format) in info.formats.iter().enumerate() {
                    println!(
                        "  {}: {} - {} ({} bytes)",
                        i + 1,
                        format.format,
                        format.quality,
                        format.filesize
                    );
                }
            }
            Command::Platforms => {
                for platform in build_pipeline(&config).supported_platforms().await? {
                    println!("{}", platform);
                }
            }
            Command::Serve { bind } => {
                if let Some(bind) = bind {
                    config.bind_address = bind;
                }
                let pipeline = Arc::new(build_pipeline(&config));
                server::serve(&config, pipeline).await?;
            }
        }

        Ok(())
    }
}

pub fn build_pipeline(config: &Config) -> Pipeline {
    let extractor = Arc::new(YtDlpExtractor::new(config.ytdlp_path.clone()));
    let limiter = Arc::new(RateLimiter::new(config.rate_limit_policy()));
    Pipeline::new(extractor, limiter, config.output_dir.clone())
}
