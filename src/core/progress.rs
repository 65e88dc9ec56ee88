use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;

/// Structured progress reported while media is being transferred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Downloading {
        filename: Option<String>,
        downloaded_bytes: u64,
        total_bytes: Option<u64>,
    },
    Finished {
        filename: Option<String>,
    },
}

impl ProgressEvent {
    pub fn status(&self) -> &'static str {
        match self {
            ProgressEvent::Downloading { .. } => "downloading",
            ProgressEvent::Finished { .. } => "finished",
        }
    }

    /// Percentage complete, when the total size is known and non-zero.
    pub fn percentage(&self) -> Option<f64> {
        match self {
            ProgressEvent::Downloading {
                downloaded_bytes,
                total_bytes: Some(total),
                ..
            } if *total > 0 => Some(*downloaded_bytes as f64 / *total as f64 * 100.0),
            ProgressEvent::Finished { .. } => Some(100.0),
            _ => None,
        }
    }
}

/// Receives progress events from an in-flight download.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgress;

impl ProgressObserver for SilentProgress {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

/// Renders progress to the terminal.
#[derive(Default)]
pub struct ConsoleProgress {
    state: Mutex<ConsoleState>,
}

#[derive(Default)]
struct ConsoleState {
    current_file: Option<String>,
    bar: Option<ProgressBar>,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self::default()
    }

    fn new_bar(total: Option<u64>) -> ProgressBar {
        match total {
            Some(total) if total > 0 => {
                let bar = ProgressBar::new(total);
                bar.set_style(
                    ProgressStyle::with_template("[{bar:50}] {msg} ({bytes}/{total_bytes})")
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("=>-"),
                );
                bar
            }
            _ => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(
                    ProgressStyle::with_template("{spinner} {bytes} downloaded")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                bar
            }
        }
    }
}

impl ProgressObserver for ConsoleProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        match event {
            ProgressEvent::Downloading {
                filename,
                downloaded_bytes,
                total_bytes,
            } => {
                if filename.is_some() && *filename != state.current_file {
                    if let Some(bar) = state.bar.take() {
                        bar.finish_and_clear();
                    }
                    state.current_file = filename.clone();
                    if let Some(name) = filename {
                        println!("Downloading: {}", name);
                    }
                }

                let bar = state.bar.get_or_insert_with(|| Self::new_bar(*total_bytes));
                if let Some(total) = total_bytes {
                    if bar.length() != Some(*total) && *total > 0 {
                        bar.set_length(*total);
                    }
                }
                bar.set_position(*downloaded_bytes);
                if let Some(percentage) = event.percentage() {
                    bar.set_message(format!("{:.1}%", percentage));
                }
            }
            // Merged downloads finish once per part; the caller reports the
            // overall result.
            ProgressEvent::Finished { .. } => {
                if let Some(bar) = state.bar.take() {
                    bar.set_message("100.0%");
                    bar.finish();
                }
            }
        }
    }
}
