use std::path::{Path, PathBuf};

/// yt-dlp format selector used for every request.
pub const FORMAT_SELECTOR: &str = "bestaudio/best";
/// File name part of the output template, expanded by yt-dlp.
pub const OUTPUT_NAME_TEMPLATE: &str = "%(title)s.%(ext)s";
pub const AUDIO_CODEC: &str = "mp3";
pub const AUDIO_BITRATE_KBPS: u32 = 192;

/// One user-initiated download. Lives only until the worker reports back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub source_url: String,
    pub destination_directory: PathBuf,
}

impl DownloadRequest {
    pub fn new(source_url: impl Into<String>, destination_directory: impl Into<PathBuf>) -> Self {
        Self {
            source_url: source_url.into(),
            destination_directory: destination_directory.into(),
        }
    }

    /// `<destination>/%(title)s.%(ext)s`
    pub fn output_template(&self) -> PathBuf {
        self.destination_directory.join(OUTPUT_NAME_TEMPLATE)
    }

    pub fn destination(&self) -> &Path {
        &self.destination_directory
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadPhase {
    Idle,
    Validating,
    AwaitingDirectory,
    Running,
    Succeeded,
    Failed,
}
