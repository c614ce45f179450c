pub mod models;
pub mod ytdlp;

pub use models::{DownloadOptions, PostProcessor, ProgressEvent};
pub use ytdlp::{DownloadError, YtDlp};

/// Blocking media download entry point.
///
/// `download` runs to completion on the calling thread and reports progress
/// through `on_progress` from that same thread.
pub trait MediaDownloader: Send + Sync {
    fn download(
        &self,
        options: &DownloadOptions,
        url: &str,
        on_progress: &mut dyn FnMut(ProgressEvent),
    ) -> Result<(), DownloadError>;
}
