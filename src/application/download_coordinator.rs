use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use futures::{stream::BoxStream, StreamExt};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::{
    domain::{AppError, DownloadRequest},
    downloader::{DownloadOptions, MediaDownloader, ProgressEvent},
};

#[derive(Debug, Clone, PartialEq)]
pub enum DownloadEvent {
    /// Percentage in `0.0..=100.0`
    Progress(f32),
    /// Download finished, post-processing has started.
    Converting,
    Completed,
    Failed(AppError),
}

#[derive(Clone)]
pub struct DownloadCoordinator {
    downloader: Arc<dyn MediaDownloader>,
}

impl DownloadCoordinator {
    pub fn new(downloader: Arc<dyn MediaDownloader>) -> Self {
        Self { downloader }
    }

    pub async fn choose_directory(&self) -> Option<PathBuf> {
        rfd::AsyncFileDialog::new()
            .set_title("Select Download Folder")
            .pick_folder()
            .await
            .map(|handle| handle.path().to_path_buf())
    }

    /// Runs `request` on a dedicated worker thread. The returned stream yields
    /// progress as it happens and always ends with `Completed` or `Failed`.
    pub fn download_stream(&self, request: DownloadRequest) -> BoxStream<'static, DownloadEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let downloader = Arc::clone(&self.downloader);

        let spawned = std::thread::Builder::new()
            .name("download-worker".to_string())
            .spawn(move || {
                let outcome = run_download(downloader.as_ref(), &request, &tx);
                let _ = tx.send(outcome);
            });

        if let Err(e) = spawned {
            warn!("Could not spawn download worker: {}", e);
            let failed = DownloadEvent::Failed(AppError::WorkerSpawn(e.to_string()));
            return futures::stream::once(async move { failed }).boxed();
        }

        futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        })
        .boxed()
    }
}

/// Executes on the worker thread. Returns the terminal event.
fn run_download(
    downloader: &dyn MediaDownloader,
    request: &DownloadRequest,
    tx: &mpsc::UnboundedSender<DownloadEvent>,
) -> DownloadEvent {
    let options = DownloadOptions::for_request(request);
    info!(
        "Downloading {} into {}",
        request.source_url,
        request.destination().display()
    );

    let mut on_progress = |event: ProgressEvent| {
        let message = match event {
            ProgressEvent::Downloading { .. } => event.percent().map(DownloadEvent::Progress),
            ProgressEvent::Finished => Some(DownloadEvent::Converting),
        };
        if let Some(message) = message {
            let _ = tx.send(message);
        }
    };

    let result = catch_unwind(AssertUnwindSafe(|| {
        downloader.download(&options, &request.source_url, &mut on_progress)
    }));

    match result {
        Ok(Ok(())) => {
            info!("Finished {}", request.source_url);
            DownloadEvent::Completed
        }
        Ok(Err(e)) => {
            warn!("Download of {} failed: {}", request.source_url, e);
            DownloadEvent::Failed(AppError::Download(e.to_string()))
        }
        Err(_) => {
            warn!("Download worker panicked for {}", request.source_url);
            DownloadEvent::Failed(AppError::WorkerPanicked)
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{Outcome, ScriptedDownloader};
    use super::*;
    use crate::downloader::PostProcessor;

    fn downloading(downloaded_bytes: u64, total_bytes: Option<u64>) -> ProgressEvent {
        ProgressEvent::Downloading {
            downloaded_bytes,
            total_bytes,
        }
    }

    async fn collect(
        downloader: Arc<ScriptedDownloader>,
        request: DownloadRequest,
    ) -> Vec<DownloadEvent> {
        DownloadCoordinator::new(downloader)
            .download_stream(request)
            .collect()
            .await
    }

    #[tokio::test]
    async fn test_invokes_downloader_once_with_fixed_options() {
        let downloader = Arc::new(ScriptedDownloader::new(Vec::new(), Outcome::Succeed));
        let request = DownloadRequest::new("https://example.com/video", "/tmp/out");

        let events = collect(downloader.clone(), request).await;
        assert_eq!(events, vec![DownloadEvent::Completed]);

        let calls = downloader.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (options, url) = &calls[0];
        assert_eq!(url, "https://example.com/video");
        assert!(options.output_template.starts_with("/tmp/out"));
        assert_eq!(
            options.post_processor,
            PostProcessor::ExtractAudio {
                codec: "mp3".to_string(),
                quality_kbps: 192,
            }
        );
    }

    #[tokio::test]
    async fn test_maps_progress_and_skips_unknown_totals() {
        let downloader = Arc::new(ScriptedDownloader::new(
            vec![
                downloading(10, None),
                downloading(25, Some(100)),
                downloading(30, Some(0)),
                downloading(50, Some(100)),
                ProgressEvent::Finished,
            ],
            Outcome::Succeed,
        ));

        let events = collect(
            downloader,
            DownloadRequest::new("https://example.com/video", "/tmp/out"),
        )
        .await;

        assert_eq!(
            events,
            vec![
                DownloadEvent::Progress(25.0),
                DownloadEvent::Progress(50.0),
                DownloadEvent::Converting,
                DownloadEvent::Completed,
            ]
        );
    }

    #[tokio::test]
    async fn test_failure_carries_message() {
        let downloader = Arc::new(ScriptedDownloader::new(
            vec![downloading(5, Some(10))],
            Outcome::Fail("Unable to download webpage".to_string()),
        ));

        let events = collect(
            downloader,
            DownloadRequest::new("https://example.com/video", "/tmp/out"),
        )
        .await;

        assert_eq!(
            events,
            vec![
                DownloadEvent::Progress(50.0),
                DownloadEvent::Failed(AppError::Download(
                    "Unable to download webpage".to_string()
                )),
            ]
        );
    }

    #[tokio::test]
    async fn test_panic_becomes_failure() {
        let downloader = Arc::new(ScriptedDownloader::new(Vec::new(), Outcome::Panic));

        let events = collect(
            downloader,
            DownloadRequest::new("https://example.com/video", "/tmp/out"),
        )
        .await;

        assert_eq!(events, vec![DownloadEvent::Failed(AppError::WorkerPanicked)]);
    }
}
