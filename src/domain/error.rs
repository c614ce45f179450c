use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("Please enter a YouTube URL.")]
    EmptyUrl,

    #[error("{0}")]
    Download(String),

    #[error("Download worker panicked")]
    WorkerPanicked,

    #[error("Failed to start download worker: {0}")]
    WorkerSpawn(String),
}
