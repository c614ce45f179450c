use crate::application::{DownloadCoordinator, DownloadEvent};
use crate::domain::{AppError, DownloadPhase, DownloadRequest};
use crate::ui::{show_notification, DownloadMessage, DownloadView, Notification};
use crate::utils::progress_label;
use iced::Task;
use std::path::PathBuf;
use tracing::{debug, info, warn};

pub struct DownloadApp {
    view: DownloadView,
    coordinator: DownloadCoordinator,
    phase: DownloadPhase,
    // URL captured at trigger time, waiting for a destination
    pending_url: Option<String>,
}

impl DownloadApp {
    pub fn new(coordinator: DownloadCoordinator) -> Self {
        Self {
            view: DownloadView::default(),
            coordinator,
            phase: DownloadPhase::Idle,
            pending_url: None,
        }
    }

    pub fn view_state(&self) -> &DownloadView {
        &self.view
    }

    /// Applies `message` to the state and returns the side effect to run, if any.
    pub fn handle(&mut self, message: Message) -> Option<Effect> {
        match message {
            Message::UiMessage(DownloadMessage::DownloadPressed) => self.on_trigger(),
            Message::UiMessage(ui_msg) => {
                self.view.update(ui_msg);
                None
            }
            Message::DirectorySelected(directory) => self.on_directory_selected(directory),
            Message::Download(event) => self.on_download_event(event),
            Message::NotificationClosed => None,
        }
    }

    fn on_trigger(&mut self) -> Option<Effect> {
        if self.phase != DownloadPhase::Idle {
            debug!("Trigger ignored while {:?}", self.phase);
            return None;
        }

        self.enter(DownloadPhase::Validating);
        let url = self.view.youtube_url.trim();
        if url.is_empty() {
            self.enter(DownloadPhase::Idle);
            return Some(Effect::Notify(Notification::error(
                AppError::EmptyUrl.to_string(),
            )));
        }

        self.pending_url = Some(url.to_string());
        self.enter(DownloadPhase::AwaitingDirectory);
        Some(Effect::PickDirectory)
    }

    fn on_directory_selected(&mut self, directory: Option<PathBuf>) -> Option<Effect> {
        if self.phase != DownloadPhase::AwaitingDirectory {
            return None;
        }

        let url = self.pending_url.take();
        match (url, directory) {
            (Some(url), Some(directory)) => {
                self.view.download_progress = 0.0;
                self.view.status_message = "Starting download...".to_string();
                self.enter(DownloadPhase::Running);
                Some(Effect::StartDownload(DownloadRequest::new(url, directory)))
            }
            _ => {
                // User cancelled the picker
                self.enter(DownloadPhase::Idle);
                None
            }
        }
    }

    fn on_download_event(&mut self, event: DownloadEvent) -> Option<Effect> {
        if self.phase != DownloadPhase::Running {
            debug!("Dropping {:?} while {:?}", event, self.phase);
            return None;
        }

        match event {
            DownloadEvent::Progress(percent) => {
                self.view.download_progress = percent;
                self.view.status_message = progress_label(percent);
                None
            }
            DownloadEvent::Converting => {
                self.view.status_message = "Converting to MP3...".to_string();
                None
            }
            DownloadEvent::Completed => {
                self.enter(DownloadPhase::Succeeded);
                self.view.download_progress = 100.0;
                self.view.status_message = "Completed!".to_string();
                self.enter(DownloadPhase::Idle);
                Some(Effect::Notify(Notification::info(
                    "Success",
                    "Download and conversion completed successfully!",
                )))
            }
            DownloadEvent::Failed(error) => {
                self.enter(DownloadPhase::Failed);
                warn!("Request failed: {}", error);
                self.enter(DownloadPhase::Idle);
                Some(Effect::Notify(Notification::error(format!(
                    "An error occurred:\n{}",
                    error
                ))))
            }
        }
    }

    fn enter(&mut self, phase: DownloadPhase) {
        debug!("{:?} -> {:?}", self.phase, phase);
        self.phase = phase;
        self.view.is_downloading = phase != DownloadPhase::Idle;
    }

    fn perform(&self, effect: Effect) -> Task<Message> {
        match effect {
            Effect::Notify(notification) => {
                Task::perform(show_notification(notification), |_| {
                    Message::NotificationClosed
                })
            }
            Effect::PickDirectory => {
                let coordinator = self.coordinator.clone();
                Task::perform(
                    async move { coordinator.choose_directory().await },
                    Message::DirectorySelected,
                )
            }
            Effect::StartDownload(request) => {
                info!(
                    "Starting {} -> {}",
                    request.source_url,
                    request.destination().display()
                );
                // Worker thread pushes events; iced drains them on the event loop
                Task::run(
                    self.coordinator.download_stream(request),
                    Message::Download,
                )
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    UiMessage(DownloadMessage),
    /// `None` when the picker was dismissed
    DirectorySelected(Option<PathBuf>),
    Download(DownloadEvent),
    NotificationClosed,
}

/// Side effects requested by a state transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Notify(Notification),
    PickDirectory,
    StartDownload(DownloadRequest),
}

pub fn update(app: &mut DownloadApp, message: Message) -> Task<Message> {
    match app.handle(message) {
        Some(effect) => app.perform(effect),
        None => Task::none(),
    }
}

pub fn view(app: &DownloadApp) -> iced::Element<'_, Message> {
    app.view_state().view().map(Message::UiMessage)
}
