use iced::{
    widget::{button, column, progress_bar, text, text_input},
    Element,
};

/// Main view state
pub struct DownloadView {
    pub youtube_url: String,
    pub status_message: String,
    /// 0.0 to 100.0
    pub download_progress: f32,
    pub is_downloading: bool,
}

impl Default for DownloadView {
    fn default() -> Self {
        Self {
            youtube_url: String::new(),
            status_message: "Progress: 0%".to_string(),
            download_progress: 0.0,
            is_downloading: false,
        }
    }
}

#[derive(Debug, Clone)]
pub enum DownloadMessage {
    UrlChanged(String),
    DownloadPressed,
}

impl DownloadView {
    pub fn update(&mut self, message: DownloadMessage) {
        match message {
            DownloadMessage::UrlChanged(url) => {
                self.youtube_url = url;
            }
            DownloadMessage::DownloadPressed => {
                // Will be handled by the app
            }
        }
    }

    pub fn view(&self) -> Element<'_, DownloadMessage> {
        let trigger = (!self.is_downloading).then_some(DownloadMessage::DownloadPressed);

        column![
            text("YouTube URL:").size(16),
            text_input("https://www.youtube.com/watch?v=...", &self.youtube_url)
                .on_input(DownloadMessage::UrlChanged)
                .padding(10),
            button("Download MP3")
                .on_press_maybe(trigger)
                .padding([10, 20]),
            text(&self.status_message).size(14),
            progress_bar(0.0..=100.0, self.download_progress),
        ]
        .padding(20)
        .spacing(10)
        .into()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Error,
}

/// A blocking message box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub body: String,
}

impl Notification {
    pub fn info(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            title: title.into(),
            body: body.into(),
        }
    }

    pub fn error(body: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            title: "Error".to_string(),
            body: body.into(),
        }
    }
}

pub async fn show_notification(notification: Notification) {
    let level = match notification.level {
        NotificationLevel::Info => rfd::MessageLevel::Info,
        NotificationLevel::Error => rfd::MessageLevel::Error,
    };

    rfd::AsyncMessageDialog::new()
        .set_level(level)
        .set_title(&notification.title)
        .set_description(&notification.body)
        .set_buttons(rfd::MessageButtons::Ok)
        .show()
        .await;
}
