mod app;
mod application;
mod config;
mod domain;
mod downloader;
mod ui;
mod utils;

use std::sync::Arc;

use iced::{window, Size};
use tracing::{info, warn};

use crate::application::DownloadCoordinator;
use crate::config::{Config, ToolPaths};
use crate::downloader::YtDlp;

fn main() -> iced::Result {
    let (config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    utils::init_logging(&config.log.filter);
    if let Some(e) = config_error {
        warn!("{}; using defaults", e);
    }

    let tools = ToolPaths::resolve(&config.tools);
    info!(
        "yt-dlp: {}, ffmpeg: {}",
        tools.yt_dlp.display(),
        tools.ffmpeg.display()
    );
    let coordinator = DownloadCoordinator::new(Arc::new(YtDlp::new(tools)));

    let icon_data = include_bytes!("../assets/icon.png");

    let icon = match image::load_from_memory(icon_data) {
        Ok(img) => {
            let rgba = img.to_rgba8();
            let (width, height) = rgba.dimensions();
            window::icon::from_rgba(rgba.into_raw(), width, height).ok()
        }
        Err(_) => None,
    };

    iced::application(
        move || app::DownloadApp::new(coordinator.clone()),
        app::update,
        app::view,
    )
    .title("YouTube to MP3 Downloader")
    .window(window::Settings {
        size: Size::new(420.0, 250.0),
        icon,
        ..Default::default()
    })
    .run()
}
