use std::path::PathBuf;

use serde::Deserialize;

use crate::domain::{
    model::{AUDIO_BITRATE_KBPS, AUDIO_CODEC, FORMAT_SELECTOR},
    DownloadRequest,
};

/// Post-processing step run by the download tool once the media is on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostProcessor {
    ExtractAudio { codec: String, quality_kbps: u32 },
}

/// Everything the download tool needs to know about one request,
/// apart from the URL and the progress callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    pub format: String,
    pub output_template: PathBuf,
    pub post_processor: PostProcessor,
    pub quiet: bool,
    pub no_warnings: bool,
    pub no_playlist: bool,
}

impl DownloadOptions {
    pub fn for_request(request: &DownloadRequest) -> Self {
        Self {
            format: FORMAT_SELECTOR.to_string(),
            output_template: request.output_template(),
            post_processor: PostProcessor::ExtractAudio {
                codec: AUDIO_CODEC.to_string(),
                quality_kbps: AUDIO_BITRATE_KBPS,
            },
            quiet: true,
            no_warnings: true,
            no_playlist: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressEvent {
    Downloading {
        downloaded_bytes: u64,
        /// Exact size if known, otherwise the tool's estimate.
        total_bytes: Option<u64>,
    },
    Finished,
}

impl ProgressEvent {
    /// Percentage in `0.0..=100.0`, or `None` when the total is unknown or zero.
    pub fn percent(&self) -> Option<f32> {
        match *self {
            ProgressEvent::Downloading {
                downloaded_bytes,
                total_bytes: Some(total),
            } if total > 0 => Some(downloaded_bytes as f32 / total as f32 * 100.0),
            _ => None,
        }
    }
}

/// Progress dictionary as printed by `--progress-template "%(progress)j"`
#[derive(Debug, Clone, Deserialize)]
pub struct RawProgress {
    pub status: String,
    #[serde(default)]
    pub downloaded_bytes: Option<f64>,
    #[serde(default)]
    pub total_bytes: Option<f64>,
    #[serde(default)]
    pub total_bytes_estimate: Option<f64>,
}

impl RawProgress {
    pub fn into_event(self) -> Option<ProgressEvent> {
        match self.status.as_str() {
            "downloading" => Some(ProgressEvent::Downloading {
                downloaded_bytes: self.downloaded_bytes.map(to_bytes).unwrap_or(0),
                // A zero total counts as unknown, so the estimate is used instead
                total_bytes: self
                    .total_bytes
                    .filter(|total| *total > 0.0)
                    .or(self.total_bytes_estimate)
                    .map(to_bytes),
            }),
            "finished" => Some(ProgressEvent::Finished),
            _ => None,
        }
    }
}

fn to_bytes(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value as u64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_for_request() {
        let request = DownloadRequest::new("https://example.com/video", "/tmp/out");
        let options = DownloadOptions::for_request(&request);

        assert_eq!(options.format, "bestaudio/best");
        assert_eq!(options.output_template, PathBuf::from("/tmp/out/%(title)s.%(ext)s"));
        assert_eq!(
            options.post_processor,
            PostProcessor::ExtractAudio {
                codec: "mp3".to_string(),
                quality_kbps: 192,
            }
        );
        assert!(options.quiet);
        assert!(options.no_warnings);
    }

    #[test]
    fn test_percent() {
        let half = ProgressEvent::Downloading {
            downloaded_bytes: 50,
            total_bytes: Some(100),
        };
        assert_eq!(half.percent(), Some(50.0));

        let zero_total = ProgressEvent::Downloading {
            downloaded_bytes: 50,
            total_bytes: Some(0),
        };
        assert_eq!(zero_total.percent(), None);

        let unknown = ProgressEvent::Downloading {
            downloaded_bytes: 50,
            total_bytes: None,
        };
        assert_eq!(unknown.percent(), None);
        assert_eq!(ProgressEvent::Finished.percent(), None);
    }

    #[test]
    fn test_raw_progress_prefers_exact_total() {
        let raw: RawProgress = serde_json::from_str(
            r#"{"status":"downloading","downloaded_bytes":1024,"total_bytes":4096,"total_bytes_estimate":5000.5}"#,
        )
        .unwrap();

        assert_eq!(
            raw.into_event(),
            Some(ProgressEvent::Downloading {
                downloaded_bytes: 1024,
                total_bytes: Some(4096),
            })
        );
    }

    #[test]
    fn test_raw_progress_falls_back_to_estimate() {
        let raw: RawProgress = serde_json::from_str(
            r#"{"status":"downloading","downloaded_bytes":10,"total_bytes":null,"total_bytes_estimate":40.7}"#,
        )
        .unwrap();

        assert_eq!(
            raw.into_event(),
            Some(ProgressEvent::Downloading {
                downloaded_bytes: 10,
                total_bytes: Some(40),
            })
        );
    }

    #[test]
    fn test_raw_progress_zero_total_uses_estimate() {
        let raw: RawProgress = serde_json::from_str(
            r#"{"status":"downloading","downloaded_bytes":50,"total_bytes":0,"total_bytes_estimate":100}"#,
        )
        .unwrap();

        let event = raw.into_event().unwrap();
        assert_eq!(
            event,
            ProgressEvent::Downloading {
                downloaded_bytes: 50,
                total_bytes: Some(100),
            }
        );
        assert_eq!(event.percent(), Some(50.0));
    }

    #[test]
    fn test_raw_progress_other_statuses() {
        let finished: RawProgress = serde_json::from_str(r#"{"status":"finished"}"#).unwrap();
        assert_eq!(finished.into_event(), Some(ProgressEvent::Finished));

        let error: RawProgress = serde_json::from_str(r#"{"status":"error"}"#).unwrap();
        assert_eq!(error.into_event(), None);
    }
}
