use std::ffi::OsString;
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{mpsc, LazyLock};
use std::thread::{self, JoinHandle};

use regex::Regex;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{models::RawProgress, DownloadOptions, MediaDownloader, PostProcessor, ProgressEvent};
use crate::config::ToolPaths;

/// Prefix yt-dlp puts in front of every progress dictionary we ask it to print.
const PROGRESS_MARKER: &str = "[progress]";

static ERROR_LINE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^ERROR:\s*(.+)$").ok());

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Failed to launch {}: {}", .program.display(), .source)]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Failed(String),

    #[error("yt-dlp exited with {0}")]
    Exited(ExitStatus),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Drives the `yt-dlp` executable as a child process.
#[derive(Debug, Clone)]
pub struct YtDlp {
    tools: ToolPaths,
}

impl YtDlp {
    pub fn new(tools: ToolPaths) -> Self {
        Self { tools }
    }

    pub fn build_args(&self, options: &DownloadOptions, url: &str) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-f".into(),
            options.format.clone().into(),
            "-o".into(),
            options.output_template.clone().into_os_string(),
        ];

        match &options.post_processor {
            PostProcessor::ExtractAudio {
                codec,
                quality_kbps,
            } => {
                args.push("--extract-audio".into());
                args.push("--audio-format".into());
                args.push(codec.clone().into());
                args.push("--audio-quality".into());
                args.push(format!("{}K", quality_kbps).into());
            }
        }

        args.push("--ffmpeg-location".into());
        args.push(self.tools.ffmpeg.clone().into_os_string());

        if options.no_playlist {
            args.push("--no-playlist".into());
        }
        if options.quiet {
            args.push("--quiet".into());
        }
        if options.no_warnings {
            args.push("--no-warnings".into());
        }

        // --progress keeps the progress lines coming even with --quiet
        args.push("--progress".into());
        args.push("--newline".into());
        args.push("--progress-template".into());
        args.push(format!("download:{}%(progress)j", PROGRESS_MARKER).into());

        args.push("--".into());
        args.push(url.into());
        args
    }
}

impl MediaDownloader for YtDlp {
    fn download(
        &self,
        options: &DownloadOptions,
        url: &str,
        on_progress: &mut dyn FnMut(ProgressEvent),
    ) -> Result<(), DownloadError> {
        let program = &self.tools.yt_dlp;
        info!("Running {} for {}", program.display(), url);

        let mut child = Command::new(program)
            .args(self.build_args(options, url))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| DownloadError::Launch {
                program: program.clone(),
                source,
            })?;

        // Both pipes are drained on their own threads; the callback only ever
        // runs here, on the caller's thread.
        let (tx, rx) = mpsc::channel::<String>();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            match spawn_reader("yt-dlp-stdout", stdout, tx.clone()) {
                Ok(reader) => readers.push(reader),
                Err(e) => return Err(abort_child(&mut child, e)),
            }
        }
        if let Some(stderr) = child.stderr.take() {
            match spawn_reader("yt-dlp-stderr", stderr, tx.clone()) {
                Ok(reader) => readers.push(reader),
                Err(e) => return Err(abort_child(&mut child, e)),
            }
        }
        drop(tx);

        let mut last_error = None;
        for line in rx {
            debug!("yt-dlp: {}", line);
            if let Some(event) = parse_progress_line(&line) {
                on_progress(event);
            } else if let Some(message) = parse_error_line(&line) {
                last_error = Some(message);
            }
        }

        for reader in readers {
            let _ = reader.join();
        }

        let status = child.wait()?;
        if status.success() {
            return Ok(());
        }

        debug!("yt-dlp exited with {}", status);
        Err(match last_error {
            Some(message) => DownloadError::Failed(message),
            None => DownloadError::Exited(status),
        })
    }
}

fn spawn_reader<R: Read + Send + 'static>(
    name: &str,
    stream: R,
    tx: mpsc::Sender<String>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(name.to_string())
        .spawn(move || forward_lines(stream, tx))
}

/// Kills and reaps `child` so a half-started download leaves no process behind.
fn abort_child(child: &mut Child, error: std::io::Error) -> DownloadError {
    warn!("Aborting yt-dlp: {}", error);
    let _ = child.kill();
    let _ = child.wait();
    DownloadError::Io(error)
}

fn forward_lines<R: Read>(stream: R, tx: mpsc::Sender<String>) {
    for line in BufReader::new(stream).lines().map_while(Result::ok) {
        if tx.send(line).is_err() {
            break;
        }
    }
}

fn parse_progress_line(line: &str) -> Option<ProgressEvent> {
    let json = line.trim().strip_prefix(PROGRESS_MARKER)?;
    match serde_json::from_str::<RawProgress>(json) {
        Ok(raw) => raw.into_event(),
        Err(e) => {
            debug!("Ignoring malformed progress line: {}", e);
            None
        }
    }
}

fn parse_error_line(line: &str) -> Option<String> {
    let caps = ERROR_LINE.as_ref()?.captures(line.trim())?;
    Some(caps[1].to_string())
}
