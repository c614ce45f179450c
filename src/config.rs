use std::env::consts::EXE_SUFFIX;
use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

const APP_DIR: &str = "yt-mp3-downloader";
const ENV_PREFIX: &str = "YTMP3_";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub tools: ToolsConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Explicit yt-dlp binary; looked up when unset
    pub yt_dlp: Option<PathBuf>,
    /// Explicit ffmpeg binary; looked up when unset
    pub ffmpeg: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive, overridden by `RUST_LOG`
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "yt_mp3_downloader=info".to_string(),
        }
    }
}

impl Config {
    /// Defaults, then `<config dir>/yt-mp3-downloader/config.toml`, then
    /// `YTMP3_*` environment variables (`YTMP3_TOOLS__FFMPEG=...`).
    pub fn load() -> Result<Self, ConfigError> {
        let file = dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"));
        Self::load_from(file.as_deref())
    }

    pub fn load_from(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(path) = config_file {
            if path.exists() {
                debug!("Reading config from {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        figment
            .extract()
            .map_err(|e| ConfigError::Load(e.to_string()))
    }
}

/// External binaries, resolved once at startup and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub yt_dlp: PathBuf,
    pub ffmpeg: PathBuf,
}

impl ToolPaths {
    pub fn resolve(config: &ToolsConfig) -> Self {
        let bundle_dirs = bundle_dirs();
        Self {
            yt_dlp: resolve_tool("yt-dlp", config.yt_dlp.as_deref(), &bundle_dirs),
            ffmpeg: resolve_tool("ffmpeg", config.ffmpeg.as_deref(), &bundle_dirs),
        }
    }
}

/// Directories a bundled build ships its helper binaries in: next to the
/// executable, and `Contents/Resources` inside a macOS `.app`.
fn bundle_dirs() -> Vec<PathBuf> {
    let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    else {
        return Vec::new();
    };

    let resources = exe_dir.join("../Resources");
    vec![exe_dir, resources]
}

fn resolve_tool(name: &str, configured: Option<&Path>, bundle_dirs: &[PathBuf]) -> PathBuf {
    if let Some(path) = configured {
        info!("Using configured {}: {}", name, path.display());
        return path.to_path_buf();
    }

    let file_name = format!("{}{}", name, EXE_SUFFIX);
    if let Some(path) = bundle_dirs
        .iter()
        .map(|dir| dir.join(&file_name))
        .find(|path| path.is_file())
    {
        info!("Using bundled {}: {}", name, path.display());
        return path;
    }

    match which::which(name) {
        Ok(path) => {
            info!("Using {} from PATH: {}", name, path.display());
            path
        }
        Err(e) => {
            // Left to fail at download time so the user sees the error.
            warn!("{} not found ({}), falling back to bare name", name, e);
            PathBuf::from(name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::load_from(None).unwrap();
        assert!(config.tools.yt_dlp.is_none());
        assert!(config.tools.ffmpeg.is_none());
        assert_eq!(config.log.filter, "yt_mp3_downloader=info");
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("config.toml");
        std::fs::write(
            &file,
            "[tools]\nffmpeg = \"/opt/ffmpeg/bin/ffmpeg\"\n\n[log]\nfilter = \"debug\"\n",
        )
        .unwrap();

        let config = Config::load_from(Some(&file)).unwrap();
        assert_eq!(
            config.tools.ffmpeg,
            Some(PathBuf::from("/opt/ffmpeg/bin/ffmpeg"))
        );
        assert!(config.tools.yt_dlp.is_none());
        assert_eq!(config.log.filter, "debug");
    }

    #[test]
    fn test_missing_config_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.log.filter, "yt_mp3_downloader=info");
    }

    #[test]
    fn test_configured_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(format!("ffmpeg{}", EXE_SUFFIX)), b"").unwrap();

        let resolved = resolve_tool(
            "ffmpeg",
            Some(Path::new("/custom/ffmpeg")),
            &[dir.path().to_path_buf()],
        );
        assert_eq!(resolved, PathBuf::from("/custom/ffmpeg"));
    }

    #[test]
    fn test_bundled_copy_beats_search_path() {
        let dir = tempfile::tempdir().unwrap();
        let bundled = dir.path().join(format!("ffmpeg{}", EXE_SUFFIX));
        std::fs::write(&bundled, b"").unwrap();

        let resolved = resolve_tool("ffmpeg", None, &[dir.path().to_path_buf()]);
        assert_eq!(resolved, bundled);
    }

    #[test]
    fn test_unknown_tool_falls_back_to_bare_name() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = resolve_tool(
            "definitely-not-an-installed-tool",
            None,
            &[dir.path().to_path_buf()],
        );
        assert_eq!(resolved, PathBuf::from("definitely-not-an-installed-tool"));
    }
}
