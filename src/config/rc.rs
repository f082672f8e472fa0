use crate::platform::PersistenceMode;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const RC_FILE_NAME: &str = ".simplepadrc";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RcConfig {
    pub persistence: PersistenceMode,
    pub download_dir: Option<PathBuf>,
    pub asset_root: PathBuf,
    pub cache_dir: Option<PathBuf>,
    pub offline_cache: bool,
    pub line_numbers: bool,
}

impl Default for RcConfig {
    fn default() -> Self {
        Self {
            persistence: PersistenceMode::Auto,
            download_dir: None,
            asset_root: PathBuf::from("assets"),
            cache_dir: None,
            offline_cache: true,
            line_numbers: false,
        }
    }
}

impl RcConfig {
    /// Where downloads land: the configured directory, else the OS download
    /// directory, else the working directory.
    pub fn resolved_download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn resolved_cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .map(|dir| dir.join("simplepad"))
                .unwrap_or_else(|| PathBuf::from(".simplepad-cache"))
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub struct RcLoader;

impl RcLoader {
    /// Get the path to the RC file
    /// Looks for .simplepadrc in:
    /// 1. Current directory
    /// 2. Home directory
    pub fn get_rc_path() -> Option<PathBuf> {
        let current_rc = Path::new(RC_FILE_NAME);
        if current_rc.exists() {
            return Some(current_rc.to_path_buf());
        }

        dirs::home_dir()
            .map(|home| home.join(RC_FILE_NAME))
            .filter(|home_rc| home_rc.exists())
    }

    pub fn load_config() -> RcConfig {
        match Self::get_rc_path() {
            Some(path) => Self::load_from(&path),
            None => RcConfig::default(),
        }
    }

    /// Load a specific RC file. An unreadable file yields the defaults.
    pub fn load_from(path: &Path) -> RcConfig {
        let mut config = RcConfig::default();
        match fs::read_to_string(path) {
            Ok(content) => {
                debug!(path = %path.display(), "loading rc file");
                Self::parse_config_content(&content, &mut config);
            }
            Err(err) => warn!(%err, path = %path.display(), "could not read rc file"),
        }
        config
    }

    fn parse_config_content(content: &str, config: &mut RcConfig) {
        for line in content.lines() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') || line.starts_with('"') {
                continue;
            }

            Self::parse_config_line(line, config);
        }
    }

    fn parse_config_line(line: &str, config: &mut RcConfig) {
        let line = match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        }
        .trim();

        // vi-style toggles for the gutter
        if let Some(setting) = line.strip_prefix("set ") {
            match setting.trim() {
                "nu" | "number" => config.line_numbers = true,
                "nonu" | "nonumber" => config.line_numbers = false,
                _ => {}
            }
            return;
        }

        let Some((key, value)) = line.split_once('=') else {
            return;
        };
        let value = value.trim();
        if value.is_empty() {
            return;
        }

        match key.trim() {
            "persistence" => {
                if let Some(mode) = PersistenceMode::parse(value) {
                    config.persistence = mode;
                }
            }
            "download_dir" => config.download_dir = Some(expand_home(value)),
            "asset_root" => config.asset_root = expand_home(value),
            "cache_dir" => config.cache_dir = Some(expand_home(value)),
            "offline_cache" => {
                if let Some(enabled) = parse_bool(value) {
                    config.offline_cache = enabled;
                }
            }
            "line_numbers" | "number" => {
                if let Some(enabled) = parse_bool(value) {
                    config.line_numbers = enabled;
                }
            }
            _ => {}
        }
    }

    pub fn generate_sample_rc() -> String {
        r#"# SimplePad configuration file (.simplepadrc)
# Lines starting with # or " are comments

# How documents are saved: auto, handle (write files in place) or
# download (every save drops a new copy into download_dir)
persistence = auto
# download_dir = ~/Downloads

# Offline help and about screens
asset_root = assets
# cache_dir = ~/.cache/simplepad
offline_cache = true

# Show a line number gutter (or: set nu / set nonu)
line_numbers = false
"#
        .to_string()
    }
}

/// Expand a leading `~` to the home directory. Other paths pass through.
fn expand_home(value: &str) -> PathBuf {
    let rest = match value.strip_prefix('~') {
        Some("") => "",
        Some(rest) if rest.starts_with(['/', '\\']) => &rest[1..],
        _ => return PathBuf::from(value),
    };
    match dirs::home_dir() {
        Some(home) if rest.is_empty() => home,
        Some(home) => home.join(rest),
        None => PathBuf::from(value),
    }
}
