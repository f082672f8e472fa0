use crate::config::RcConfig;
use crate::platform::PersistenceMode;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PersistenceArg {
    Auto,
    Handle,
    Download,
}

impl From<PersistenceArg> for PersistenceMode {
    fn from(arg: PersistenceArg) -> Self {
        match arg {
            PersistenceArg::Auto => PersistenceMode::Auto,
            PersistenceArg::Handle => PersistenceMode::Handle,
            PersistenceArg::Download => PersistenceMode::Download,
        }
    }
}

/// A small plain-text notepad for the terminal.
#[derive(Debug, Parser)]
#[command(name = "simplepad", version, about)]
pub struct Cli {
    /// File to open at start-up
    pub file: Option<PathBuf>,

    /// How documents are saved
    #[arg(long, value_enum)]
    pub persistence: Option<PersistenceArg>,

    /// Directory downloads are written to when saving by download
    #[arg(long)]
    pub download_dir: Option<PathBuf>,

    /// Directory the help and about screens are served from
    #[arg(long)]
    pub asset_root: Option<PathBuf>,

    /// Directory holding the offline asset cache
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Do not register the offline asset cache
    #[arg(long)]
    pub no_offline_cache: bool,

    /// Show a line number gutter
    #[arg(long)]
    pub line_numbers: bool,

    /// Log file path, or a directory for the default file name
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Write a sample .simplepadrc to the current directory and exit
    #[arg(long)]
    pub generate_rc: bool,
}

impl Cli {
    /// Layer command line flags over the rc file settings.
    pub fn apply(&self, config: &mut RcConfig) {
        if let Some(mode) = self.persistence {
            config.persistence = mode.into();
        }
        if let Some(dir) = &self.download_dir {
            config.download_dir = Some(dir.clone());
        }
        if let Some(root) = &self.asset_root {
            config.asset_root = root.clone();
        }
        if let Some(dir) = &self.cache_dir {
            config.cache_dir = Some(dir.clone());
        }
        if self.no_offline_cache {
            config.offline_cache = false;
        }
        if self.line_numbers {
            config.line_numbers = true;
        }
    }
}
