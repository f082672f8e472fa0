//! Logging setup. The full-screen UI owns stdout, so events only go to a file.
//!
//! ## Environment Variables
//!
//! 1. **`SIMPLEPAD_LOG`** (highest priority), a bare level like `debug` is
//!    applied to this crate, anything with `=`, `:` or `,` is used verbatim
//! 2. **`RUST_LOG`**, used as-is
//! 3. **Default**, `warn` globally and `info` for simplepad
//!
//! ## Log File Location
//!
//! Default: `<data_local_dir>/simplepad/logs/simplepad-<pid>.log`.
//! Override with `--log-file <path>`; a path without an extension is taken
//! as a directory.

use std::env;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "warn,simplepad=info";

/// Returned from [`init`]; hold it for the life of the program so the file
/// writer gets flushed.
pub struct LogGuard {
    _file_guard: WorkerGuard,
    pub log_file: PathBuf,
}

#[derive(Debug, Default)]
pub struct LogConfig {
    pub log_file_path: Option<PathBuf>,
}

pub fn init(config: LogConfig) -> Result<LogGuard, Box<dyn std::error::Error + Send + Sync>> {
    let (log_dir, filename) = resolve_log_path(config.log_file_path);
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::never(&log_dir, &filename);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_filter(create_filter());

    Registry::default().with(file_layer).try_init()?;

    Ok(LogGuard {
        _file_guard: file_guard,
        log_file: log_dir.join(filename),
    })
}

/// Stdout logging for tests. Repeated calls are harmless.
pub fn test() {
    let _ = fmt().with_env_filter(create_filter()).with_test_writer().try_init();
}

fn resolve_log_path(override_path: Option<PathBuf>) -> (PathBuf, String) {
    let filename = format!("simplepad-{}.log", std::process::id());

    if let Some(path) = override_path {
        if path.extension().is_some() {
            let dir = match path.parent() {
                Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
                _ => PathBuf::from("."),
            };
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or(filename);
            return (dir, name);
        }
        return (path, filename);
    }

    let dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("simplepad")
        .join("logs");
    (dir, filename)
}

fn create_filter() -> EnvFilter {
    let directives = filter_directives(
        env::var("SIMPLEPAD_LOG").ok().as_deref(),
        env::var("RUST_LOG").ok().as_deref(),
    );
    EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn filter_directives(simplepad_log: Option<&str>, rust_log: Option<&str>) -> String {
    if let Some(value) = simplepad_log {
        if value.contains(['=', ':', ',']) {
            return value.to_string();
        }
        return format!("warn,simplepad={value}");
    }
    match rust_log {
        Some(value) => value.to_string(),
        None => DEFAULT_FILTER.to_string(),
    }
}
