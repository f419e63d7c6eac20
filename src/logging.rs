use std::io;
use std::fs;
use std::path::{Path, PathBuf};

use time::macros::format_description;
use time::UtcOffset;
use tracing_subscriber::{self, fmt, prelude::*};
use tracing_subscriber::util::TryInitError;
use tracing_appender::non_blocking::WorkerGuard;

const LOG_RETENTION_DAYS: u64 = 7;

/// Get the log directory path in the user-specific OS cache directory
/// - Linux: ~/.cache/nix-language-server/
/// - macOS: ~/Library/Caches/nix-language-server/
/// - Windows: %LOCALAPPDATA%\nix-language-server\
fn get_log_dir() -> io::Result<PathBuf> {
    let cache_dir = dirs::cache_dir()
        .ok_or_else(|| io::Error::new(
            io::ErrorKind::NotFound,
            "Unable to determine user cache directory"
        ))?;

    let log_dir = cache_dir.join("nix-language-server");
    if !log_dir.exists() {
        fs::create_dir_all(&log_dir)?;
    }

    Ok(log_dir)
}

/// Removes session logs older than LOG_RETENTION_DAYS.
fn cleanup_old_logs(log_dir: &Path) -> io::Result<()> {
    let now = std::time::SystemTime::now();
    let retention = std::time::Duration::from_secs(LOG_RETENTION_DAYS * 24 * 60 * 60);

    for entry in fs::read_dir(log_dir)?.flatten() {
        let is_session_log = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with("session-") && name.ends_with(".log"));
        if !is_session_log {
            continue;
        }
        let expired = entry
            .metadata()
            .and_then(|metadata| metadata.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .is_some_and(|age| age > retention);
        if expired {
            if let Err(e) = fs::remove_file(entry.path()) {
                eprintln!("Failed to remove old log file {:?}: {}", entry.path(), e);
            }
        }
    }
    Ok(())
}

/// Initialize logger with stderr and optional session file output
/// Returns a WorkerGuard that must be kept alive for the duration of the program
///
/// # Arguments
/// * `no_color` - Disable ANSI colors in stderr output
/// * `log_level` - Override log level (otherwise uses RUST_LOG or defaults to "info")
/// * `enable_file_logging` - Enable file logging to the cache directory (disable for tests)
///
/// # Logging Behavior
/// - **Stderr**: Logs at the configured level (default "info"). Stdout carries the LSP stream and is never logged to.
/// - **Session File**: Logs at DEBUG level, including package index round trips
pub fn init_logger(no_color: bool, log_level: Option<&str>, enable_file_logging: bool) -> io::Result<WorkerGuard> {
    let timer = fmt::time::OffsetTime::new(
        UtcOffset::UTC,
        format_description!("[[[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z]"),
    );

    let stderr_filter = match log_level {
        Some(level) => tracing_subscriber::EnvFilter::new(level),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(timer.clone())
        .with_ansi(!no_color)
        .with_filter(stderr_filter);

    if !enable_file_logging {
        let (_, guard) = tracing_appender::non_blocking(std::io::sink());
        let result = tracing_subscriber::registry().with(stderr_layer).try_init();
        return ignore_already_set(result).map(|()| guard);
    }

    let log_dir = get_log_dir()?;
    cleanup_old_logs(&log_dir)?;

    let log_path = log_dir.join(format!("session-{}.log", session_id()?));
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);
    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_timer(timer)
        .with_ansi(false)
        .with_filter(tracing_subscriber::EnvFilter::new("debug"));

    let result = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init();
    ignore_already_set(result)?;
    eprintln!("Logging to file: {:?}", log_path);
    Ok(guard)
}

/// Timestamp and pid, unique per server process.
fn session_id() -> io::Result<String> {
    let format = format_description!("[year][month][day]-[hour][minute][second]");
    let timestamp = time::OffsetDateTime::now_utc()
        .format(&format)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    Ok(format!("{}-{}", timestamp, std::process::id()))
}

/// Treats an already installed global subscriber as success, as happens when tests share a process.
fn ignore_already_set(result: Result<(), TryInitError>) -> io::Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.to_string().contains("already been set") || e.to_string().contains("SetLoggerError") => Ok(()),
        Err(e) => Err(io::Error::new(io::ErrorKind::Other, e)),
    }
}
