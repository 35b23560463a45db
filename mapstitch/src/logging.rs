//! Logging setup.
//!
//! Console output goes to stderr so it does not mix with an image written to
//! stdout or with a progress bar. An optional log file receives the same
//! events without ANSI colors. The filter comes from `RUST_LOG` and falls
//! back to the given default level.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping this guard will flush and close the log file writer.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize logging.
///
/// # Arguments
///
/// * `log_file` - Optional file that receives a copy of every event; it is
///   truncated first and its directory created if needed
/// * `default_level` - Filter used when `RUST_LOG` is unset (e.g. "info")
///
/// # Errors
///
/// Returns an error if the log file cannot be prepared.
pub fn init_logging(
    log_file: Option<&Path>,
    default_level: &str,
) -> Result<LoggingGuard, io::Error> {
    let (file_layer, file_guard) = match log_file {
        Some(path) => {
            let (dir, name) = prepare_log_file(path)?;
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .compact();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| io::Error::other(e.to_string()))?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Creates the log file's directory and truncates the file.
///
/// Returns the directory and file name for the appender.
fn prepare_log_file(path: &Path) -> Result<(&Path, &OsStr), io::Error> {
    let name = path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("log path {} has no file name", path.display()),
        )
    })?;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    fs::create_dir_all(dir)?;
    fs::write(path, "")?;
    Ok((dir, name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // init_logging installs a global subscriber, so only the file handling
    // is tested here.

    #[test]
    fn test_prepare_creates_directory_and_truncates() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("mapstitch.log");

        let (dir, name) = prepare_log_file(&path).unwrap();
        assert_eq!(dir, temp.path().join("nested"));
        assert_eq!(name, "mapstitch.log");
        assert_eq!(fs::read_to_string(&path).unwrap(), "");

        fs::write(&path, "old log data").unwrap();
        prepare_log_file(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_rejects_path_without_file_name() {
        assert!(prepare_log_file(Path::new("/")).is_err());
    }
}
