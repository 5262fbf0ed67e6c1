//! Logging and tracing initialization.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use crate::config::LoggingConfig;

/// Initialize the tracing subscriber with the given configuration.
///
/// When `config.file` is set, log output goes to that file (created and
/// appended to) instead of stderr; a file that cannot be opened falls
/// back to the console with a note, so a bad log path never silences a
/// run entirely.
pub fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let log_file = config.file.as_deref().and_then(open_log_file);

    if config.json {
        let builder = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .json();
        if let Some(file) = log_file {
            let subscriber = builder.with_writer(file).finish();
            tracing::subscriber::set_global_default(subscriber).ok();
        } else {
            tracing::subscriber::set_global_default(builder.finish()).ok();
        }
    } else {
        let builder = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false);
        if let Some(file) = log_file {
            let subscriber = builder.with_ansi(false).with_writer(file).finish();
            tracing::subscriber::set_global_default(subscriber).ok();
        } else {
            tracing::subscriber::set_global_default(builder.finish()).ok();
        }
    }
}

/// Initialize logging with defaults (useful for tests and quick scripts).
pub fn init_default_logging() {
    init_logging(&LoggingConfig::default());
}

fn open_log_file(path: &Path) -> Option<Arc<File>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => Some(Arc::new(file)),
        Err(e) => {
            eprintln!(
                "Could not open log file {}, logging to console: {e}",
                path.display()
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_is_created_with_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("vigil.log");
        let config = LoggingConfig {
            level: "info".to_string(),
            json: false,
            file: Some(path.clone()),
        };

        init_logging(&config);
        assert!(path.exists());
    }

    #[test]
    fn test_unopenable_log_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened for appending.
        assert!(open_log_file(dir.path()).is_none());
    }
}
