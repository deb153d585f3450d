use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

/// Filter directives, e.g. `CALYX_LOG=calyx_core=debug`.
pub const LOG_ENV: &str = "CALYX_LOG";

const LOG_FILE: &str = "calyx.log";

/// Route tracing output to a log file. The terminal belongs to the UI, so nothing is written
/// to stdout or stderr; when the file can't be opened logs are dropped.
pub fn init(dir: Option<&Path>) -> Option<PathBuf> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    match dir.map(open_log_file) {
        Some(Ok((path, file))) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
            Some(path)
        }
        _ => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::sink)
                .try_init();
            None
        }
    }
}

fn open_log_file(dir: &Path) -> Result<(PathBuf, fs::File)> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory: {:?}", dir))?;
    let path = dir.join(LOG_FILE);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file: {:?}", path))?;
    Ok((path, file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_log_file_creates_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("logs");
        let (path, _file) = open_log_file(&nested).unwrap();
        assert_eq!(path, nested.join("calyx.log"));
        assert!(path.exists());
    }
}
