use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// Installs the global subscriber. Output goes to a file because the
/// terminal belongs to the UI. `RUST_LOG` wins over the configured filter.
pub fn init(cfg: &LogConfig) -> Result<()> {
    let Some(path) = cfg.file.as_deref() else {
        return Ok(());
    };
    let file = open_log_file(path)?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow::anyhow!("logging: install subscriber: {err}"))?;

    tracing::info!(version = crate::VERSION, "reel-tui starting");
    Ok(())
}

fn open_log_file(path: &Path) -> Result<fs::File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("logging: create directory {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("logging: open {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_missing_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("reel-tui.log");
        open_log_file(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn disabled_without_file() {
        let cfg = LogConfig {
            file: None,
            filter: "debug".into(),
        };
        init(&cfg).unwrap();
    }
}
