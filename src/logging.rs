use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::EnvFilter;

pub const DEFAULT_LEVEL: &str = "info";

#[derive(Clone, Copy, Debug)]
pub enum LogSink<'a> {
    Stderr,
    /// Appends to a file. Used while the terminal belongs to the TUI.
    File(&'a Path),
}

fn build_filter(level: Option<&str>) -> Result<EnvFilter> {
    match level {
        Some(level) => {
            EnvFilter::try_new(level).with_context(|| format!("Invalid log level `{level}`"))
        }
        None => Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))),
    }
}

/// Installs the global subscriber. `level` takes precedence over `RUST_LOG`.
pub fn init(level: Option<&str>, sink: LogSink<'_>) -> Result<()> {
    let filter = build_filter(level)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match sink {
        LogSink::Stderr => builder
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|err| anyhow!(err))?,
        LogSink::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Unable to open log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|err| anyhow!(err))?
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_level_is_validated() {
        assert!(build_filter(Some("debug")).is_ok());
        assert!(build_filter(Some("launchdeck=trace,warn")).is_ok());
        assert!(build_filter(Some("launchdeck=verbose")).is_err());
    }
}
