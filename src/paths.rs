use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub const DATA_DIR_ENV: &str = "LAUNCHDECK_DATA_DIR";
const APP_DIR: &str = "launchdeck";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppPaths {
    data_dir: PathBuf,
    registry_file: PathBuf,
    history_dir: PathBuf,
    log_file: PathBuf,
}

impl AppPaths {
    /// Resolves the data directory: explicit override, then
    /// `LAUNCHDECK_DATA_DIR`, then the platform config directory.
    pub fn new(override_dir: Option<PathBuf>) -> Result<Self> {
        let from_env = env::var(DATA_DIR_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(|value| expand_home(value.trim()));
        let data_dir = match override_dir.or(from_env) {
            Some(dir) => dir,
            None => dirs::config_dir()
                .context("Unable to determine config directory")?
                .join(APP_DIR),
        };
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("Unable to create data directory {}", data_dir.display()))?;
        Ok(Self::in_dir(data_dir))
    }

    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            registry_file: data_dir.join("registry.json"),
            history_dir: data_dir.join("history"),
            log_file: data_dir.join("launchdeck.log"),
            data_dir,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn registry_file(&self) -> &Path {
        &self.registry_file
    }

    pub fn history_dir(&self) -> &Path {
        &self.history_dir
    }

    pub fn log_file(&self) -> &Path {
        &self.log_file
    }
}

fn expand_home(value: &str) -> PathBuf {
    let rest = match value.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with(['/', '\\']) => rest,
        _ => return PathBuf::from(value),
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest.trim_start_matches(['/', '\\'])),
        None => PathBuf::from(value),
    }
}
