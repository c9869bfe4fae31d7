use std::ffi::OsString;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::platform::Platform;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{field} is required")]
    Validation { field: &'static str },
    #[error("failed to access registry file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("registry file {} is not valid JSON: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("no registry snapshot named {name}")]
    UnknownSnapshot { name: String },
}

impl RegistryError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        RegistryError::Io {
            path: path.into(),
            source,
        }
    }
}

/// A launch that could not be handed to the operating system.
#[derive(Debug, Error)]
#[error("failed to launch `{command}` on {platform}: {source}")]
pub struct LaunchFailure {
    pub command: String,
    pub platform: Platform,
    #[source]
    pub source: io::Error,
}

impl LaunchFailure {
    pub fn new(command: impl Into<String>, platform: Platform, source: io::Error) -> Self {
        Self {
            command: command.into(),
            platform,
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum PickerError {
    #[error("picked path {} is not valid UTF-8", .0.to_string_lossy())]
    NonUtf8Path(OsString),
}

pub type RegistryResult<T> = Result<T, RegistryError>;
