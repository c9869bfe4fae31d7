use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{RegistryError, RegistryResult};

pub const DEFAULT_HISTORY_LIMIT: usize = 20;

const PREFIX: &str = "registry-";
const SUFFIX: &str = ".json";
const STAMP_FORMAT: &str = "%Y%m%dT%H%M%S%3fZ";

/// One stored snapshot, as listed to the user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub description: String,
}

#[derive(Serialize)]
struct SnapshotOut<'a, T> {
    created_at: DateTime<Utc>,
    description: &'a str,
    registry: &'a T,
}

#[derive(Deserialize)]
struct SnapshotHeader {
    created_at: DateTime<Utc>,
    #[serde(default)]
    description: String,
}

#[derive(Deserialize)]
struct SnapshotIn<T> {
    registry: T,
}

/// A directory of registry snapshots, newest kept, oldest pruned past
/// `limit`.
#[derive(Clone, Debug)]
pub struct History {
    dir: PathBuf,
    limit: usize,
}

impl History {
    pub fn new(dir: impl Into<PathBuf>, limit: usize) -> Self {
        Self {
            dir: dir.into(),
            limit: limit.max(1),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn record<T: Serialize>(
        &self,
        state: &T,
        description: &str,
    ) -> RegistryResult<HistoryEntry> {
        fs::create_dir_all(&self.dir).map_err(|err| RegistryError::io(&self.dir, err))?;

        let mut created_at = Utc::now();
        let mut path = self.dir.join(file_name(created_at));
        while path.exists() {
            created_at += Duration::milliseconds(1);
            path = self.dir.join(file_name(created_at));
        }

        let snapshot = SnapshotOut {
            created_at,
            description,
            registry: state,
        };
        let data = serde_json::to_string_pretty(&snapshot)
            .map_err(|err| RegistryError::io(&path, err.into()))?;
        fs::write(&path, data).map_err(|err| RegistryError::io(&path, err))?;

        let entry = HistoryEntry {
            name: file_name(created_at),
            created_at,
            description: description.to_string(),
        };
        info!(snapshot = %entry.name, description, "registry snapshot saved");
        self.prune()?;
        Ok(entry)
    }

    /// Newest first. Unreadable snapshots are skipped with a warning.
    pub fn entries(&self) -> RegistryResult<Vec<HistoryEntry>> {
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(read_dir) => read_dir,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(RegistryError::io(&self.dir, err)),
        };
        let mut entries = Vec::new();
        for dir_entry in read_dir {
            let dir_entry = dir_entry.map_err(|err| RegistryError::io(&self.dir, err))?;
            let Ok(name) = dir_entry.file_name().into_string() else {
                continue;
            };
            if !is_snapshot_name(&name) {
                continue;
            }
            match read_header(&dir_entry.path()) {
                Ok(header) => entries.push(HistoryEntry {
                    name,
                    created_at: header.created_at,
                    description: header.description,
                }),
                Err(err) => warn!(snapshot = %name, error = %err, "skipping unreadable snapshot"),
            }
        }
        entries.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.name.cmp(&a.name))
        });
        Ok(entries)
    }

    pub fn load<T: DeserializeOwned>(&self, name: &str) -> RegistryResult<T> {
        if !is_snapshot_name(name) {
            return Err(RegistryError::UnknownSnapshot {
                name: name.to_string(),
            });
        }
        let path = self.dir.join(name);
        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(RegistryError::UnknownSnapshot {
                    name: name.to_string(),
                })
            }
            Err(err) => return Err(RegistryError::io(&path, err)),
        };
        let snapshot: SnapshotIn<T> = serde_json::from_str(&data)
            .map_err(|source| RegistryError::Corrupt { path, source })?;
        Ok(snapshot.registry)
    }

    fn prune(&self) -> RegistryResult<()> {
        for stale in self.entries()?.iter().skip(self.limit) {
            let path = self.dir.join(&stale.name);
            fs::remove_file(&path).map_err(|err| RegistryError::io(&path, err))?;
            debug!(snapshot = %stale.name, "pruned old snapshot");
        }
        Ok(())
    }
}

fn file_name(created_at: DateTime<Utc>) -> String {
    format!("{PREFIX}{}{SUFFIX}", created_at.format(STAMP_FORMAT))
}

/// Plain `registry-*.json` names only, so a restore cannot reach outside the
/// history directory.
fn is_snapshot_name(name: &str) -> bool {
    name.len() > PREFIX.len() + SUFFIX.len()
        && name.starts_with(PREFIX)
        && name.ends_with(SUFFIX)
        && !name.contains(['/', '\\'])
        && !name.contains("..")
}

fn read_header(path: &Path) -> RegistryResult<SnapshotHeader> {
    let data = fs::read_to_string(path).map_err(|err| RegistryError::io(path, err))?;
    serde_json::from_str(&data).map_err(|source| RegistryError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}
