use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{RegistryError, RegistryResult};
use crate::history::{History, HistoryEntry};
use crate::target::{LaunchTarget, TargetDraft, ALL_CATEGORIES};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    targets: Vec<LaunchTarget>,
    #[serde(default)]
    categories: Vec<String>,
}

impl RegistryFile {
    fn load(path: &Path) -> RegistryResult<Self> {
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "registry file missing, starting empty");
                return Ok(Self::default());
            }
            Err(err) => return Err(RegistryError::io(path, err)),
        };
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut parsed: RegistryFile =
            serde_json::from_str(&data).map_err(|source| RegistryError::Corrupt {
                path: path.to_path_buf(),
                source,
            })?;
        parsed.drop_duplicate_ids();
        Ok(parsed)
    }

    fn save(&self, path: &Path) -> RegistryResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| RegistryError::io(parent, err))?;
            }
        }
        let data = serde_json::to_string_pretty(self)
            .map_err(|err| RegistryError::io(path, err.into()))?;
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, data).map_err(|err| RegistryError::io(&staging, err))?;
        fs::rename(&staging, path).map_err(|err| RegistryError::io(path, err))?;
        Ok(())
    }

    fn drop_duplicate_ids(&mut self) {
        let mut seen = HashSet::new();
        self.targets.retain(|target| {
            let fresh = seen.insert(target.id.clone());
            if !fresh {
                warn!(id = %target.id, name = %target.name, "dropping target with duplicate id");
            }
            fresh
        });
    }
}

/// The durable collection of launch targets and custom categories.
///
/// State is read once by [`Registry::open`]; every mutation rewrites the
/// whole file before returning. With a [`History`] attached, the file as it
/// was is snapshotted before each rewrite.
#[derive(Debug)]
pub struct Registry {
    path: PathBuf,
    file: RegistryFile,
    history: Option<History>,
}

impl Registry {
    pub fn open(path: impl Into<PathBuf>) -> RegistryResult<Self> {
        let path = path.into();
        let file = RegistryFile::load(&path)?;
        info!(
            path = %path.display(),
            targets = file.targets.len(),
            categories = file.categories.len(),
            "registry loaded"
        );
        Ok(Self {
            path,
            file,
            history: None,
        })
    }

    pub fn with_history(mut self, history: History) -> Self {
        self.history = Some(history);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn reload(&mut self) -> RegistryResult<()> {
        self.file = RegistryFile::load(&self.path)?;
        Ok(())
    }

    pub fn list(&self) -> &[LaunchTarget] {
        &self.file.targets
    }

    pub fn get(&self, id: &str) -> Option<&LaunchTarget> {
        self.file.targets.iter().find(|target| target.id == id)
    }

    pub fn add(&mut self, draft: &TargetDraft) -> RegistryResult<Vec<LaunchTarget>> {
        let target = draft.build(self.fresh_id())?;
        let previous = self.file.clone();
        info!(id = %target.id, name = %target.name, category = %target.category, "adding target");
        let description = format!("before adding {}", target.name);
        self.file.targets.push(target);
        self.persist_or_rollback(previous, &description)?;
        Ok(self.file.targets.clone())
    }

    pub fn remove(&mut self, id: &str) -> RegistryResult<Vec<LaunchTarget>> {
        let Some(index) = self.file.targets.iter().position(|target| target.id == id) else {
            debug!(id, "remove ignored, no such target");
            return Ok(self.file.targets.clone());
        };
        let previous = self.file.clone();
        let removed = self.file.targets.remove(index);
        info!(id = %removed.id, name = %removed.name, "removing target");
        self.persist_or_rollback(previous, &format!("before removing {}", removed.name))?;
        Ok(self.file.targets.clone())
    }

    /// `"all"` first, then custom categories, then categories in use.
    pub fn categories(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut names = vec![ALL_CATEGORIES.to_string()];
        seen.insert(ALL_CATEGORIES.to_string());
        let in_use = self.file.targets.iter().map(|target| &target.category);
        for name in self.file.categories.iter().chain(in_use) {
            if seen.insert(name.clone()) {
                names.push(name.clone());
            }
        }
        names
    }

    pub fn custom_categories(&self) -> &[String] {
        &self.file.categories
    }

    pub fn add_category(&mut self, name: &str) -> RegistryResult<()> {
        let name = name.trim();
        if name.is_empty() || name == ALL_CATEGORIES {
            return Ok(());
        }
        if self.file.categories.iter().any(|existing| existing == name) {
            return Ok(());
        }
        let previous = self.file.clone();
        self.file.categories.push(name.to_string());
        info!(category = name, "adding category");
        self.persist_or_rollback(previous, &format!("before adding category {name}"))
    }

    /// Every tag in use, sorted.
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self
            .file
            .targets
            .iter()
            .flat_map(|target| target.tags.iter().cloned())
            .collect();
        tags.sort();
        tags.dedup();
        tags
    }

    /// Stored snapshots, newest first. Empty when no history is attached.
    pub fn history(&self) -> RegistryResult<Vec<HistoryEntry>> {
        match &self.history {
            Some(history) => history.entries(),
            None => Ok(Vec::new()),
        }
    }

    /// Replaces the registry with a snapshot. The state being replaced is
    /// snapshotted first, so a restore can itself be undone.
    pub fn restore(&mut self, name: &str) -> RegistryResult<Vec<LaunchTarget>> {
        let Some(history) = &self.history else {
            return Err(RegistryError::UnknownSnapshot {
                name: name.to_string(),
            });
        };
        let mut restored: RegistryFile = history.load(name)?;
        restored.drop_duplicate_ids();
        let previous = std::mem::replace(&mut self.file, restored);
        info!(snapshot = name, targets = self.file.targets.len(), "restoring registry");
        self.persist_or_rollback(previous, &format!("before restoring {name}"))?;
        Ok(self.file.targets.clone())
    }

    fn persist_or_rollback(
        &mut self,
        previous: RegistryFile,
        description: &str,
    ) -> RegistryResult<()> {
        self.snapshot(&previous, description);
        if let Err(err) = self.file.save(&self.path) {
            self.file = previous;
            return Err(err);
        }
        Ok(())
    }

    /// A failed snapshot is logged and does not block the write.
    fn snapshot(&self, previous: &RegistryFile, description: &str) {
        let Some(history) = &self.history else {
            return;
        };
        if !self.path.exists() {
            return;
        }
        if let Err(err) = history.record(previous, description) {
            warn!(error = %err, "registry snapshot failed");
        }
    }

    fn fresh_id(&self) -> String {
        loop {
            let id = Uuid::new_v4().to_string();
            if self.get(&id).is_none() {
                return id;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::{Browser, Launch, TargetKind, UNCATEGORIZED};
    use tempfile::TempDir;

    fn open_temp() -> (TempDir, Registry) {
        let dir = TempDir::new().unwrap();
        let registry = Registry::open(dir.path().join("registry.json")).unwrap();
        (dir, registry)
    }

    #[test]
    fn missing_file_is_empty() {
        let (_dir, registry) = open_temp();
        assert!(registry.list().is_empty());
        assert_eq!(registry.categories(), vec!["all".to_string()]);
    }

    #[test]
    fn add_software_fills_defaults() {
        let (_dir, mut registry) = open_temp();
        let draft = TargetDraft::software("Notes", "/usr/bin/notes").with_category("");
        let targets = registry.add(&draft).unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].category, UNCATEGORIZED);
        assert_eq!(
            targets[0].launch,
            Launch::Software {
                path: "/usr/bin/notes".into(),
                args: String::new(),
            }
        );
    }

    #[test]
    fn add_without_url_is_rejected_untouched() {
        let (dir, mut registry) = open_temp();
        registry
            .add(&TargetDraft::software("Editor", "/usr/bin/vim"))
            .unwrap();
        let before = registry.list().to_vec();

        let draft = TargetDraft {
            name: "Docs".into(),
            kind: TargetKind::Browser,
            browser: Some(Browser::Chrome),
            ..TargetDraft::default()
        };
        let err = registry.add(&draft).unwrap_err();
        assert!(matches!(err, RegistryError::Validation { field: "url" }));
        assert_eq!(err.to_string(), "url is required");
        assert_eq!(registry.list(), before.as_slice());

        let reopened = Registry::open(dir.path().join("registry.json")).unwrap();
        assert_eq!(reopened.list(), before.as_slice());
    }

    #[test]
    fn identical_names_get_distinct_ids() {
        let (_dir, mut registry) = open_temp();
        let draft = TargetDraft::software("Shell", "/bin/sh");
        registry.add(&draft).unwrap();
        let targets = registry.add(&draft).unwrap();
        assert_eq!(targets.len(), 2);
        assert_ne!(targets[0].id, targets[1].id);
    }

    #[test]
    fn removing_unknown_id_keeps_collection() {
        let (_dir, mut registry) = open_temp();
        registry.add(&TargetDraft::software("A", "/bin/a")).unwrap();
        registry
            .add(&TargetDraft::browser("B", Browser::Edge, "https://b.example"))
            .unwrap();
        let before = registry.list().to_vec();
        let after = registry.remove("no-such-id").unwrap();
        assert_eq!(after, before);
    }

    #[test]
    fn remove_deletes_and_persists() {
        let (dir, mut registry) = open_temp();
        let targets = registry.add(&TargetDraft::software("A", "/bin/a")).unwrap();
        let id = targets[0].id.clone();
        registry.add(&TargetDraft::software("B", "/bin/b")).unwrap();

        let remaining = registry.remove(&id).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].name, "B");

        let reopened = Registry::open(dir.path().join("registry.json")).unwrap();
        assert!(reopened.get(&id).is_none());
        assert_eq!(reopened.list().len(), 1);
    }

    #[test]
    fn state_survives_reopen() {
        let (dir, mut registry) = open_temp();
        registry
            .add(
                &TargetDraft::software("Build", "/usr/bin/make")
                    .with_args("-C \"my dir\" all")
                    .with_category("Dev"),
            )
            .unwrap();
        registry
            .add(&TargetDraft::browser("Docs", Browser::Chrome, "https://docs.example.com"))
            .unwrap();
        registry.add_category("Research").unwrap();

        let reopened = Registry::open(dir.path().join("registry.json")).unwrap();
        assert_eq!(reopened.list(), registry.list());
        assert_eq!(reopened.custom_categories(), ["Research".to_string()]);
    }

    #[test]
    fn categories_merge_without_duplicates() {
        let (_dir, mut registry) = open_temp();
        registry.add_category("Work").unwrap();
        registry.add_category("Work").unwrap();
        registry.add_category("all").unwrap();
        registry.add_category("   ").unwrap();
        registry
            .add(&TargetDraft::software("Mail", "/usr/bin/mail").with_category("Work"))
            .unwrap();
        registry
            .add(&TargetDraft::software("Game", "/usr/bin/game").with_category("Fun"))
            .unwrap();

        let categories = registry.categories();
        assert_eq!(categories, vec!["all", "Work", "Fun"]);
        assert_eq!(registry.custom_categories(), ["Work".to_string()]);
    }

    #[test]
    fn failed_write_rolls_back() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested");
        let mut registry = Registry::open(nested.join("registry.json")).unwrap();
        fs::write(&nested, "not a directory").unwrap();

        let err = registry
            .add(&TargetDraft::software("A", "/bin/a"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::Io { .. }));
        assert!(registry.list().is_empty());

        let err = registry.add_category("Work").unwrap_err();
        assert!(matches!(err, RegistryError::Io { .. }));
        assert!(registry.custom_categories().is_empty());
    }

    fn open_with_history(dir: &TempDir, limit: usize) -> Registry {
        Registry::open(dir.path().join("registry.json"))
            .unwrap()
            .with_history(History::new(dir.path().join("history"), limit))
    }

    #[test]
    fn writes_snapshot_the_previous_file() {
        let dir = TempDir::new().unwrap();
        let mut registry = open_with_history(&dir, 10);
        registry.add(&TargetDraft::software("A", "/bin/a")).unwrap();
        assert!(registry.history().unwrap().is_empty());

        registry.add(&TargetDraft::software("B", "/bin/b")).unwrap();
        registry.add_category("Work").unwrap();
        let history = registry.history().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].description, "before adding category Work");
        assert_eq!(history[1].description, "before adding B");
    }

    #[test]
    fn restore_brings_back_a_snapshot_and_can_be_undone() {
        let dir = TempDir::new().unwrap();
        let mut registry = open_with_history(&dir, 10);
        let targets = registry.add(&TargetDraft::software("A", "/bin/a")).unwrap();
        registry.add(&TargetDraft::software("B", "/bin/b")).unwrap();
        registry.remove(&targets[0].id).unwrap();
        let only_b = registry.list().to_vec();

        let before_remove = registry.history().unwrap()[0].name.clone();
        let restored = registry.restore(&before_remove).unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored[0].id, targets[0].id);

        let reopened = Registry::open(dir.path().join("registry.json")).unwrap();
        assert_eq!(reopened.list(), restored.as_slice());

        let undo = registry.history().unwrap()[0].clone();
        assert!(undo.description.starts_with("before restoring"));
        assert_eq!(registry.restore(&undo.name).unwrap(), only_b);
    }

    #[test]
    fn history_is_pruned_to_limit() {
        let dir = TempDir::new().unwrap();
        let mut registry = open_with_history(&dir, 2);
        for name in ["A", "B", "C", "D", "E"] {
            registry.add(&TargetDraft::software(name, "/bin/x")).unwrap();
        }
        let history = registry.history().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].description, "before adding E");
    }

    #[test]
    fn unknown_snapshot_leaves_registry_alone() {
        let dir = TempDir::new().unwrap();
        let mut registry = open_with_history(&dir, 5);
        registry.add(&TargetDraft::software("A", "/bin/a")).unwrap();
        let before = registry.list().to_vec();
        let err = registry.restore("registry-nope.json").unwrap_err();
        assert!(matches!(err, RegistryError::UnknownSnapshot { .. }));
        assert_eq!(registry.list(), before.as_slice());

        let (_plain_dir, mut plain) = open_temp();
        assert!(plain.history().unwrap().is_empty());
        assert!(plain.restore("registry-nope.json").is_err());
    }

    #[test]
    fn tags_in_use_are_sorted() {
        let (_dir, mut registry) = open_temp();
        registry
            .add(&TargetDraft::software("A", "/bin/a").with_tags(["work", "daily"]))
            .unwrap();
        registry
            .add(&TargetDraft::software("B", "/bin/b").with_tags(["daily"]))
            .unwrap();
        assert_eq!(registry.tags(), ["daily", "work"]);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("registry.json");
        fs::write(&path, "{ not json").unwrap();
        let err = Registry::open(&path).unwrap_err();
        assert!(matches!(err, RegistryError::Corrupt { .. }));
    }

    #[test]
    fn duplicate_ids_on_disk_keep_first() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("registry.json");
        let json = r#"{
            "targets": [
                {"id":"x","name":"First","category":"A","type":"software","path":"/bin/a","args":""},
                {"id":"x","name":"Second","category":"A","type":"software","path":"/bin/b","args":""}
            ]
        }"#;
        fs::write(&path, json).unwrap();
        let registry = Registry::open(&path).unwrap();
        assert_eq!(registry.list().len(), 1);
        assert_eq!(registry.list()[0].name, "First");
    }
}
