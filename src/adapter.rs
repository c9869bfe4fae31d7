use tracing::{error, warn};

use crate::dispatch::Dispatcher;
use crate::error::{PickerError, RegistryResult};
use crate::history::{History, HistoryEntry, DEFAULT_HISTORY_LIMIT};
use crate::paths::AppPaths;
use crate::picker::{FilePicker, NativeFilePicker, PickedFiles};
use crate::registry::Registry;
use crate::target::{Browser, LaunchTarget, TagMatch, TargetDraft};

/// The request/response surface a presentation layer talks to.
///
/// Registry requests propagate their errors; launch requests are reduced to
/// a success flag after the failure has been logged.
pub struct Launcher<P = NativeFilePicker> {
    registry: Registry,
    dispatcher: Dispatcher,
    picker: P,
}

impl Launcher<NativeFilePicker> {
    pub fn open(paths: &AppPaths) -> RegistryResult<Self> {
        let registry = Registry::open(paths.registry_file())?
            .with_history(History::new(paths.history_dir(), DEFAULT_HISTORY_LIMIT));
        Ok(Self::new(
            registry,
            Dispatcher::default(),
            NativeFilePicker::default(),
        ))
    }
}

impl<P: FilePicker> Launcher<P> {
    pub fn new(registry: Registry, dispatcher: Dispatcher, picker: P) -> Self {
        Self {
            registry,
            dispatcher,
            picker,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn list_targets(&self) -> Vec<LaunchTarget> {
        self.registry.list().to_vec()
    }

    pub fn targets_tagged(&self, tags: &[String], mode: TagMatch) -> Vec<LaunchTarget> {
        self.registry
            .list()
            .iter()
            .filter(|target| target.has_tags(tags, mode))
            .cloned()
            .collect()
    }

    pub fn tags(&self) -> Vec<String> {
        self.registry.tags()
    }

    pub fn target(&self, id: &str) -> Option<&LaunchTarget> {
        self.registry.get(id)
    }

    pub fn add_target(&mut self, draft: &TargetDraft) -> RegistryResult<Vec<LaunchTarget>> {
        self.registry.add(draft)
    }

    pub fn remove_target(&mut self, id: &str) -> RegistryResult<Vec<LaunchTarget>> {
        self.registry.remove(id)
    }

    pub fn categories(&self) -> Vec<String> {
        self.registry.categories()
    }

    pub fn add_category(&mut self, name: &str) -> RegistryResult<()> {
        self.registry.add_category(name)
    }

    pub fn history(&self) -> RegistryResult<Vec<HistoryEntry>> {
        self.registry.history()
    }

    pub fn restore(&mut self, snapshot: &str) -> RegistryResult<Vec<LaunchTarget>> {
        self.registry.restore(snapshot)
    }

    pub fn reload(&mut self) -> RegistryResult<()> {
        self.registry.reload()
    }

    pub fn dispatch(&self, target: &LaunchTarget) -> bool {
        match self.dispatcher.launch(target) {
            Ok(()) => true,
            Err(failure) => {
                error!(
                    id = %target.id,
                    name = %target.name,
                    command = %failure.command,
                    platform = %failure.platform,
                    error = %failure.source,
                    "launch failed"
                );
                false
            }
        }
    }

    pub fn open_urls(&self, browser: Browser, urls: &[String]) -> bool {
        match self.dispatcher.open_urls(browser, urls) {
            Ok(()) => true,
            Err(failure) => {
                error!(
                    %browser,
                    command = %failure.command,
                    platform = %failure.platform,
                    error = %failure.source,
                    "batch open failed"
                );
                false
            }
        }
    }

    pub fn pick_file(&self) -> Result<PickedFiles, PickerError> {
        self.picker.pick_files().map_err(|err| {
            warn!(error = %err, "file chooser unavailable");
            err
        })
    }

    pub fn derive_name(&self, path: &str, strip_extension: &str) -> String {
        derive_name(path, strip_extension)
    }
}

/// Default display name for a path: the last component, minus
/// `strip_extension` when it matches (any extension when empty).
pub fn derive_name(path: &str, strip_extension: &str) -> String {
    let trimmed = path.trim().trim_end_matches(['/', '\\']);
    let file_name = trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed);
    let extension = strip_extension.trim().trim_start_matches('.');

    let cut = if extension.is_empty() {
        file_name.rfind('.').filter(|&idx| idx > 0)
    } else {
        let suffix = format!(".{extension}");
        let idx = file_name.len().checked_sub(suffix.len());
        idx.filter(|&idx| idx > 0 && file_name.is_char_boundary(idx))
            .filter(|&idx| file_name[idx..].eq_ignore_ascii_case(&suffix))
    };

    match cut {
        Some(idx) => file_name[..idx].to_string(),
        None => file_name.to_string(),
    }
}
