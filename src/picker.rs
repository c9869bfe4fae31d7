use std::path::PathBuf;

use rfd::FileDialog;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::PickerError;
use crate::platform::Platform;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickedFiles {
    pub cancelled: bool,
    pub paths: Vec<String>,
}

impl PickedFiles {
    pub fn cancelled() -> Self {
        Self {
            cancelled: true,
            paths: Vec::new(),
        }
    }
}

/// Lets the user choose one or more files. Implemented by the native dialog
/// in the binary and by fixed answers in tests.
pub trait FilePicker {
    fn pick_files(&self) -> Result<PickedFiles, PickerError>;
}

/// The platform's own file dialog, through `rfd`.
#[derive(Clone, Copy, Debug)]
pub struct NativeFilePicker {
    platform: Platform,
}

impl Default for NativeFilePicker {
    fn default() -> Self {
        Self::new(Platform::current())
    }
}

impl NativeFilePicker {
    pub fn new(platform: Platform) -> Self {
        Self { platform }
    }

    fn dialog(&self) -> FileDialog {
        let dialog = FileDialog::new().set_title("Choose a program");
        match self.platform {
            Platform::Windows => dialog
                .add_filter("Programs", &["exe", "bat", "cmd", "com"])
                .add_filter("All files", &["*"]),
            Platform::MacOs => dialog.set_directory("/Applications"),
            Platform::Linux => dialog,
        }
    }
}

impl FilePicker for NativeFilePicker {
    fn pick_files(&self) -> Result<PickedFiles, PickerError> {
        let picked = self.dialog().pick_files();
        debug!(count = picked.as_ref().map(Vec::len), "file dialog closed");
        selection_from_dialog(picked)
    }
}

/// `None` or an empty list means the dialog was dismissed.
fn selection_from_dialog(picked: Option<Vec<PathBuf>>) -> Result<PickedFiles, PickerError> {
    let Some(picked) = picked.filter(|paths| !paths.is_empty()) else {
        info!("file selection cancelled");
        return Ok(PickedFiles::cancelled());
    };
    let paths = picked
        .into_iter()
        .map(|path| path.into_os_string().into_string().map_err(PickerError::NonUtf8Path))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(PickedFiles {
        cancelled: false,
        paths,
    })
}
