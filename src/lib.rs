//! Registry and dispatcher for named launch targets: local programs with
//! arguments, or URLs opened in a chosen browser.
//!
//! [`adapter::Launcher`] is the surface a front end talks to. It owns a
//! [`registry::Registry`] for persistence and a [`dispatch::Dispatcher`] that
//! turns targets into detached OS processes. Registry rewrites are
//! snapshotted into a [`history::History`] so earlier states can be restored.

pub mod adapter;
pub mod dispatch;
pub mod error;
pub mod history;
pub mod logging;
pub mod paths;
pub mod picker;
pub mod platform;
pub mod registry;
pub mod target;

pub use adapter::{derive_name, Launcher};
pub use dispatch::{CommandSpec, Dispatcher, LaunchPlan};
pub use error::{LaunchFailure, PickerError, RegistryError};
pub use history::{History, HistoryEntry};
pub use picker::{FilePicker, NativeFilePicker, PickedFiles};
pub use platform::Platform;
pub use registry::Registry;
pub use target::{Browser, Launch, LaunchTarget, TagMatch, TargetDraft, TargetKind};
