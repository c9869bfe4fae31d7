use std::fmt;

use serde::{Deserialize, Serialize};

/// Host operating system family a launch plan is resolved for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Linux
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::MacOs => "macos",
            Platform::Linux => "linux",
        }
    }

    /// Extension a picked program usually carries, stripped when deriving a
    /// display name. Empty on Linux, where any extension is stripped.
    pub fn executable_extension(&self) -> &'static str {
        match self {
            Platform::Windows => ".exe",
            Platform::MacOs => ".app",
            Platform::Linux => "",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
