use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, RegistryResult};

pub const UNCATEGORIZED: &str = "Uncategorized";
pub const ALL_CATEGORIES: &str = "all";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Edge,
    Chrome,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Edge => "edge",
            Browser::Chrome => "chrome",
        }
    }
}

impl fmt::Display for Browser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Browser {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "edge" | "msedge" => Ok(Browser::Edge),
            "chrome" => Ok(Browser::Chrome),
            other => Err(format!("unknown browser `{other}` (expected edge or chrome)")),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    #[default]
    Software,
    Browser,
}

/// What a target runs. Only the fields of the active variant exist, so a
/// record can never carry leftovers from the other kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Launch {
    Software {
        path: String,
        #[serde(default)]
        args: String,
    },
    Browser {
        browser: Browser,
        url: String,
    },
}

/// How a tag filter combines several tags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TagMatch {
    #[default]
    Any,
    All,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchTarget {
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub launch: Launch,
}

impl LaunchTarget {
    pub fn kind(&self) -> TargetKind {
        match self.launch {
            Launch::Software { .. } => TargetKind::Software,
            Launch::Browser { .. } => TargetKind::Browser,
        }
    }

    pub fn summary(&self) -> String {
        match &self.launch {
            Launch::Software { path, args } if args.is_empty() => path.clone(),
            Launch::Software { path, args } => format!("{path} {args}"),
            Launch::Browser { browser, url } => format!("{url} ({browser})"),
        }
    }

    /// An empty filter matches every target.
    pub fn has_tags(&self, tags: &[String], mode: TagMatch) -> bool {
        if tags.is_empty() {
            return true;
        }
        let carries = |tag: &String| self.tags.iter().any(|own| own == tag.trim());
        match mode {
            TagMatch::Any => tags.iter().any(carries),
            TagMatch::All => tags.iter().all(carries),
        }
    }
}

/// A candidate target as submitted by a caller. Every field may be blank;
/// [`TargetDraft::build`] decides whether it is complete.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetDraft {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TargetKind,
    pub category: String,
    pub path: String,
    pub args: String,
    pub browser: Option<Browser>,
    pub url: String,
    pub tags: Vec<String>,
}

impl TargetDraft {
    pub fn software(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TargetKind::Software,
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn browser(name: impl Into<String>, browser: Browser, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TargetKind::Browser,
            browser: Some(browser),
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_args(mut self, args: impl Into<String>) -> Self {
        self.args = args.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> RegistryResult<()> {
        if self.name.trim().is_empty() {
            return Err(RegistryError::Validation { field: "name" });
        }
        match self.kind {
            TargetKind::Software if self.path.trim().is_empty() => {
                Err(RegistryError::Validation { field: "path" })
            }
            TargetKind::Browser if self.url.trim().is_empty() => {
                Err(RegistryError::Validation { field: "url" })
            }
            _ => Ok(()),
        }
    }

    pub fn build(&self, id: String) -> RegistryResult<LaunchTarget> {
        self.validate()?;
        let category = match self.category.trim() {
            "" => UNCATEGORIZED.to_string(),
            name => name.to_string(),
        };
        let launch = match self.kind {
            TargetKind::Software => Launch::Software {
                path: self.path.trim().to_string(),
                args: self.args.clone(),
            },
            TargetKind::Browser => Launch::Browser {
                browser: self.browser.unwrap_or_default(),
                url: self.url.trim().to_string(),
            },
        };
        Ok(LaunchTarget {
            id,
            name: self.name.trim().to_string(),
            category,
            tags: normalize_tags(&self.tags),
            launch,
        })
    }
}

/// Trimmed, blanks dropped, first occurrence kept.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags.iter().map(|tag| tag.trim()).filter(|tag| !tag.is_empty()) {
        if !out.iter().any(|seen| seen == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_category_falls_back_to_uncategorized() {
        let target = TargetDraft::software("Notes", "/usr/bin/notes")
            .with_category("  ")
            .build("1".into())
            .unwrap();
        assert_eq!(target.category, UNCATEGORIZED);
        assert_eq!(
            target.launch,
            Launch::Software {
                path: "/usr/bin/notes".into(),
                args: String::new()
            }
        );
    }

    #[test]
    fn validation_names_missing_field() {
        let missing_name = TargetDraft::software("", "/bin/true");
        assert!(matches!(
            missing_name.validate(),
            Err(RegistryError::Validation { field: "name" })
        ));

        let missing_url = TargetDraft::browser("Docs", Browser::Chrome, "");
        assert!(matches!(
            missing_url.validate(),
            Err(RegistryError::Validation { field: "url" })
        ));

        let missing_path = TargetDraft {
            name: "Tool".into(),
            url: "https://ignored.example".into(),
            ..TargetDraft::default()
        };
        assert!(matches!(
            missing_path.validate(),
            Err(RegistryError::Validation { field: "path" })
        ));
    }

    #[test]
    fn browser_draft_drops_software_fields() {
        let mut draft = TargetDraft::browser("Docs", Browser::Chrome, "https://docs.example.com");
        draft.path = "/usr/bin/stale".into();
        draft.args = "--stale".into();
        let target = draft.build("id".into()).unwrap();
        let json = serde_json::to_value(&target).unwrap();
        assert_eq!(json["type"], "browser");
        assert_eq!(json["browser"], "chrome");
        assert!(json.get("path").is_none());
        assert!(json.get("args").is_none());
    }

    #[test]
    fn browser_defaults_to_edge() {
        let draft = TargetDraft {
            name: "Search".into(),
            kind: TargetKind::Browser,
            url: "https://example.com".into(),
            ..TargetDraft::default()
        };
        let target = draft.build("id".into()).unwrap();
        assert!(matches!(
            target.launch,
            Launch::Browser {
                browser: Browser::Edge,
                ..
            }
        ));
    }

    #[test]
    fn flat_record_deserializes() {
        let json = r#"{"id":"a","name":"Notes","category":"Work","type":"software","path":"/usr/bin/notes"}"#;
        let target: LaunchTarget = serde_json::from_str(json).unwrap();
        assert_eq!(target.kind(), TargetKind::Software);
        assert_eq!(target.summary(), "/usr/bin/notes");
    }

    #[test]
    fn tags_are_normalized_and_matched() {
        let target = TargetDraft::software("Build", "/usr/bin/make")
            .with_tags([" dev ", "", "daily", "dev"])
            .build("id".into())
            .unwrap();
        assert_eq!(target.tags, ["dev", "daily"]);

        let dev = vec!["dev".to_string()];
        let dev_and_web = vec!["dev".to_string(), "web".to_string()];
        assert!(target.has_tags(&[], TagMatch::All));
        assert!(target.has_tags(&dev, TagMatch::All));
        assert!(target.has_tags(&dev_and_web, TagMatch::Any));
        assert!(!target.has_tags(&dev_and_web, TagMatch::All));
    }

    #[test]
    fn untagged_record_stays_flat() {
        let target = TargetDraft::software("Notes", "/usr/bin/notes")
            .build("id".into())
            .unwrap();
        let json = serde_json::to_value(&target).unwrap();
        assert!(json.get("tags").is_none());
    }

    #[test]
    fn browser_names_parse() {
        assert_eq!("Chrome".parse::<Browser>(), Ok(Browser::Chrome));
        assert_eq!("msedge".parse::<Browser>(), Ok(Browser::Edge));
        assert!("firefox".parse::<Browser>().is_err());
    }
}
