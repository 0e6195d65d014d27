use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Matches the `_YYYYMMDD_HHMMSS` suffix appended to session folder names.
static TIMESTAMP_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_\d{8}_\d{6}$").expect("Invalid timestamp suffix regex"));

/// A session folder holding one batch of related captures.
///
/// Identity is the path. Renaming yields a new record with a new path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub name: String,
    pub path: Utf8PathBuf,
    pub is_empty: bool,
}

impl Session {
    /// Name without the trailing `_YYYYMMDD_HHMMSS` timestamp.
    pub fn display_name(&self) -> &str {
        strip_timestamp_suffix(&self.name)
    }

    pub fn folder_ref(&self) -> FolderRef {
        FolderRef {
            name: self.name.clone(),
            path: self.path.clone(),
        }
    }
}

/// Persisted pointer to a folder, used for the last-folder record and fixed folder settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderRef {
    pub name: String,
    pub path: Utf8PathBuf,
}

impl FolderRef {
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

pub fn strip_timestamp_suffix(name: &str) -> &str {
    match TIMESTAMP_SUFFIX.find(name) {
        Some(m) if m.start() > 0 => &name[..m.start()],
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_strips_timestamp() {
        let session = Session {
            name: "Site_20240101_090000".to_string(),
            path: Utf8PathBuf::from("/captures/Site_20240101_090000"),
            is_empty: true,
        };
        assert_eq!(session.display_name(), "Site");
    }

    #[test]
    fn test_strip_keeps_names_without_suffix() {
        assert_eq!(strip_timestamp_suffix("Bridge_North"), "Bridge_North");
        assert_eq!(strip_timestamp_suffix("_20240101_090000"), "_20240101_090000");
    }
}
