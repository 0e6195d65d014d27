use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Bootstrap configuration from `fieldcapture.yaml`, overridable by `FIELDCAPTURE_*` variables.
///
/// Locates everything else: the session base directory, the directory holding
/// the JSON settings stores, and the log output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory whose subdirectories are sessions. Also the root session.
    pub base_dir: Utf8PathBuf,

    /// Directory holding `settings.json`, `last_folder.json` and `last_used/`.
    pub config_dir: Utf8PathBuf,

    pub log_dir: Utf8PathBuf,
    pub log_prefix: String,
    pub debug_mode: bool,
    pub console_output: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_dir: Utf8PathBuf::from("Captures"),
            config_dir: Utf8PathBuf::from("FieldCapture Data"),
            log_dir: Utf8PathBuf::from("logs"),
            log_prefix: "fieldcapture".to_string(),
            debug_mode: false,
            console_output: true,
        }
    }
}
