use crate::models::{AppConfig, AppSettings, FolderRef, SettingKey};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::sync::Arc;

/// Name of the bootstrap configuration file.
pub const APP_CONFIG_FILE: &str = "fieldcapture.yaml";

/// Prefix of environment variables overriding the bootstrap configuration.
pub const ENV_PREFIX: &str = "FIELDCAPTURE";

/// Opaque key → JSON value storage used for last-used settings.
#[cfg_attr(test, mockall::automock)]
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;
    fn put(&self, key: &str, value: serde_json::Value) -> Result<()>;
}

/// [`KeyValueStore`] keeping one `<key>.json` file per entry in a directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: Utf8PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Utf8Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn entry_path(&self, key: &str) -> Utf8PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let path = self.entry_path(key);
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read stored value: {}", path))?;
        let value = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse stored value: {}", path))?;
        Ok(Some(value))
    }

    fn put(&self, key: &str, value: serde_json::Value) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create store directory: {}", self.dir))?;

        let path = self.entry_path(key);
        let json = serde_json::to_string_pretty(&value)
            .with_context(|| format!("Failed to serialize value for {}", key))?;
        fs::write(&path, json).with_context(|| format!("Failed to write stored value: {}", path))?;
        Ok(())
    }
}

/// Load the bootstrap configuration.
///
/// Layers the optional YAML file at `path` under `FIELDCAPTURE_*` environment
/// variables; anything unset keeps its default.
pub fn load_app_config<P: AsRef<Utf8Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();

    let settings = config::Config::builder()
        .add_source(config::File::from(path.as_std_path()).required(false))
        .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
        .build()
        .with_context(|| format!("Failed to load configuration: {}", path))?;

    let app_config: AppConfig = settings
        .try_deserialize()
        .with_context(|| format!("Failed to parse configuration: {}", path))?;

    Ok(app_config)
}

/// Log the loaded bootstrap configuration.
///
/// `load_app_config` runs before the subscriber exists, so callers log the
/// result once logging is set up.
pub fn log_app_config(config: &AppConfig) {
    tracing::info!(
        "Loaded app config: base_dir={}, config_dir={}",
        config.base_dir,
        config.config_dir
    );
}

/// Write the default bootstrap configuration to `path` unless it already exists.
pub fn write_default_app_config<P: AsRef<Utf8Path>>(path: P) -> Result<bool> {
    let path = path.as_ref();
    if path.exists() {
        return Ok(false);
    }

    let yaml_string = serde_yaml_ng::to_string(&AppConfig::default())
        .context("Failed to serialize default app config to YAML")?;
    fs::write(path, yaml_string)
        .with_context(|| format!("Failed to write app config: {}", path))?;

    tracing::info!("Wrote default app config to {}", path);
    Ok(true)
}

/// Configuration manager for the persisted settings stores.
///
/// Manages three independent JSON stores inside the configuration directory:
/// - Settings document (`settings.json`): the [`AppSettings`] policies
/// - Last-folder pointer (`last_folder.json`): `{name, path}` of the last opened session
/// - Last-used store (`last_used/<key>.json`): most recent runtime value per setting
#[derive(Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    settings_path: Utf8PathBuf,
    last_folder_path: Utf8PathBuf,
    last_used: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for ConfigManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigManager")
            .field("config_dir", &self.config_dir)
            .finish_non_exhaustive()
    }
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified configuration directory.
    ///
    /// # Arguments
    /// * `config_dir` - Directory holding the settings stores (e.g., "FieldCapture Data")
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let store = Arc::new(JsonFileStore::new(config_dir.as_ref().join("last_used")));
        Self::with_store(config_dir, store)
    }

    /// Create a ConfigManager backed by a custom last-used store.
    pub fn with_store<P: AsRef<Utf8Path>>(
        config_dir: P,
        last_used: Arc<dyn KeyValueStore>,
    ) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        // Create config directory if it doesn't exist
        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            settings_path: config_dir.join("settings.json"),
            last_folder_path: config_dir.join("last_folder.json"),
            config_dir,
            last_used,
        })
    }

    /// Load the settings document.
    ///
    /// # Returns
    /// The loaded AppSettings, or default if the file doesn't exist
    pub fn load_settings(&self) -> Result<AppSettings> {
        if !self.settings_path.exists() {
            tracing::warn!(
                "Settings file not found at {}, using defaults",
                self.settings_path
            );
            return Ok(AppSettings::default());
        }

        let file_contents = fs::read_to_string(&self.settings_path)
            .with_context(|| format!("Failed to read settings: {}", self.settings_path))?;

        let settings: AppSettings = serde_json::from_str(&file_contents)
            .with_context(|| format!("Failed to parse settings: {}", self.settings_path))?;

        tracing::info!("Loaded settings from {}", self.settings_path);
        Ok(settings)
    }

    /// Load the settings document, falling back to defaults on any error.
    pub fn load_settings_or_default(&self) -> AppSettings {
        self.load_settings().unwrap_or_else(|e| {
            tracing::warn!("Failed to load settings, using defaults: {:#}", e);
            AppSettings::default()
        })
    }

    /// Save the settings document.
    pub fn save_settings(&self, settings: &AppSettings) -> Result<()> {
        let json =
            serde_json::to_string_pretty(settings).context("Failed to serialize settings")?;

        fs::write(&self.settings_path, json)
            .with_context(|| format!("Failed to write settings: {}", self.settings_path))?;

        tracing::info!("Saved settings to {}", self.settings_path);
        Ok(())
    }

    /// Load the last-folder pointer.
    pub fn load_last_folder(&self) -> Result<Option<FolderRef>> {
        if !self.last_folder_path.exists() {
            return Ok(None);
        }

        let file_contents = fs::read_to_string(&self.last_folder_path).with_context(|| {
            format!("Failed to read last folder: {}", self.last_folder_path)
        })?;

        let folder: FolderRef = serde_json::from_str(&file_contents).with_context(|| {
            format!("Failed to parse last folder: {}", self.last_folder_path)
        })?;
        Ok(Some(folder))
    }

    /// Save the last-folder pointer.
    pub fn save_last_folder(&self, folder: &FolderRef) -> Result<()> {
        let json = serde_json::to_string_pretty(folder).context("Failed to serialize last folder")?;

        fs::write(&self.last_folder_path, json).with_context(|| {
            format!("Failed to write last folder: {}", self.last_folder_path)
        })?;

        tracing::debug!("Saved last folder {}", folder.path);
        Ok(())
    }

    /// Most recently recorded value for `key`, if any could be read.
    ///
    /// Read or parse failures are logged and treated as "never recorded".
    pub fn last_used<T: DeserializeOwned>(&self, key: SettingKey) -> Option<T> {
        let value = match key {
            SettingKey::Folder => match self.load_last_folder() {
                Ok(folder) => folder.and_then(|f| serde_json::to_value(f).ok()),
                Err(e) => {
                    tracing::warn!("Failed to load last folder: {:#}", e);
                    None
                }
            },
            _ => match self.last_used.get(key.as_str()) {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!("Failed to load last-used value for {}: {:#}", key, e);
                    None
                }
            },
        }?;

        match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!("Ignoring unreadable last-used value for {}: {}", key, e);
                None
            }
        }
    }

    /// Record the current runtime value for `key`.
    ///
    /// Written regardless of the setting's resolution mode. Failures are logged, never returned.
    pub fn record_last_used<T: Serialize>(&self, key: SettingKey, value: &T) {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Failed to serialize last-used value for {}: {}", key, e);
                return;
            }
        };

        let result = match key {
            SettingKey::Folder => serde_json::from_value::<FolderRef>(value)
                .context("Last folder is not a {name, path} object")
                .and_then(|folder| self.save_last_folder(&folder)),
            _ => self.last_used.put(key.as_str(), value),
        };

        if let Err(e) = result {
            tracing::warn!("Failed to record last-used value for {}: {:#}", key, e);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FlashMode, LabelingMode, SettingPolicy};
    use tempfile::TempDir;

    fn create_test_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let manager = ConfigManager::new(&config_path).unwrap();
        (manager, temp_dir)
    }

    #[test]
    fn test_load_missing_settings_gives_defaults() {
        let (manager, _temp_dir) = create_test_config_manager();
        assert_eq!(manager.load_settings().unwrap(), AppSettings::default());
    }

    #[test]
    fn test_load_save_settings() {
        let (manager, _temp_dir) = create_test_config_manager();

        let mut settings = AppSettings::default();
        settings.flash_mode = SettingPolicy::fixed(FlashMode::On);
        settings.orientation_lock_override = true;
        manager.save_settings(&settings).unwrap();

        let loaded = manager.load_settings().unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_corrupt_settings_degrade_to_default() {
        let (manager, _temp_dir) = create_test_config_manager();
        fs::write(manager.config_dir().join("settings.json"), "{ not json").unwrap();

        assert!(manager.load_settings().is_err());
        assert_eq!(manager.load_settings_or_default(), AppSettings::default());
    }

    #[test]
    fn test_last_used_round_trip() {
        let (manager, _temp_dir) = create_test_config_manager();

        assert_eq!(manager.last_used::<LabelingMode>(SettingKey::LabelingMode), None);
        manager.record_last_used(SettingKey::LabelingMode, &LabelingMode::TextGroup);
        assert_eq!(
            manager.last_used::<LabelingMode>(SettingKey::LabelingMode),
            Some(LabelingMode::TextGroup)
        );
    }

    #[test]
    fn test_folder_last_used_is_last_folder_pointer() {
        let (manager, _temp_dir) = create_test_config_manager();
        let folder = FolderRef {
            name: "Site_20240101_090000".to_string(),
            path: Utf8PathBuf::from("/captures/Site_20240101_090000"),
        };

        manager.record_last_used(SettingKey::Folder, &folder);

        assert_eq!(manager.load_last_folder().unwrap(), Some(folder.clone()));
        assert_eq!(manager.last_used::<FolderRef>(SettingKey::Folder), Some(folder));
    }

    #[test]
    fn test_failing_store_degrades_to_none() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();

        let mut store = MockKeyValueStore::new();
        store
            .expect_get()
            .returning(|_| Err(anyhow::anyhow!("backend offline")));
        store
            .expect_put()
            .returning(|_, _| Err(anyhow::anyhow!("backend offline")));

        let manager = ConfigManager::with_store(&config_path, Arc::new(store)).unwrap();

        assert_eq!(manager.last_used::<FlashMode>(SettingKey::FlashMode), None);
        // Must not panic or propagate
        manager.record_last_used(SettingKey::FlashMode, &FlashMode::Auto);
    }

    #[test]
    fn test_app_config_file_and_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let path = dir.join(APP_CONFIG_FILE);

        assert!(write_default_app_config(&path).unwrap());
        assert!(!write_default_app_config(&path).unwrap());

        let loaded = load_app_config(&path).unwrap();
        assert_eq!(loaded.log_prefix, "fieldcapture");

        fs::write(&path, "base_dir: /data/site\ndebug_mode: true\n").unwrap();
        let loaded = load_app_config(&path).unwrap();
        assert_eq!(loaded.base_dir, "/data/site");
        assert!(loaded.debug_mode);
        assert_eq!(loaded.config_dir, "FieldCapture Data");
    }

    #[derive(Clone, Default)]
    struct CapturedLog(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLog {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn test_app_config_logged_only_by_caller() {
        let temp_dir = TempDir::new().unwrap();
        let dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let path = dir.join(APP_CONFIG_FILE);
        fs::write(&path, "base_dir: /data/site\n").unwrap();

        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let loaded = load_app_config(&path).unwrap();
            assert!(log.text().is_empty());

            log_app_config(&loaded);
        });

        assert!(log.text().contains("Loaded app config: base_dir=/data/site"));
    }
}
