//! Integration tests for settings persistence and startup resolution

use camino::Utf8PathBuf;
use fieldcapture::models::{
    AppSettings, CameraPosition, FlashMode, FolderRef, LabelingMode, SettingKey, SettingPolicy,
    ShutterPosition,
};
use fieldcapture::services::{ResolutionSource, resolve_settings};
use fieldcapture::{ConfigManager, Metrics, SessionController, SessionStore};
use std::sync::Arc;
use tempfile::TempDir;

fn setup() -> (TempDir, Arc<ConfigManager>, SessionStore) {
    let temp_dir = TempDir::new().unwrap();
    let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    let config = Arc::new(ConfigManager::new(root.join("config")).unwrap());
    let store = SessionStore::new(root.join("captures"));
    std::fs::create_dir_all(store.base_dir()).unwrap();
    (temp_dir, config, store)
}

#[tokio::test]
async fn test_fixed_folder_deleted_resolves_to_root() {
    let (_guard, config, store) = setup();
    let session = store.create("Site").await.unwrap();
    std::fs::remove_dir_all(&session.path).unwrap();

    let settings = AppSettings {
        folder: SettingPolicy::fixed(session.folder_ref()),
        ..AppSettings::default()
    };
    let resolved = resolve_settings(&settings, &config, &store).await.unwrap();

    assert!(store.is_root(&resolved.session));
    assert_eq!(resolved.sources[&SettingKey::Folder], ResolutionSource::Fixed);
}

#[tokio::test]
async fn test_fixed_folder_that_exists_is_opened() {
    let (_guard, config, store) = setup();
    let session = store.create("Site").await.unwrap();

    let settings = AppSettings {
        folder: SettingPolicy::fixed(session.folder_ref()),
        ..AppSettings::default()
    };
    let resolved = resolve_settings(&settings, &config, &store).await.unwrap();

    assert_eq!(resolved.session.path, session.path);
}

#[tokio::test]
async fn test_last_used_history_is_kept_in_every_mode() {
    let (_guard, config, store) = setup();

    // Changes made while every setting is in default mode
    let controller =
        SessionController::startup(Arc::clone(&config), store.clone(), Arc::new(Metrics::new()))
            .await
            .unwrap();
    let session = controller.create_session("Site").await.unwrap();
    controller.set_labeling_mode(LabelingMode::NumberedGroup);
    controller.toggle_flash();
    controller.toggle_flash();
    controller.toggle_camera_position();
    controller.set_shutter_position(ShutterPosition { x: 1.7, y: 0.25 });
    drop(controller);

    let settings = AppSettings {
        folder: SettingPolicy::last_used(),
        shutter_position: SettingPolicy::last_used(),
        labeling_mode: SettingPolicy::last_used(),
        capture_mode: SettingPolicy::last_used(),
        flash_mode: SettingPolicy::last_used(),
        camera_position: SettingPolicy::last_used(),
        orientation_lock_override: false,
    };
    let resolved = resolve_settings(&settings, &config, &store).await.unwrap();

    assert_eq!(resolved.session.path, session.path);
    assert_eq!(resolved.labeling_mode, LabelingMode::NumberedGroup);
    assert_eq!(resolved.controls.flash_mode, FlashMode::Auto);
    assert_eq!(resolved.controls.camera_position, CameraPosition::Front);
    assert_eq!(
        resolved.controls.shutter_position,
        ShutterPosition { x: 1.0, y: 0.25 }
    );
    // Never recorded
    assert_eq!(
        resolved.sources[&SettingKey::CaptureMode],
        ResolutionSource::Default
    );
    assert_eq!(
        resolved.sources[&SettingKey::FlashMode],
        ResolutionSource::LastUsed
    );
}

#[tokio::test]
async fn test_default_mode_ignores_history() {
    let (_guard, config, store) = setup();
    config.record_last_used(SettingKey::FlashMode, &FlashMode::On);

    let resolved = resolve_settings(&AppSettings::default(), &config, &store)
        .await
        .unwrap();

    assert_eq!(resolved.controls.flash_mode, FlashMode::Off);
    assert!(store.is_root(&resolved.session));
    assert_eq!(resolved.sources.len(), SettingKey::ALL.len());
}

#[tokio::test]
async fn test_startup_survives_corrupt_settings() {
    let (_guard, config, store) = setup();
    std::fs::write(config.config_dir().join("settings.json"), "{{{{").unwrap();
    std::fs::write(
        config.config_dir().join("last_folder.json"),
        "not json either",
    )
    .unwrap();

    let controller = SessionController::startup(config, store, Arc::new(Metrics::new()))
        .await
        .unwrap();

    assert_eq!(controller.active_session().name, "Default");
}

#[tokio::test]
async fn test_apply_settings_switches_folder_and_controls() {
    let (_guard, config, store) = setup();
    let site = store.create("Site").await.unwrap();
    let controller =
        SessionController::startup(Arc::clone(&config), store, Arc::new(Metrics::new()))
            .await
            .unwrap();

    let settings = AppSettings {
        folder: SettingPolicy::fixed(FolderRef {
            name: site.name.clone(),
            path: site.path.clone(),
        }),
        camera_position: SettingPolicy::fixed(CameraPosition::Front),
        flash_mode: SettingPolicy::fixed(FlashMode::On),
        ..AppSettings::default()
    };
    controller.apply_settings(&settings).await.unwrap();

    assert_eq!(controller.active_session().path, site.path);
    assert_eq!(
        controller.state().read(|s| s.controls.camera_position),
        CameraPosition::Front
    );
    assert_eq!(config.load_settings().unwrap(), settings);

    // Applied values become the new last-used values
    assert_eq!(
        config.last_used::<CameraPosition>(SettingKey::CameraPosition),
        Some(CameraPosition::Front)
    );
    assert_eq!(
        config.last_used::<FlashMode>(SettingKey::FlashMode),
        Some(FlashMode::On)
    );
    assert_eq!(
        config.last_used::<LabelingMode>(SettingKey::LabelingMode),
        Some(LabelingMode::Single)
    );
}

#[test]
fn test_settings_document_field_names() {
    let (_guard, config, _store) = setup();
    let settings = AppSettings {
        flash_mode: SettingPolicy::fixed(FlashMode::Auto),
        ..AppSettings::default()
    };
    config.save_settings(&settings).unwrap();

    let raw = std::fs::read_to_string(config.config_dir().join("settings.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();

    assert_eq!(json["flashMode"]["mode"], "fixed");
    assert_eq!(json["flashMode"]["fixedValue"], "auto");
    assert_eq!(json["labelingMode"]["mode"], "default");
    assert_eq!(json["orientationLockOverride"], false);
}

#[test]
fn test_resolution_from_sync_context() {
    let (_guard, config, store) = setup();
    config.record_last_used(SettingKey::LabelingMode, &LabelingMode::TextGroup);
    let settings = AppSettings {
        labeling_mode: SettingPolicy::last_used(),
        ..AppSettings::default()
    };

    let resolved = tokio_test::block_on(resolve_settings(&settings, &config, &store)).unwrap();

    assert_eq!(resolved.labeling_mode, LabelingMode::TextGroup);
}
