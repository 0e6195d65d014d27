//! Startup resolution of the six `default | fixed | lastUsed` settings.
//!
//! Every setting is described by the same tuple (key, policy, hard default)
//! and resolved by [`resolve_setting`]:
//! - `fixed`: the stored fixed value, or the default when none is stored
//! - `lastUsed`: the recorded last-used value, or the default when never recorded
//! - `default`: the hard default

use crate::config::ConfigManager;
use crate::error::CaptureResult;
use crate::models::{
    AppSettings, CaptureControls, FolderRef, LabelingMode, Session, SettingKey, SettingMode,
    SettingPolicy,
};
use crate::services::session_store::SessionStore;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    Default,
    Fixed,
    LastUsed,
}

/// One row of the settings table.
#[derive(Debug, Clone)]
pub struct SettingEntry<'a, T> {
    pub key: SettingKey,
    pub policy: &'a SettingPolicy<T>,
    pub default: T,
}

/// Resolve one setting against its policy and the last-used lookup.
pub fn resolve_setting<T, F>(entry: SettingEntry<'_, T>, last_used: F) -> (T, ResolutionSource)
where
    T: Clone,
    F: FnOnce(SettingKey) -> Option<T>,
{
    match entry.policy.mode {
        SettingMode::Fixed => match &entry.policy.fixed_value {
            Some(value) => (value.clone(), ResolutionSource::Fixed),
            None => {
                tracing::warn!("{} is fixed but has no fixed value, using default", entry.key);
                (entry.default, ResolutionSource::Default)
            }
        },
        SettingMode::LastUsed => match last_used(entry.key) {
            Some(value) => (value, ResolutionSource::LastUsed),
            None => {
                tracing::debug!("{} has no last-used value yet, using default", entry.key);
                (entry.default, ResolutionSource::Default)
            }
        },
        SettingMode::Default => (entry.default, ResolutionSource::Default),
    }
}

/// Runtime values seeded from the settings document.
#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    /// Session to open; root when the resolved folder is missing on disk.
    pub session: Session,
    pub labeling_mode: LabelingMode,
    pub controls: CaptureControls,
    /// Source of every resolved value, in table order.
    pub sources: IndexMap<SettingKey, ResolutionSource>,
}

fn resolve_with<T>(
    config: &ConfigManager,
    sources: &mut IndexMap<SettingKey, ResolutionSource>,
    key: SettingKey,
    policy: &SettingPolicy<T>,
    default: T,
) -> T
where
    T: Clone + DeserializeOwned,
{
    let entry = SettingEntry {
        key,
        policy,
        default,
    };
    let (value, source) = resolve_setting(entry, |k| config.last_used::<T>(k));
    sources.insert(key, source);
    value
}

/// Resolve all settings and locate the folder to open.
///
/// A resolved folder that no longer exists falls back to the root session.
pub async fn resolve_settings(
    settings: &AppSettings,
    config: &ConfigManager,
    store: &SessionStore,
) -> CaptureResult<ResolvedSettings> {
    let mut sources = IndexMap::new();
    let root = store.root().await?;

    let folder = resolve_with(
        config,
        &mut sources,
        SettingKey::Folder,
        &settings.folder,
        root.folder_ref(),
    );
    let shutter_position = resolve_with(
        config,
        &mut sources,
        SettingKey::ShutterPosition,
        &settings.shutter_position,
        Default::default(),
    );
    let labeling_mode = resolve_with(
        config,
        &mut sources,
        SettingKey::LabelingMode,
        &settings.labeling_mode,
        LabelingMode::default(),
    );
    let capture_mode = resolve_with(
        config,
        &mut sources,
        SettingKey::CaptureMode,
        &settings.capture_mode,
        Default::default(),
    );
    let flash_mode = resolve_with(
        config,
        &mut sources,
        SettingKey::FlashMode,
        &settings.flash_mode,
        Default::default(),
    );
    let camera_position = resolve_with(
        config,
        &mut sources,
        SettingKey::CameraPosition,
        &settings.camera_position,
        Default::default(),
    );

    let session = locate_folder(store, &folder, root).await?;

    for (key, source) in &sources {
        tracing::info!("Resolved {} from {:?}", key, source);
    }

    Ok(ResolvedSettings {
        session,
        labeling_mode,
        controls: CaptureControls {
            capture_mode,
            flash_mode,
            camera_position,
            shutter_position: shutter_position.clamped(),
            orientation_lock_override: settings.orientation_lock_override,
        },
        sources,
    })
}

async fn locate_folder(
    store: &SessionStore,
    folder: &FolderRef,
    root: Session,
) -> CaptureResult<Session> {
    match store.session_at(folder.path()).await? {
        Some(session) => Ok(session),
        None => {
            tracing::warn!(
                "Folder {} ({}) no longer exists, falling back to root session",
                folder.name,
                folder.path
            );
            Ok(root)
        }
    }
}
