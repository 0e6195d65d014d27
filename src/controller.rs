// Session Controller - ties the capture pipeline together
//
// This module contains the SessionController which coordinates between:
// - SessionStore (folder lifecycle)
// - StateManager (sequencing state machine and capture controls)
// - ConfigManager (settings document, last-used values, last-folder pointer)
// - CaptureArchiver (retakes and confirmed overwrites)
//
// The camera itself is an external collaborator: it either asks for a target
// path (prepare/complete) or hands over encoded bytes (save_capture).

use crate::config::ConfigManager;
use crate::error::{CaptureError, CaptureResult};
use crate::metrics::Metrics;
use crate::models::{
    AppSettings, AppState, CaptureIndex, CaptureMode, LabelingMode, ManualIndexEdit, MediaKind,
    Session, SessionState, SettingKey, ShutterPosition,
};
use crate::services::archiver::archive_existing;
use crate::services::naming::{CollisionScheme, format_filename, root_capture_filename};
use crate::services::sequence::{
    exists, first_free_name, highest_sequence_in, labels_in, media_filenames, unique_filename,
};
use crate::services::session_store::SessionStore;
use crate::services::settings_resolver::{ResolvedSettings, resolve_settings};
use crate::state::{EditOutcome, StateChange, StateManager};
use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::{Mutex, broadcast};

/// Where the next capture goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureTarget {
    /// Full path the capture must be written to
    pub path: Utf8PathBuf,

    pub filename: String,

    /// Index the capture is written under; `None` for root-session captures
    pub index: Option<CaptureIndex>,

    /// Where a replaced file was moved, for retakes and confirmed overwrites
    pub archived: Option<Utf8PathBuf>,
}

/// Coordinates sessions, sequencing state and persisted settings
///
/// # Example
/// ```ignore
/// let config = Arc::new(ConfigManager::new("FieldCapture Data")?);
/// let store = SessionStore::new("Captures");
/// let controller = SessionController::startup(config, store, Arc::new(Metrics::new())).await?;
///
/// let target = controller.save_capture(MediaKind::Photo, &jpeg_bytes).await?;
/// println!("saved {}", target.path);
/// ```
pub struct SessionController {
    store: SessionStore,
    config: Arc<ConfigManager>,
    state: Arc<StateManager>,
    metrics: Arc<Metrics>,

    /// Serializes capture writes and folder operations; one operator, one writer
    in_flight: Mutex<()>,
}

impl SessionController {
    /// Build a controller from persisted settings
    ///
    /// Settings that cannot be loaded degrade to defaults, and a resolved
    /// folder that no longer exists falls back to the root session. Only
    /// failures to create or read the base directory abort startup.
    pub async fn startup(
        config: Arc<ConfigManager>,
        store: SessionStore,
        metrics: Arc<Metrics>,
    ) -> CaptureResult<Self> {
        store.ensure_base_dir().await?;

        let settings = config.load_settings_or_default();
        let resolved = resolve_settings(&settings, &config, &store).await?;

        let session_state = scan_session(resolved.session, resolved.labeling_mode).await?;
        config.record_last_used(SettingKey::Folder, &session_state.session.folder_ref());

        tracing::info!(
            "Opened session {} at sequence {} ({} mode)",
            session_state.session.path,
            session_state.sequence,
            session_state.labeling_mode
        );

        let state = StateManager::with_metrics(
            AppState::new(session_state, resolved.controls),
            Arc::clone(&metrics),
        );

        Ok(Self {
            store,
            config,
            state: Arc::new(state),
            metrics,
            in_flight: Mutex::new(()),
        })
    }

    pub fn state(&self) -> &Arc<StateManager> {
        &self.state
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn config(&self) -> &Arc<ConfigManager> {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Subscribe to state change events
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state.subscribe()
    }

    /// Session captures currently go to
    pub fn active_session(&self) -> Session {
        self.state.read(|state| state.session.session.clone())
    }

    // ========== Session lifecycle ==========

    pub async fn list_sessions(&self) -> CaptureResult<Vec<Session>> {
        self.store.list().await
    }

    /// Switch to the session at `path`
    ///
    /// A folder that vanished resets to the root session. Either way the
    /// opened folder is persisted as the last folder.
    pub async fn open_session(&self, path: &Utf8Path) -> CaptureResult<Session> {
        let _guard = self.in_flight.lock().await;
        self.open_locked(path).await
    }

    /// Create a new session folder and switch to it
    pub async fn create_session(&self, prefix: &str) -> CaptureResult<Session> {
        let _guard = self.in_flight.lock().await;
        let session = self.store.create(prefix).await?;
        self.metrics.record_session_created();
        self.open_locked(&session.path).await
    }

    /// Rename the session at `path`; the active session follows the rename
    pub async fn rename_session(&self, path: &Utf8Path, new_name: &str) -> CaptureResult<Session> {
        let _guard = self.in_flight.lock().await;
        let session = self.existing_session(path).await?;
        let renamed = self.store.rename(&session, new_name).await?;
        self.metrics.record_session_renamed();

        if self.is_active(path) {
            self.state.repoint_session(renamed.clone());
            self.config
                .record_last_used(SettingKey::Folder, &renamed.folder_ref());
        }
        Ok(renamed)
    }

    /// Delete the session at `path`; deleting the active session switches to root
    pub async fn delete_session(&self, path: &Utf8Path) -> CaptureResult<()> {
        let _guard = self.in_flight.lock().await;
        let session = self.existing_session(path).await?;
        self.store.delete(&session).await?;
        self.metrics.record_session_deleted();

        if self.is_active(path) {
            let root = self.store.base_dir().to_path_buf();
            self.open_locked(&root).await?;
        }
        Ok(())
    }

    async fn open_locked(&self, path: &Utf8Path) -> CaptureResult<Session> {
        let session = match self.store.session_at(path).await? {
            Some(session) => session,
            None => {
                tracing::warn!("Session folder {} is gone, switching to root", path);
                self.store.root().await?
            }
        };

        let mode = self.state.read(|state| state.session.labeling_mode);
        let session_state = scan_session(session.clone(), mode).await?;
        tracing::info!(
            "Opened session {} at sequence {}",
            session.path,
            session_state.sequence
        );

        self.state.replace_session(session_state);
        self.config
            .record_last_used(SettingKey::Folder, &session.folder_ref());
        Ok(session)
    }

    async fn existing_session(&self, path: &Utf8Path) -> CaptureResult<Session> {
        self.store
            .session_at(path)
            .await?
            .ok_or_else(|| CaptureError::SessionNotFound(path.to_path_buf()))
    }

    fn is_active(&self, path: &Utf8Path) -> bool {
        self.state
            .read(|state| state.session.session.path.as_path() == path)
    }

    // ========== Capture pipeline ==========

    /// Choose the path for the next capture of `kind`
    ///
    /// - Root session: `IMG_/VID_<timestamp>_<ID>`, sequencing untouched
    /// - Retake or confirmed overwrite: the existing file is archived first and
    ///   its name reused; an archive failure blocks the capture
    /// - Otherwise: the first free `_K` variant of the formatted name
    pub async fn prepare_capture(&self, kind: MediaKind) -> CaptureResult<CaptureTarget> {
        let session = self.state.read(|state| state.session.clone());
        let folder = session.session.path.clone();

        if self.store.is_root(&session.session) {
            let name = root_capture_filename(kind, self.store.now());
            let filename = first_free_name(&folder, &name, CollisionScheme::Counter).await?;
            return Ok(CaptureTarget {
                path: folder.join(&filename),
                filename,
                index: None,
                archived: None,
            });
        }

        let index = session
            .current_index()
            .ok_or(CaptureError::LabelRequired)?;
        let planned = format_filename(&index, kind.extension());

        if session.may_overwrite(&planned) {
            let archived = archive_existing(&folder, &planned)
                .await
                .inspect_err(|_| self.metrics.record_archive_failure())?;
            if archived.is_some() {
                self.metrics.record_capture_archived();
            }
            return Ok(CaptureTarget {
                path: folder.join(&planned),
                filename: planned,
                index: Some(index),
                archived,
            });
        }

        let filename = unique_filename(&folder, &index, kind.extension()).await?;
        if filename != planned {
            self.metrics.record_collision_suffix();
        }
        Ok(CaptureTarget {
            path: folder.join(&filename),
            filename,
            index: Some(index),
            archived: None,
        })
    }

    /// Advance the sequencing state after `target` was written
    pub fn complete_capture(&self, target: &CaptureTarget) -> Vec<StateChange> {
        self.metrics.record_capture_saved();
        tracing::info!("Saved capture {}", target.path);

        match &target.index {
            Some(index) => self.state.capture_succeeded(index),
            None => Vec::new(),
        }
    }

    /// Give up on a prepared capture; cancels a pending retake
    pub fn abort_capture(&self) -> Vec<StateChange> {
        tracing::debug!("Capture aborted");
        self.state.cancel_retake()
    }

    /// Prepare, write `bytes` and advance the state in one step
    ///
    /// If the prepared name was taken in the meantime, the first free `_vK`
    /// variant is written instead.
    pub async fn save_capture(&self, kind: MediaKind, bytes: &[u8]) -> CaptureResult<CaptureTarget> {
        let _guard = self.in_flight.lock().await;
        let mut target = self.prepare_capture(kind).await?;

        if exists(&target.path).await? {
            let folder = self.state.read(|state| state.session.session.path.clone());
            let filename =
                first_free_name(&folder, &target.filename, CollisionScheme::Version).await?;
            self.metrics.record_collision_suffix();
            target.path = folder.join(&filename);
            target.filename = filename;
        }

        fs::write(&target.path, bytes).await.map_err(|e| {
            tracing::error!("Failed to write capture {}: {}", target.path, e);
            CaptureError::storage("write", target.path.as_path(), e)
        })?;

        self.complete_capture(&target);
        Ok(target)
    }

    // ========== Sequencing ==========

    /// Manually override the index, with two-step confirmation on overwrite
    pub async fn manual_index_edit(&self, edit: &ManualIndexEdit) -> CaptureResult<EditOutcome> {
        let existing = match self.state.preview_manual_edit(edit)? {
            Some(index) => {
                let (folder, kind) = self.state.read(|state| {
                    (
                        state.session.session.path.clone(),
                        state.controls.capture_mode.media_kind(),
                    )
                });
                let filename = format_filename(&index, kind.extension());
                exists(&folder.join(&filename)).await?.then_some(filename)
            }
            None => None,
        };

        self.state.apply_manual_edit(edit, existing)
    }

    pub fn advance_group(&self, next_label: Option<&str>) -> CaptureResult<Vec<StateChange>> {
        self.state.advance_group(next_label)
    }

    pub fn set_text_label(&self, label: &str) -> CaptureResult<Vec<StateChange>> {
        self.state.set_text_label(label)
    }

    /// Retake the capture stored as `filename` in the active session
    ///
    /// Root-session captures are never sequenced, so they cannot be retaken.
    pub fn enter_retake(&self, filename: &str) -> CaptureResult<Vec<StateChange>> {
        if self.store.is_root(&self.active_session()) {
            return Err(CaptureError::RootSessionProtected("used for retakes"));
        }
        self.state.enter_retake(filename)
    }

    pub fn cancel_retake(&self) -> Vec<StateChange> {
        self.state.cancel_retake()
    }

    // ========== Controls (each records its last-used value) ==========

    pub fn set_labeling_mode(&self, mode: LabelingMode) -> Vec<StateChange> {
        let changes = self.state.set_labeling_mode(mode);
        self.config.record_last_used(SettingKey::LabelingMode, &mode);
        changes
    }

    /// Cycle single → numbered group → text group → single
    pub fn cycle_labeling_mode(&self) -> Vec<StateChange> {
        let next = self.state.read(|state| state.session.labeling_mode.next());
        self.set_labeling_mode(next)
    }

    pub fn set_capture_mode(&self, mode: CaptureMode) -> Vec<StateChange> {
        let changes = self.state.set_capture_mode(mode);
        self.config.record_last_used(SettingKey::CaptureMode, &mode);
        changes
    }

    pub fn toggle_flash(&self) -> Vec<StateChange> {
        let changes = self.state.toggle_flash();
        let flash = self.state.read(|state| state.controls.flash_mode);
        self.config.record_last_used(SettingKey::FlashMode, &flash);
        changes
    }

    pub fn toggle_camera_position(&self) -> Vec<StateChange> {
        let changes = self.state.toggle_camera_position();
        let position = self.state.read(|state| state.controls.camera_position);
        self.config
            .record_last_used(SettingKey::CameraPosition, &position);
        changes
    }

    pub fn set_shutter_position(&self, position: ShutterPosition) -> Vec<StateChange> {
        let changes = self.state.set_shutter_position(position);
        let stored = self.state.read(|state| state.controls.shutter_position);
        self.config
            .record_last_used(SettingKey::ShutterPosition, &stored);
        changes
    }

    pub fn set_orientation_lock_override(&self, enabled: bool) -> Vec<StateChange> {
        self.state
            .update(|state| state.controls.orientation_lock_override = enabled)
    }

    // ========== Settings ==========

    /// Persist a new settings document and apply what it resolves to
    pub async fn apply_settings(&self, settings: &AppSettings) -> Result<ResolvedSettings> {
        self.config.save_settings(settings)?;

        let resolved = resolve_settings(settings, &self.config, &self.store).await?;
        self.state.replace_controls(resolved.controls.clone());
        self.state.set_labeling_mode(resolved.labeling_mode);
        self.record_resolved(&resolved);

        if !self.is_active(&resolved.session.path) {
            self.open_session(&resolved.session.path).await?;
        }

        Ok(resolved)
    }

    fn record_resolved(&self, resolved: &ResolvedSettings) {
        let controls = &resolved.controls;
        self.config
            .record_last_used(SettingKey::LabelingMode, &resolved.labeling_mode);
        self.config
            .record_last_used(SettingKey::CaptureMode, &controls.capture_mode);
        self.config
            .record_last_used(SettingKey::FlashMode, &controls.flash_mode);
        self.config
            .record_last_used(SettingKey::CameraPosition, &controls.camera_position);
        self.config
            .record_last_used(SettingKey::ShutterPosition, &controls.shutter_position);
    }
}

/// Fresh state for `session` from a single scan of its media files
async fn scan_session(session: Session, mode: LabelingMode) -> CaptureResult<SessionState> {
    let names = media_filenames(&session.path).await?;
    let highest = highest_sequence_in(names.iter().map(String::as_str));
    let used_labels = labels_in(names.iter().map(String::as_str));

    tracing::debug!(
        "Scanned {}: {} media files, highest sequence {}, {} labels",
        session.path,
        names.len(),
        highest,
        used_labels.len()
    );
    Ok(SessionState::for_session(session, highest, used_labels, mode))
}
