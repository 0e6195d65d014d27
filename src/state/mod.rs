// State management module
//
// This module provides the StateManager which owns the naming/sequencing state
// machine of the active session, wraps it with thread-safe access using
// Arc<RwLock<T>> and emits change events for the UI layer.

use crate::error::{CaptureError, CaptureResult};
use crate::metrics::Metrics;
use crate::models::{
    AppState, CaptureControls, CaptureIndex, CaptureMode, LabelingMode,
    ManualIndexEdit, PendingConfirmation, Session, SessionState, ShutterPosition,
};
use crate::services::naming::{parse_filename, sanitize};
use camino::Utf8PathBuf;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;

/// Change events emitted when state is modified
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    /// A different session folder is now active
    SessionChanged { path: Utf8PathBuf },

    /// The index of the next capture changed
    IndexChanged {
        sequence: u32,
        sub_sequence: u32,
        text_label: Option<String>,
    },

    LabelingModeChanged { mode: LabelingMode },

    /// A retake was entered, completed or cancelled
    RetakeChanged { target: Option<CaptureIndex> },

    /// Capture mode, flash, camera, shutter position or orientation lock changed
    ControlsChanged,

    /// A manual edit would overwrite `filename`; resubmit the same edit to confirm
    OverwriteWarning { filename: String },
}

/// Result of a manual index edit.
#[derive(Clone, Debug, PartialEq)]
pub enum EditOutcome {
    /// The edit was committed
    Applied(Vec<StateChange>),

    /// Nothing changed; the same edit must be submitted again to overwrite `filename`
    OverwriteWarning { filename: String },
}

/// Thread-safe owner of the session state machine with event emission
///
/// All transitions of the sequencing state go through this type:
/// - [`capture_succeeded()`](Self::capture_succeeded) advances the index per labeling mode
/// - [`advance_group()`](Self::advance_group) starts the next numbered or text group
/// - [`enter_retake()`](Self::enter_retake) / [`cancel_retake()`](Self::cancel_retake)
///   freeze the counters while an earlier capture is replaced
/// - [`apply_manual_edit()`](Self::apply_manual_edit) runs the two-step overwrite confirmation
///
/// Fallible transitions leave the state untouched when they fail.
pub struct StateManager {
    state: Arc<RwLock<AppState>>,
    state_tx: broadcast::Sender<StateChange>,
    metrics: Option<Arc<Metrics>>,
}

impl StateManager {
    /// Create a new StateManager seeded with `initial`
    ///
    /// The broadcast channel buffers 100 events
    pub fn new(initial: AppState) -> Self {
        let (state_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(initial)),
            state_tx,
            metrics: None,
        }
    }

    /// Create a StateManager that records update and broadcast counts
    pub fn with_metrics(initial: AppState, metrics: Arc<Metrics>) -> Self {
        let mut manager = Self::new(initial);
        manager.metrics = Some(metrics);
        manager
    }

    /// Get a cloned snapshot of the current state
    pub fn snapshot(&self) -> AppState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Execute a function with read access to the state
    ///
    /// # Example
    /// ```ignore
    /// let sequence = state_manager.read(|state| state.session.sequence);
    /// ```
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&AppState) -> R,
    {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    /// Update the state and emit change events
    ///
    /// # Returns
    /// The StateChange events that were emitted
    pub fn update<F>(&self, update_fn: F) -> Vec<StateChange>
    where
        F: FnOnce(&mut AppState),
    {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let old_state = state.clone();

        update_fn(&mut state);

        let changes = Self::detect_changes(&old_state, &state);
        drop(state);

        self.emit(&changes);
        changes
    }

    /// Apply a fallible update to a copy of the state and commit it only on success
    pub fn try_update<F>(&self, update_fn: F) -> CaptureResult<Vec<StateChange>>
    where
        F: FnOnce(&mut AppState) -> CaptureResult<()>,
    {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let mut working = state.clone();

        update_fn(&mut working)?;

        let changes = Self::detect_changes(&state, &working);
        *state = working;
        drop(state);

        self.emit(&changes);
        Ok(changes)
    }

    /// Subscribe to state change events
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    fn emit(&self, changes: &[StateChange]) {
        if let Some(metrics) = &self.metrics {
            metrics.record_state_update();
        }
        for change in changes {
            self.send(change.clone());
        }
    }

    fn send(&self, change: StateChange) {
        // No subscribers is fine
        let sent = self.state_tx.send(change).is_ok();
        if let Some(metrics) = &self.metrics {
            if sent {
                metrics.record_state_broadcast();
            } else {
                metrics.record_state_broadcast_error();
            }
        }
    }

    /// Detect what changed between two states and generate events
    fn detect_changes(old: &AppState, new: &AppState) -> Vec<StateChange> {
        let mut changes = Vec::new();
        let (old_s, new_s) = (&old.session, &new.session);

        if old_s.session.path != new_s.session.path {
            changes.push(StateChange::SessionChanged {
                path: new_s.session.path.clone(),
            });
        }

        if old_s.labeling_mode != new_s.labeling_mode {
            changes.push(StateChange::LabelingModeChanged {
                mode: new_s.labeling_mode,
            });
        }

        if old_s.sequence != new_s.sequence
            || old_s.sub_sequence != new_s.sub_sequence
            || old_s.text_label != new_s.text_label
        {
            changes.push(StateChange::IndexChanged {
                sequence: new_s.sequence,
                sub_sequence: new_s.sub_sequence,
                text_label: new_s.text_label.clone(),
            });
        }

        if old_s.retake_target != new_s.retake_target {
            changes.push(StateChange::RetakeChanged {
                target: new_s.retake_target.clone(),
            });
        }

        if old.controls != new.controls {
            changes.push(StateChange::ControlsChanged);
        }

        changes
    }

    // Session lifecycle

    /// Replace the whole session state, e.g. after switching folders
    pub fn replace_session(&self, session_state: SessionState) -> Vec<StateChange> {
        self.update(|state| state.session = session_state)
    }

    /// Point the active state at a renamed folder, keeping its counters
    pub fn repoint_session(&self, session: Session) -> Vec<StateChange> {
        self.update(|state| state.session.session = session)
    }

    // Sequencing transitions

    /// Index the next capture must be written under
    pub fn capture_target(&self) -> CaptureResult<CaptureIndex> {
        self.read(|state| state.session.current_index())
            .ok_or(CaptureError::LabelRequired)
    }

    /// Advance the counters after a capture was written under `index`
    ///
    /// A retake only clears its target; counters are never touched by retakes.
    pub fn capture_succeeded(&self, index: &CaptureIndex) -> Vec<StateChange> {
        self.update(|state| {
            let s = &mut state.session;
            s.clear_confirmation();

            if s.retake_target.take().is_some() {
                return;
            }

            match s.labeling_mode {
                LabelingMode::Single => s.sequence = s.sequence.saturating_add(1),
                LabelingMode::NumberedGroup => s.sub_sequence = s.sub_sequence.saturating_add(1),
                LabelingMode::TextGroup => {
                    if let Some(label) = index.text_label() {
                        s.used_labels.insert(label.to_string());
                    }
                    s.sub_sequence = s.sub_sequence.saturating_add(1);
                }
            }
        })
    }

    /// Start the next group
    ///
    /// Numbered groups move to the next sequence. Text groups require a new
    /// label that has not been used in this folder yet. In single mode there
    /// are no groups and nothing changes.
    pub fn advance_group(&self, next_label: Option<&str>) -> CaptureResult<Vec<StateChange>> {
        self.try_update(|state| {
            let s = &mut state.session;
            match s.labeling_mode {
                LabelingMode::Single => {
                    tracing::debug!("advance_group ignored in single mode");
                }
                LabelingMode::NumberedGroup => {
                    s.sequence = s.sequence.saturating_add(1);
                    s.sub_sequence = 1;
                    s.clear_confirmation();
                }
                LabelingMode::TextGroup => {
                    let label = next_label.ok_or(CaptureError::LabelRequired)?;
                    accept_label(s, label)?;
                }
            }
            Ok(())
        })
    }

    /// Set the label of the current text group
    pub fn set_text_label(&self, label: &str) -> CaptureResult<Vec<StateChange>> {
        self.try_update(|state| accept_label(&mut state.session, label))
    }

    /// Switch labeling mode without resetting the sequence
    ///
    /// Entering text-group mode clears the active label so a new one must be
    /// chosen before the next capture.
    pub fn set_labeling_mode(&self, mode: LabelingMode) -> Vec<StateChange> {
        self.update(|state| {
            let s = &mut state.session;
            if s.labeling_mode == mode {
                return;
            }
            s.labeling_mode = mode;
            s.sub_sequence = 1;
            s.clear_confirmation();
            if mode == LabelingMode::TextGroup {
                s.text_label = None;
            }
        })
    }

    /// Target an earlier capture for replacement
    pub fn enter_retake(&self, filename: &str) -> CaptureResult<Vec<StateChange>> {
        let target = parse_filename(filename)
            .ok_or_else(|| CaptureError::UnrecognizedFilename(filename.to_string()))?;
        Ok(self.update(|state| {
            state.session.clear_confirmation();
            state.session.retake_target = Some(target);
        }))
    }

    pub fn cancel_retake(&self) -> Vec<StateChange> {
        self.update(|state| {
            state.session.clear_confirmation();
            state.session.retake_target = None;
        })
    }

    /// Index a manual edit would produce, without applying it
    ///
    /// `None` when no index can be formed yet (text-group mode without a label).
    pub fn preview_manual_edit(&self, edit: &ManualIndexEdit) -> CaptureResult<Option<CaptureIndex>> {
        let (sequence, sub_sequence) = validate_edit(edit)?;
        Ok(self.read(|state| {
            let mut preview = state.session.clone();
            preview.retake_target = None;
            apply_edit(&mut preview, sequence, sub_sequence);
            preview.current_index()
        }))
    }

    /// Commit a manual edit, or warn first if it lands on an existing file
    ///
    /// `existing_filename` is the filename the edit resolves to when that file
    /// already exists. The first such request only records a
    /// [`PendingConfirmation`] and returns [`EditOutcome::OverwriteWarning`];
    /// submitting the identical request again commits it.
    pub fn apply_manual_edit(
        &self,
        edit: &ManualIndexEdit,
        existing_filename: Option<String>,
    ) -> CaptureResult<EditOutcome> {
        let (sequence, sub_sequence) = validate_edit(edit)?;

        let Some(filename) = existing_filename else {
            let changes = self.update(|state| {
                let s = &mut state.session;
                apply_edit(s, sequence, sub_sequence);
                s.clear_confirmation();
            });
            return Ok(EditOutcome::Applied(changes));
        };

        let request = PendingConfirmation {
            edit: edit.clone(),
            filename,
        };

        let confirmed = self.read(|state| state.session.pending_confirmation.as_ref() == Some(&request));
        if confirmed {
            tracing::info!("Overwrite of {} confirmed", request.filename);
            let changes = self.update(|state| {
                let s = &mut state.session;
                apply_edit(s, sequence, sub_sequence);
                s.pending_confirmation = None;
                s.overwrite_confirmed = Some(request.filename);
            });
            return Ok(EditOutcome::Applied(changes));
        }

        tracing::warn!("Manual edit would overwrite {}, awaiting confirmation", request.filename);
        let filename = request.filename.clone();
        self.update(|state| state.session.pending_confirmation = Some(request));
        self.send(StateChange::OverwriteWarning {
            filename: filename.clone(),
        });
        Ok(EditOutcome::OverwriteWarning { filename })
    }

    // Capture controls

    pub fn set_capture_mode(&self, mode: CaptureMode) -> Vec<StateChange> {
        self.update(|state| state.controls.capture_mode = mode)
    }

    pub fn toggle_flash(&self) -> Vec<StateChange> {
        self.update(|state| state.controls.flash_mode = state.controls.flash_mode.toggled())
    }

    pub fn toggle_camera_position(&self) -> Vec<StateChange> {
        self.update(|state| {
            state.controls.camera_position = state.controls.camera_position.toggled()
        })
    }

    pub fn set_shutter_position(&self, position: ShutterPosition) -> Vec<StateChange> {
        self.update(|state| state.controls.shutter_position = position.clamped())
    }

    /// Replace all controls at once, e.g. after settings were re-resolved
    pub fn replace_controls(&self, controls: CaptureControls) -> Vec<StateChange> {
        self.update(|state| state.controls = controls)
    }
}

impl Clone for StateManager {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            state_tx: self.state_tx.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

fn accept_label(s: &mut SessionState, raw: &str) -> CaptureResult<()> {
    let label = sanitize(raw);
    if label.is_empty() {
        return Err(CaptureError::LabelRequired);
    }
    if s.used_labels.contains(&label) {
        return Err(CaptureError::DuplicateLabel(label));
    }
    if label.bytes().all(|b| b.is_ascii_digit()) {
        tracing::warn!("Label {:?} is numeric and will read back as a sequence", label);
    }

    s.text_label = Some(label);
    s.sub_sequence = 1;
    s.clear_confirmation();
    Ok(())
}

fn validate_edit(edit: &ManualIndexEdit) -> CaptureResult<(Option<u32>, Option<u32>)> {
    if edit.sequence.is_none() && edit.sub_sequence.is_none() {
        return Err(CaptureError::InvalidIndex("nothing to edit".to_string()));
    }
    let sequence = edit.sequence.as_deref().map(parse_positive).transpose()?;
    let sub_sequence = edit.sub_sequence.as_deref().map(parse_positive).transpose()?;
    Ok((sequence, sub_sequence))
}

fn parse_positive(raw: &str) -> CaptureResult<u32> {
    let trimmed = raw.trim();
    match trimmed.parse::<u32>() {
        Ok(n) if n > 0 && trimmed.bytes().all(|b| b.is_ascii_digit()) => Ok(n),
        _ => Err(CaptureError::InvalidIndex(format!(
            "{:?} is not a positive number",
            raw
        ))),
    }
}

fn apply_edit(s: &mut SessionState, sequence: Option<u32>, sub_sequence: Option<u32>) {
    if let Some(sequence) = sequence {
        s.sequence = sequence;
    }
    if let Some(sub_sequence) = sub_sequence {
        s.sub_sequence = sub_sequence;
    }
}
