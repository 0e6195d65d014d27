use crate::models::{
    CameraPosition, CaptureIndex, CaptureMode, FlashMode, LabelingMode, Session, ShutterPosition,
};
use std::collections::HashSet;

/// Operator request to override the current index by hand.
///
/// Fields hold the raw text entered by the operator; validation happens in
/// [`crate::state::StateManager::apply_manual_edit`]. `None` leaves the
/// corresponding counter untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ManualIndexEdit {
    pub sequence: Option<String>,
    pub sub_sequence: Option<String>,
}

/// A manual edit that would land on an existing file and is waiting for
/// the operator to submit the identical edit again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingConfirmation {
    pub edit: ManualIndexEdit,
    pub filename: String,
}

/// Naming and sequencing state of the active session.
///
/// Replaced wholesale on every session switch; never merged with the
/// state of a previous folder.
#[derive(Clone, Debug)]
pub struct SessionState {
    pub session: Session,

    /// Sequence of the next capture.
    pub sequence: u32,

    /// Sub-sequence of the next capture in grouped modes.
    pub sub_sequence: u32,

    /// Active label in text-group mode.
    pub text_label: Option<String>,

    pub labeling_mode: LabelingMode,

    /// Index being retaken; counters are frozen while this is set.
    pub retake_target: Option<CaptureIndex>,

    /// Text labels already consumed in this folder.
    pub used_labels: HashSet<String>,

    pub pending_confirmation: Option<PendingConfirmation>,

    /// Filename the operator confirmed overwriting with a manual edit.
    ///
    /// Only a capture landing on exactly this name may archive and replace it.
    /// Cleared by every transition that moves the index.
    pub overwrite_confirmed: Option<String>,
}

impl SessionState {
    /// Fresh state for a folder, resuming after the highest sequence found in it.
    pub fn for_session(
        session: Session,
        highest_sequence: u32,
        used_labels: HashSet<String>,
        labeling_mode: LabelingMode,
    ) -> Self {
        Self {
            session,
            sequence: highest_sequence.saturating_add(1),
            sub_sequence: 1,
            text_label: None,
            labeling_mode,
            retake_target: None,
            used_labels,
            pending_confirmation: None,
            overwrite_confirmed: None,
        }
    }

    /// Index the next capture will be written under, if one can be formed.
    ///
    /// Returns `None` in text-group mode while no label has been set.
    pub fn current_index(&self) -> Option<CaptureIndex> {
        if let Some(target) = &self.retake_target {
            return Some(target.clone());
        }

        match self.labeling_mode {
            LabelingMode::Single => Some(CaptureIndex::sequence(self.sequence)),
            LabelingMode::NumberedGroup => {
                Some(CaptureIndex::sequence(self.sequence).with_sub(self.sub_sequence))
            }
            LabelingMode::TextGroup => self
                .text_label
                .as_ref()
                .map(|label| CaptureIndex::label(label.clone()).with_sub(self.sub_sequence)),
        }
    }

    pub fn is_retaking(&self) -> bool {
        self.retake_target.is_some()
    }

    /// Whether `filename` may replace an existing file after archiving it.
    pub fn may_overwrite(&self, filename: &str) -> bool {
        self.is_retaking() || self.overwrite_confirmed.as_deref() == Some(filename)
    }

    /// Drop any pending or granted overwrite confirmation.
    pub fn clear_confirmation(&mut self) {
        self.pending_confirmation = None;
        self.overwrite_confirmed = None;
    }
}

/// Runtime capture controls seeded from settings at startup.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct CaptureControls {
    pub capture_mode: CaptureMode,
    pub flash_mode: FlashMode,
    pub camera_position: CameraPosition,
    pub shutter_position: ShutterPosition,
    pub orientation_lock_override: bool,
}

/// Single source of truth for runtime state.
///
/// Wrapped in `Arc<RwLock<_>>` by [`crate::state::StateManager`]; mutate it
/// only through the manager so change events are emitted.
#[derive(Clone, Debug)]
pub struct AppState {
    pub session: SessionState,
    pub controls: CaptureControls,
}

impl AppState {
    pub fn new(session: SessionState, controls: CaptureControls) -> Self {
        Self { session, controls }
    }
}
