//! Data models for the FieldCapture application.
//!
//! - [`CaptureIndex`]: position of a capture inside a session, the only
//!   information persisted in a capture's filename
//! - [`Session`] / [`FolderRef`]: session folders and persisted pointers to them
//! - [`AppState`]: runtime state ([`SessionState`] plus [`CaptureControls`])
//! - [`AppSettings`]: the per-installation settings document and its
//!   `default | fixed | lastUsed` policies
//! - [`AppConfig`]: bootstrap configuration locating directories and logs

pub mod app_state;
pub mod capture;
pub mod config;
pub mod session;
pub mod settings;

pub use app_state::{
    AppState, CaptureControls, ManualIndexEdit, PendingConfirmation, SessionState,
};
pub use capture::{CaptureIndex, IndexKey, LabelingMode, MEDIA_EXTENSIONS, MediaKind, is_media_file};
pub use config::AppConfig;
pub use session::{FolderRef, Session, strip_timestamp_suffix};
pub use settings::{
    AppSettings, CameraPosition, CaptureMode, FlashMode, SettingKey, SettingMode, SettingPolicy,
    ShutterPosition,
};
