//! Services module - naming, sequencing and session-folder logic.
//!
//! Everything here is independent of the UI layer and of the camera. The
//! services either are pure functions over filenames or perform plain
//! filesystem I/O through `tokio::fs`.
//!
//! # Components
//!
//! - [`naming`]: the filename codec (`format_filename` / `parse_filename`),
//!   sanitizing, root-session filenames and collision suffixes
//! - [`sequence`]: folder scans that find the highest sequence and the used
//!   text labels, and pick free filenames
//! - [`session_store`]: create, list, rename and delete session folders
//! - [`archiver`]: move superseded captures into `archive/` before a retake
//! - [`settings_resolver`]: resolve the six `default | fixed | lastUsed` settings
//!
//! # Usage Example
//!
//! ```ignore
//! use fieldcapture::services::{SessionStore, highest_sequence, unique_filename};
//!
//! let store = SessionStore::new("Captures");
//! let session = store.create("Bridge North").await?;
//!
//! let next = highest_sequence(&session.path).await? + 1;
//! let name = unique_filename(&session.path, &CaptureIndex::sequence(next), ".jpg").await?;
//! ```

pub mod archiver;
pub mod naming;
pub mod sequence;
pub mod session_store;
pub mod settings_resolver;

pub use archiver::archive_existing;
pub use naming::{
    CollisionScheme, format_filename, parse_filename, root_capture_filename, sanitize,
};
pub use sequence::{first_free_name, highest_sequence, media_filenames, unique_filename, used_labels};
pub use session_store::{ARCHIVE_DIR, Clock, ROOT_SESSION_NAME, SessionStore};
pub use settings_resolver::{
    ResolutionSource, ResolvedSettings, SettingEntry, resolve_setting, resolve_settings,
};
