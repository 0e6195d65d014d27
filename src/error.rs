use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors surfaced by the naming, sequencing and session-store layers.
///
/// Storage failures are logged and returned as-is; nothing in the crate
/// retries them. Manual-edit overwrite warnings are not errors, see
/// [`crate::state::EditOutcome`].
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Failed to {action} {path}: {source}")]
    StorageIo {
        action: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Label '{0}' is already used in this folder")]
    DuplicateLabel(String),

    #[error("Invalid index: {0}")]
    InvalidIndex(String),

    #[error("Failed to archive {path}: {source}")]
    Archive {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("A text label must be set before capturing in text-group mode")]
    LabelRequired,

    #[error("The root session cannot be {0}")]
    RootSessionProtected(&'static str),

    #[error("Invalid session name: {0:?}")]
    InvalidName(String),

    #[error("Session folder not found: {0}")]
    SessionNotFound(Utf8PathBuf),

    #[error("Not a capture filename: {0}")]
    UnrecognizedFilename(String),
}

impl CaptureError {
    /// Build a [`CaptureError::StorageIo`] for the given action and path.
    pub fn storage(
        action: &'static str,
        path: impl Into<Utf8PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::StorageIo {
            action,
            path: path.into(),
            source,
        }
    }
}

pub type CaptureResult<T> = Result<T, CaptureError>;
