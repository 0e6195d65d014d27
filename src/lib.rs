// FieldCapture - naming and session sequencing for field photo/video capture
//
// This is the library crate containing the core logic and data structures.
// The binary crate (main.rs) provides a headless entry point.

pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use controller::{CaptureTarget, SessionController};
pub use error::{CaptureError, CaptureResult};
pub use metrics::Metrics;
pub use models::{AppConfig, AppSettings, AppState, CaptureIndex, LabelingMode, MediaKind, Session};
pub use services::SessionStore;
pub use state::{EditOutcome, StateChange, StateManager};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
