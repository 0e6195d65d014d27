use crate::models::{FolderRef, LabelingMode, MediaKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a setting is seeded at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SettingMode {
    #[default]
    Default,
    Fixed,
    LastUsed,
}

/// Resolution policy for one setting: the mode plus the value used in `fixed` mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingPolicy<T> {
    #[serde(default)]
    pub mode: SettingMode,

    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub fixed_value: Option<T>,
}

impl<T> Default for SettingPolicy<T> {
    fn default() -> Self {
        Self {
            mode: SettingMode::Default,
            fixed_value: None,
        }
    }
}

impl<T> SettingPolicy<T> {
    pub fn fixed(value: T) -> Self {
        Self {
            mode: SettingMode::Fixed,
            fixed_value: Some(value),
        }
    }

    pub fn last_used() -> Self {
        Self {
            mode: SettingMode::LastUsed,
            fixed_value: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CaptureMode {
    #[default]
    Photo,
    Video,
}

impl CaptureMode {
    pub fn media_kind(self) -> MediaKind {
        match self {
            Self::Photo => MediaKind::Photo,
            Self::Video => MediaKind::Video,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FlashMode {
    #[default]
    Off,
    On,
    Auto,
}

impl FlashMode {
    /// Next mode when the flash button is toggled.
    pub fn toggled(self) -> Self {
        match self {
            Self::Off => Self::On,
            Self::On => Self::Auto,
            Self::Auto => Self::Off,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CameraPosition {
    #[default]
    Back,
    Front,
}

impl CameraPosition {
    pub fn toggled(self) -> Self {
        match self {
            Self::Back => Self::Front,
            Self::Front => Self::Back,
        }
    }
}

/// On-screen position of the shutter button, normalized to `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShutterPosition {
    pub x: f32,
    pub y: f32,
}

impl ShutterPosition {
    pub fn clamped(self) -> Self {
        Self {
            x: self.x.clamp(0.0, 1.0),
            y: self.y.clamp(0.0, 1.0),
        }
    }
}

impl Default for ShutterPosition {
    fn default() -> Self {
        Self { x: 0.5, y: 0.85 }
    }
}

/// Persisted per-installation settings document (`settings.json`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    pub folder: SettingPolicy<FolderRef>,
    pub shutter_position: SettingPolicy<ShutterPosition>,
    pub labeling_mode: SettingPolicy<LabelingMode>,
    pub capture_mode: SettingPolicy<CaptureMode>,
    pub flash_mode: SettingPolicy<FlashMode>,
    pub camera_position: SettingPolicy<CameraPosition>,
    pub orientation_lock_override: bool,
}

/// Keys of the settings tracked in the last-used store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    Folder,
    ShutterPosition,
    LabelingMode,
    CaptureMode,
    FlashMode,
    CameraPosition,
}

impl SettingKey {
    pub const ALL: [SettingKey; 6] = [
        Self::Folder,
        Self::ShutterPosition,
        Self::LabelingMode,
        Self::CaptureMode,
        Self::FlashMode,
        Self::CameraPosition,
    ];

    /// Storage key in the last-used store.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Folder => "lastFolder",
            Self::ShutterPosition => "lastShutterPosition",
            Self::LabelingMode => "lastLabelingMode",
            Self::CaptureMode => "lastCaptureMode",
            Self::FlashMode => "lastFlashMode",
            Self::CameraPosition => "lastCameraPosition",
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
