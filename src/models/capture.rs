use serde::{Deserialize, Serialize};
use std::fmt;

/// Extensions recognized as captures, lowercase and without the dot.
pub const MEDIA_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "mp4", "mov"];

/// Primary key of a capture: either a numeric sequence or a text label.
///
/// Modelled as an enum so that a capture can never carry both.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexKey {
    Sequence(u32),
    Label(String),
}

/// Position of a capture inside its session, as encoded in its filename.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CaptureIndex {
    pub key: IndexKey,
    pub sub_sequence: Option<u32>,
}

impl CaptureIndex {
    pub fn sequence(sequence: u32) -> Self {
        Self {
            key: IndexKey::Sequence(sequence),
            sub_sequence: None,
        }
    }

    pub fn label(label: impl Into<String>) -> Self {
        Self {
            key: IndexKey::Label(label.into()),
            sub_sequence: None,
        }
    }

    pub fn with_sub(mut self, sub_sequence: u32) -> Self {
        self.sub_sequence = Some(sub_sequence);
        self
    }

    /// The numeric sequence, if this capture is not text-labelled.
    pub fn sequence_number(&self) -> Option<u32> {
        match self.key {
            IndexKey::Sequence(n) => Some(n),
            IndexKey::Label(_) => None,
        }
    }

    pub fn text_label(&self) -> Option<&str> {
        match &self.key {
            IndexKey::Sequence(_) => None,
            IndexKey::Label(label) => Some(label),
        }
    }
}

/// How captures inside a session are indexed and how the next index advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LabelingMode {
    #[default]
    Single,
    NumberedGroup,
    TextGroup,
}

impl LabelingMode {
    /// Next mode in the `single → numbered-group → text-group → single` cycle.
    pub fn next(self) -> Self {
        match self {
            Self::Single => Self::NumberedGroup,
            Self::NumberedGroup => Self::TextGroup,
            Self::TextGroup => Self::Single,
        }
    }

    pub fn is_grouped(self) -> bool {
        !matches!(self, Self::Single)
    }
}

impl fmt::Display for LabelingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Single => "single",
            Self::NumberedGroup => "numbered-group",
            Self::TextGroup => "text-group",
        };
        f.write_str(name)
    }
}

/// Kind of media written by the capture collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    /// Canonical extension including the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Photo => ".jpg",
            Self::Video => ".mp4",
        }
    }

    /// Filename prefix used for captures in the root session.
    pub fn root_prefix(self) -> &'static str {
        match self {
            Self::Photo => "IMG",
            Self::Video => "VID",
        }
    }
}

/// Check whether a filename carries one of the recognized media extensions.
pub fn is_media_file(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => MEDIA_EXTENSIONS
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known)),
        _ => false,
    }
}
