//! Filename codec for captures.
//!
//! Filenames are the only persisted record of a [`CaptureIndex`], so
//! [`parse_filename`] must invert [`format_filename`] for every index the
//! latter produces.
//!
//! | Form          | Meaning                                   |
//! |---------------|-------------------------------------------|
//! | `NNN.ext`     | sequence N, zero-padded to 3 digits       |
//! | `NNN-S.ext`   | sequence N, sub-sequence S                |
//! | `Label.ext`   | text label                                |
//! | `Label-S.ext` | text label, sub-sequence S                |
//!
//! Stems that are all digits always parse as a sequence, even when they were
//! written as a text label.

use crate::models::{CaptureIndex, IndexKey, MEDIA_EXTENSIONS, MediaKind};
use chrono::NaiveDateTime;
use uuid::Uuid;

/// Characters that are replaced with `_` in labels and folder names.
pub const ILLEGAL_CHARS: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// `strftime` format of session and root-capture timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Replace characters that are illegal in filenames and trim surrounding whitespace.
pub fn sanitize(input: &str) -> String {
    input
        .trim()
        .chars()
        .map(|c| if ILLEGAL_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// Serialize an index into a filename with the given extension (`".jpg"` or `"jpg"`).
pub fn format_filename(index: &CaptureIndex, extension: &str) -> String {
    let stem = match &index.key {
        IndexKey::Sequence(n) => format!("{:03}", n),
        IndexKey::Label(label) => sanitize(label),
    };

    let ext = extension.trim_start_matches('.');
    match index.sub_sequence {
        Some(sub) => format!("{}-{}.{}", stem, sub, ext),
        None => format!("{}.{}", stem, ext),
    }
}

/// Parse a capture filename back into its index.
///
/// Returns `None` for names without a recognized media extension or with an
/// empty stem.
pub fn parse_filename(filename: &str) -> Option<CaptureIndex> {
    let stem = media_stem(filename)?;

    if let Some((head, tail)) = stem.rsplit_once('-') {
        if !head.is_empty() {
            if let Some(sub) = parse_number(tail) {
                return Some(CaptureIndex {
                    key: parse_key(head),
                    sub_sequence: Some(sub),
                });
            }
        }
    }

    Some(CaptureIndex {
        key: parse_key(stem),
        sub_sequence: None,
    })
}

/// Filename of a capture in the root session: `IMG_<timestamp>_<ID>.jpg` / `VID_<timestamp>_<ID>.mp4`.
pub fn root_capture_filename(kind: MediaKind, now: NaiveDateTime) -> String {
    let id = Uuid::new_v4().simple().to_string()[..4].to_uppercase();
    format!(
        "{}_{}_{}{}",
        kind.root_prefix(),
        now.format(TIMESTAMP_FORMAT),
        id,
        kind.extension()
    )
}

/// Disambiguation suffix appended to a filename stem when the name is taken.
///
/// The two schemes belong to different call sites and are intentionally kept apart:
/// [`CollisionScheme::Counter`] when choosing the name of a new capture,
/// [`CollisionScheme::Version`] when the chosen name is found occupied at write time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionScheme {
    /// `<name>_K.ext`
    Counter,
    /// `<name>_vK.ext`
    Version,
}

impl CollisionScheme {
    /// Apply the `attempt`-th suffix (starting at 2) to `filename`.
    pub fn apply(self, filename: &str, attempt: u32) -> String {
        let (stem, ext) = split_extension(filename);
        let suffix = match self {
            Self::Counter => format!("_{}", attempt),
            Self::Version => format!("_v{}", attempt),
        };
        match ext {
            Some(ext) => format!("{}{}.{}", stem, suffix, ext),
            None => format!("{}{}", stem, suffix),
        }
    }
}

/// Split `name` into stem and extension (without the dot).
pub fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    }
}

fn media_stem(filename: &str) -> Option<&str> {
    let (stem, ext) = split_extension(filename);
    let ext = ext?;
    if !MEDIA_EXTENSIONS
        .iter()
        .any(|known| ext.eq_ignore_ascii_case(known))
    {
        return None;
    }
    (!stem.is_empty()).then_some(stem)
}

fn parse_key(stem: &str) -> IndexKey {
    match parse_number(stem) {
        Some(n) => IndexKey::Sequence(n),
        None => IndexKey::Label(stem.to_string()),
    }
}

fn parse_number(token: &str) -> Option<u32> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}
