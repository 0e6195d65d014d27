//! Folder scans that seed the sequencing state of a session.

use crate::error::{CaptureError, CaptureResult};
use crate::models::{CaptureIndex, is_media_file};
use crate::services::naming::{CollisionScheme, format_filename, parse_filename};
use camino::Utf8Path;
use std::collections::HashSet;
use tokio::fs;

/// Highest attempt tried before giving up on finding a free name.
const MAX_COLLISION_ATTEMPTS: u32 = 10_000;

/// Highest numeric sequence among the given filenames, or 0 when there is none.
///
/// Text-labelled files and non-media files are ignored.
pub fn highest_sequence_in<'a>(names: impl IntoIterator<Item = &'a str>) -> u32 {
    names
        .into_iter()
        .filter(|name| is_media_file(name))
        .filter_map(parse_filename)
        .filter_map(|index| index.sequence_number())
        .max()
        .unwrap_or(0)
}

/// Text labels used by the given filenames.
pub fn labels_in<'a>(names: impl IntoIterator<Item = &'a str>) -> HashSet<String> {
    names
        .into_iter()
        .filter_map(parse_filename)
        .filter_map(|index| index.text_label().map(str::to_string))
        .collect()
}

/// List the names of the media files directly inside `folder`.
pub async fn media_filenames(folder: &Utf8Path) -> CaptureResult<Vec<String>> {
    let mut entries = fs::read_dir(folder)
        .await
        .map_err(|e| CaptureError::storage("list", folder, e))?;

    let mut names = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| CaptureError::storage("list", folder, e))?
    {
        let is_file = entry
            .file_type()
            .await
            .map(|t| t.is_file())
            .unwrap_or(false);
        if !is_file {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) if is_media_file(&name) => names.push(name),
            Ok(_) => {}
            Err(name) => tracing::debug!("Skipping non UTF-8 filename {:?} in {}", name, folder),
        }
    }

    Ok(names)
}

/// Highest sequence stored in `folder`, so captures resume after it on re-entry.
pub async fn highest_sequence(folder: &Utf8Path) -> CaptureResult<u32> {
    let names = media_filenames(folder).await?;
    let highest = highest_sequence_in(names.iter().map(String::as_str));
    tracing::debug!(
        "Highest sequence in {} is {} ({} media files)",
        folder,
        highest,
        names.len()
    );
    Ok(highest)
}

/// Text labels already consumed in `folder`.
pub async fn used_labels(folder: &Utf8Path) -> CaptureResult<HashSet<String>> {
    let names = media_filenames(folder).await?;
    Ok(labels_in(names.iter().map(String::as_str)))
}

/// First free filename in `folder` for `index`: the plain name, then `_2`, `_3`, ...
pub async fn unique_filename(
    folder: &Utf8Path,
    index: &CaptureIndex,
    extension: &str,
) -> CaptureResult<String> {
    let filename = format_filename(index, extension);
    first_free_name(folder, &filename, CollisionScheme::Counter).await
}

/// First free variant of `filename` in `folder` using the given suffix scheme.
pub async fn first_free_name(
    folder: &Utf8Path,
    filename: &str,
    scheme: CollisionScheme,
) -> CaptureResult<String> {
    if !exists(&folder.join(filename)).await? {
        return Ok(filename.to_string());
    }

    for attempt in 2..=MAX_COLLISION_ATTEMPTS {
        let candidate = scheme.apply(filename, attempt);
        if !exists(&folder.join(&candidate)).await? {
            tracing::warn!(
                "{} already exists in {}, using {}",
                filename,
                folder,
                candidate
            );
            return Ok(candidate);
        }
    }

    Err(CaptureError::storage(
        "find a free name for",
        folder.join(filename),
        std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "every collision suffix is taken",
        ),
    ))
}

pub(crate) async fn exists(path: &Utf8Path) -> CaptureResult<bool> {
    fs::try_exists(path)
        .await
        .map_err(|e| CaptureError::storage("check", path, e))
}
