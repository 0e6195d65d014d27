use crate::error::{CaptureError, CaptureResult};
use crate::services::naming::split_extension;
use crate::services::session_store::ARCHIVE_DIR;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use tokio::fs;

/// Move `<session>/<filename>` into `<session>/archive/` before it gets replaced.
///
/// The archived copy is named `<stem>_<epochMillis>.<ext>`. Returns the
/// archived path, or `None` when there was nothing to archive.
///
/// Any failure is an [`CaptureError::Archive`]; callers must not write the
/// replacement when this fails.
pub async fn archive_existing(
    session_dir: &Utf8Path,
    filename: &str,
) -> CaptureResult<Option<Utf8PathBuf>> {
    let source = session_dir.join(filename);
    let present = fs::try_exists(&source)
        .await
        .map_err(|e| archive_error(&source, e))?;
    if !present {
        return Ok(None);
    }

    let archive_dir = session_dir.join(ARCHIVE_DIR);
    fs::create_dir_all(&archive_dir)
        .await
        .map_err(|e| archive_error(&source, e))?;

    let (stem, ext) = split_extension(filename);
    let mut millis = Utc::now().timestamp_millis();
    let target = loop {
        let name = match ext {
            Some(ext) => format!("{}_{}.{}", stem, millis, ext),
            None => format!("{}_{}", stem, millis),
        };
        let candidate = archive_dir.join(name);
        let taken = fs::try_exists(&candidate)
            .await
            .map_err(|e| archive_error(&source, e))?;
        if !taken {
            break candidate;
        }
        millis += 1;
    };

    fs::rename(&source, &target)
        .await
        .map_err(|e| archive_error(&source, e))?;

    tracing::info!("Archived {} -> {}", source, target);
    Ok(Some(target))
}

fn archive_error(path: &Utf8Path, source: std::io::Error) -> CaptureError {
    tracing::error!("Failed to archive {}: {}", path, source);
    CaptureError::Archive {
        path: path.to_path_buf(),
        source,
    }
}
