//! Session folder lifecycle: create, list, rename, delete.
//!
//! Sessions are the immediate subdirectories of a base directory, named
//! `<sanitized-prefix>_<YYYYMMDD>_<HHMMSS>`. The base directory itself is the
//! root session; it is never renamed or deleted.

use crate::error::{CaptureError, CaptureResult};
use crate::models::{Session, strip_timestamp_suffix};
use crate::services::naming::{TIMESTAMP_FORMAT, sanitize};
use crate::services::sequence::{exists, media_filenames};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{Local, NaiveDateTime};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::fs;

/// Display name of the root session.
pub const ROOT_SESSION_NAME: &str = "Default";

/// Name of the per-session folder holding superseded captures.
pub const ARCHIVE_DIR: &str = "archive";

/// Source of the wall-clock time used in folder timestamps.
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// Creates, lists, renames and deletes session folders under one base directory.
#[derive(Clone)]
pub struct SessionStore {
    base_dir: Utf8PathBuf,
    clock: Clock,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("base_dir", &self.base_dir)
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Create a store over `base_dir` using the local wall clock for timestamps.
    pub fn new(base_dir: impl Into<Utf8PathBuf>) -> Self {
        Self::with_clock(base_dir, Arc::new(|| Local::now().naive_local()))
    }

    /// Create a store with an explicit clock.
    pub fn with_clock(base_dir: impl Into<Utf8PathBuf>, clock: Clock) -> Self {
        Self {
            base_dir: base_dir.into(),
            clock,
        }
    }

    /// Current time according to the store's clock.
    pub fn now(&self) -> NaiveDateTime {
        (self.clock)()
    }

    pub fn base_dir(&self) -> &Utf8Path {
        &self.base_dir
    }

    /// Create the base directory if it is missing.
    pub async fn ensure_base_dir(&self) -> CaptureResult<()> {
        fs::create_dir_all(&self.base_dir)
            .await
            .map_err(|e| CaptureError::storage("create", self.base_dir.as_path(), e))
    }

    /// Record for the root session.
    pub async fn root(&self) -> CaptureResult<Session> {
        Ok(Session {
            name: ROOT_SESSION_NAME.to_string(),
            path: self.base_dir.clone(),
            is_empty: self.is_folder_empty(&self.base_dir).await?,
        })
    }

    /// Root is identified by path equality, never by a flag on the record.
    pub fn is_root(&self, session: &Session) -> bool {
        self.is_root_path(&session.path)
    }

    pub fn is_root_path(&self, path: &Utf8Path) -> bool {
        path == self.base_dir.as_path()
    }

    /// Create a new session folder named `<prefix>_<timestamp>`.
    pub async fn create(&self, prefix: &str) -> CaptureResult<Session> {
        let prefix = clean_name(prefix)?;
        self.ensure_base_dir().await?;

        let name = self.stamped(&prefix);
        let path = self.base_dir.join(&name);

        fs::create_dir(&path).await.map_err(|e| {
            tracing::error!("Failed to create session folder {}: {}", path, e);
            CaptureError::storage("create", path.as_path(), e)
        })?;

        tracing::info!("Created session {}", path);
        Ok(Session {
            name,
            path,
            is_empty: true,
        })
    }

    /// All sessions, root first, then most recently modified first.
    pub async fn list(&self) -> CaptureResult<Vec<Session>> {
        self.ensure_base_dir().await?;

        let mut entries = fs::read_dir(&self.base_dir)
            .await
            .map_err(|e| CaptureError::storage("list", self.base_dir.as_path(), e))?;

        let mut found: Vec<(SystemTime, Session)> = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CaptureError::storage("list", self.base_dir.as_path(), e))?
        {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name.starts_with('.') || name == ARCHIVE_DIR {
                continue;
            }

            let path = self.base_dir.join(&name);
            let metadata = entry
                .metadata()
                .await
                .map_err(|e| CaptureError::storage("inspect", path.as_path(), e))?;
            if !metadata.is_dir() {
                continue;
            }

            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            let is_empty = self.is_folder_empty(&path).await?;
            found.push((modified, Session { name, path, is_empty }));
        }

        found.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.name.cmp(&b.1.name)));

        let mut sessions = Vec::with_capacity(found.len() + 1);
        sessions.push(self.root().await?);
        sessions.extend(found.into_iter().map(|(_, session)| session));

        tracing::debug!("Listed {} sessions in {}", sessions.len(), self.base_dir);
        Ok(sessions)
    }

    /// Look up the session stored at `path`, if that folder still exists.
    pub async fn session_at(&self, path: &Utf8Path) -> CaptureResult<Option<Session>> {
        if self.is_root_path(path) {
            return self.root().await.map(Some);
        }
        if !fs::metadata(path).await.map(|m| m.is_dir()).unwrap_or(false) {
            return Ok(None);
        }

        let name = path.file_name().unwrap_or(path.as_str()).to_string();
        Ok(Some(Session {
            name,
            path: path.to_path_buf(),
            is_empty: self.is_folder_empty(path).await?,
        }))
    }

    /// Move the session folder to `<new_name>_<fresh timestamp>` and return the new record.
    ///
    /// The old record is invalid afterwards.
    pub async fn rename(&self, session: &Session, new_name: &str) -> CaptureResult<Session> {
        if self.is_root(session) {
            return Err(CaptureError::RootSessionProtected("renamed"));
        }

        let cleaned = clean_name(new_name)?;
        let prefix = clean_name(strip_timestamp_suffix(&cleaned))?;
        let name = self.stamped(&prefix);
        let path = self.base_dir.join(&name);

        if exists(&path).await? {
            tracing::error!("Cannot rename {} to {}: target exists", session.path, path);
            return Err(CaptureError::storage(
                "rename onto",
                path,
                std::io::Error::new(std::io::ErrorKind::AlreadyExists, "folder already exists"),
            ));
        }

        fs::rename(&session.path, &path).await.map_err(|e| {
            tracing::error!("Failed to rename {} to {}: {}", session.path, path, e);
            CaptureError::storage("rename", session.path.as_path(), e)
        })?;

        tracing::info!("Renamed session {} -> {}", session.path, path);
        let is_empty = self.is_folder_empty(&path).await?;
        Ok(Session {
            name,
            path,
            is_empty,
        })
    }

    /// Remove the session folder and everything inside it.
    pub async fn delete(&self, session: &Session) -> CaptureResult<()> {
        if self.is_root(session) {
            return Err(CaptureError::RootSessionProtected("deleted"));
        }

        fs::remove_dir_all(&session.path).await.map_err(|e| {
            tracing::error!("Failed to delete session {}: {}", session.path, e);
            CaptureError::storage("delete", session.path.as_path(), e)
        })?;

        tracing::info!("Deleted session {}", session.path);
        Ok(())
    }

    async fn is_folder_empty(&self, path: &Utf8Path) -> CaptureResult<bool> {
        Ok(media_filenames(path).await?.is_empty())
    }

    fn stamped(&self, prefix: &str) -> String {
        format!("{}_{}", prefix, self.now().format(TIMESTAMP_FORMAT))
    }
}

fn clean_name(raw: &str) -> CaptureResult<String> {
    let cleaned = sanitize(raw);
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        return Err(CaptureError::InvalidName(raw.to_string()));
    }
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn fixed_clock(h: u32, m: u32, s: u32) -> Clock {
        Arc::new(move || {
            NaiveDate::from_ymd_opt(2024, 5, 17)
                .unwrap()
                .and_hms_opt(h, m, s)
                .unwrap()
        })
    }

    fn test_store(clock: Clock) -> (TempDir, SessionStore) {
        let temp_dir = TempDir::new().unwrap();
        let base = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        (temp_dir, SessionStore::with_clock(base, clock))
    }

    #[tokio::test]
    async fn test_create_appends_timestamp() {
        let (_guard, store) = test_store(fixed_clock(9, 30, 5));

        let session = store.create("Bridge: North").await.unwrap();

        assert_eq!(session.name, "Bridge_ North_20240517_093005");
        assert!(session.path.is_dir());
        assert!(session.is_empty);
    }

    #[tokio::test]
    async fn test_create_same_second_fails() {
        let (_guard, store) = test_store(fixed_clock(9, 30, 5));

        store.create("Site").await.unwrap();
        let err = store.create("Site").await.unwrap_err();
        assert!(matches!(err, CaptureError::StorageIo { .. }));
    }

    #[tokio::test]
    async fn test_create_rejects_empty_prefix() {
        let (_guard, store) = test_store(fixed_clock(9, 30, 5));
        let err = store.create("   ").await.unwrap_err();
        assert!(matches!(err, CaptureError::InvalidName(_)));
    }

    #[tokio::test]
    async fn test_root_is_protected() {
        let (_guard, store) = test_store(fixed_clock(9, 30, 5));
        let root = store.root().await.unwrap();

        assert!(matches!(
            store.delete(&root).await,
            Err(CaptureError::RootSessionProtected("deleted"))
        ));
        assert!(matches!(
            store.rename(&root, "Other").await,
            Err(CaptureError::RootSessionProtected("renamed"))
        ));
    }

    #[tokio::test]
    async fn test_rename_strips_requested_timestamp() {
        let (_guard, store) = test_store(fixed_clock(11, 0, 0));
        let old_path = store.base_dir().join("Site_20240101_090000");
        std::fs::create_dir(&old_path).unwrap();
        let session = store.session_at(&old_path).await.unwrap().unwrap();

        let renamed = store.rename(&session, "Deck_20230101_000000").await.unwrap();

        assert_eq!(renamed.name, "Deck_20240517_110000");
        assert!(!old_path.exists());
    }

    #[tokio::test]
    async fn test_session_at_missing_folder() {
        let (_guard, store) = test_store(fixed_clock(11, 0, 0));
        let missing = store.base_dir().join("nope");
        assert!(store.session_at(&missing).await.unwrap().is_none());
    }
}
