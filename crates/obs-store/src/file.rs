//! File-backed store
//!
//! One JSON document per observation in a single directory. Documents are
//! written to a temporary file and renamed into place, so readers never
//! see a partial document. The check, write and rename run on a blocking
//! task that owns the write lock, so an abandoned save still finishes or
//! cleans up after itself.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use obs_observation::{Observation, ObservationQuery};
use tokio::sync::Mutex;

use crate::port::{ObservationStore, StoreError};

const EXTENSION: &str = "json";
const TEMP_EXTENSION: &str = "tmp";

/// Longest file name most filesystems accept, in bytes
const MAX_FILE_NAME: usize = 255;

/// Observations stored as JSON documents in a directory
#[derive(Debug)]
pub struct FileStore {
    directory: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl FileStore {
    /// Open a store, creating the directory if needed
    ///
    /// Temporary files left by an interrupted save are removed.
    ///
    /// # Errors
    /// Returns error if the directory cannot be created or read
    pub async fn open(directory: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let directory = directory.into();
        tokio::fs::create_dir_all(&directory).await?;

        let mut entries = tokio::fs::read_dir(&directory).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(TEMP_EXTENSION) {
                tracing::warn!(path = %path.display(), "removing partial document");
                tokio::fs::remove_file(&path).await?;
            }
        }

        tracing::info!(directory = %directory.display(), "file store opened");
        Ok(Self {
            directory,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Directory holding the documents
    #[inline]
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the document for `id`, or `None` if the encoded id is too
    /// long to be a file name
    fn document_path(&self, id: &str) -> Option<PathBuf> {
        let name: String = url::form_urlencoded::byte_serialize(id.as_bytes()).collect();
        let file_name = format!("{name}.{EXTENSION}");
        (file_name.len() <= MAX_FILE_NAME).then(|| self.directory.join(file_name))
    }

    async fn read_document(path: &Path) -> Result<Observation, StoreError> {
        let bytes = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Insert `bytes` at `path` unless a document is already there
fn write_new_document(path: &Path, bytes: &[u8]) -> Result<bool, StoreError> {
    if path.try_exists()? {
        return Ok(false);
    }

    let tmp = path.with_extension(TEMP_EXTENSION);
    std::fs::write(&tmp, bytes)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(true)
}

#[async_trait::async_trait]
impl ObservationStore for FileStore {
    async fn save(&self, observation: &Observation) -> Result<(), StoreError> {
        let id = observation.id().to_string();
        let path = self
            .document_path(&id)
            .ok_or_else(|| StoreError::Backend(format!("id '{id}' is too long to store")))?;
        let bytes = serde_json::to_vec_pretty(observation)?;

        let guard = Arc::clone(&self.write_lock).lock_owned().await;
        let task_path = path.clone();
        let written = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            write_new_document(&task_path, &bytes)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("write task failed: {e}")))??;

        if !written {
            return Err(StoreError::Duplicate(id));
        }

        tracing::debug!(id = %id, path = %path.display(), "observation written");
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Observation, StoreError> {
        let Some(path) = self.document_path(id) else {
            return Err(StoreError::NotFound(id.to_string()));
        };
        match Self::read_document(&path).await {
            Err(StoreError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotFound(id.to_string()))
            }
            other => other,
        }
    }

    async fn find_many(&self, query: &ObservationQuery) -> Result<Vec<Observation>, StoreError> {
        let mut entries = tokio::fs::read_dir(&self.directory).await?;
        let mut hits = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            let observation = Self::read_document(&path).await?;
            if query.matches(&observation) {
                hits.push(observation);
            }
        }

        query.sort(&mut hits);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use obs_observation::{Filter, FilterTranslator};
    use obs_test_utils::{at, mk_obs, GARDEN_ID};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        let obs = mk_obs("obs-1", GARDEN_ID, at(0));

        store.save(&obs).await.unwrap();

        let reopened = FileStore::open(dir.path()).await.unwrap();
        assert_eq!(reopened.find_by_id("obs-1").await.unwrap(), obs);
    }

    #[tokio::test]
    async fn test_duplicate_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        let obs = mk_obs("obs-1", GARDEN_ID, at(0));

        store.save(&obs).await.unwrap();
        assert!(matches!(
            store.save(&obs).await.unwrap_err(),
            StoreError::Duplicate(_)
        ));
    }

    #[tokio::test]
    async fn test_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        assert!(store.find_by_id("absent").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_ids_cannot_escape_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("obs")).await.unwrap();
        let obs = mk_obs("../escape", GARDEN_ID, at(0));

        store.save(&obs).await.unwrap();
        assert!(!dir.path().join("escape.json").exists());
        assert_eq!(store.find_by_id("../escape").await.unwrap(), obs);
    }

    #[tokio::test]
    async fn test_overlong_id_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        let id = "x".repeat(400);

        let err = store.find_by_id(&id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(ref missing) if *missing == id));

        let err = store.save(&mk_obs(&id, GARDEN_ID, at(0))).await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_save_still_lands_whole() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        let obs = mk_obs("obs-1", GARDEN_ID, at(0));

        // The deadline may pass while the write is on the blocking pool.
        let ctx = crate::RequestContext::new(std::time::Duration::from_millis(1));
        let _ = ctx.run("save", store.save(&obs)).await;

        assert!(matches!(
            store.save(&obs).await.unwrap_err(),
            StoreError::Duplicate(_)
        ));
        assert_eq!(store.find_by_id("obs-1").await.unwrap(), obs);

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["obs-1.json".to_string()]);
    }

    #[tokio::test]
    async fn test_open_removes_partial_documents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("obs-1.tmp"), "{\"id\":").unwrap();

        let store = FileStore::open(dir.path()).await.unwrap();

        assert!(!dir.path().join("obs-1.tmp").exists());
        assert!(store.find_by_id("obs-1").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_find_many_skips_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        store.save(&mk_obs("a", GARDEN_ID, at(0))).await.unwrap();
        store.save(&mk_obs("b", GARDEN_ID, at(3))).await.unwrap();
        std::fs::write(dir.path().join("README.txt"), "not an observation").unwrap();

        let query = FilterTranslator::new()
            .translate(&[Filter::equals("featureId", GARDEN_ID)])
            .unwrap();
        let ids: Vec<String> = store
            .find_many(&query)
            .await
            .unwrap()
            .iter()
            .map(|o| o.id().to_string())
            .collect();
        assert_eq!(ids, vec!["b".to_string(), "a".to_string()]);
    }
}
