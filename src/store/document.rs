//! A JSON file with an in-process lock
//!
//! The lock is held across the whole read-modify-write cycle, including the
//! file write, so concurrent updates to the same document are serialized and
//! the in-memory state only advances once the new state is on disk.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{StoreError, StoreResult};

pub struct JsonDocument<T> {
    path: PathBuf,
    state: Mutex<T>,
}

impl<T> std::fmt::Debug for JsonDocument<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonDocument")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl<T> JsonDocument<T>
where
    T: Serialize + DeserializeOwned + Default + Clone + Send,
{
    /// Wrap already-loaded state
    pub fn new(path: impl Into<PathBuf>, state: T) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(state),
        }
    }

    /// Load and wrap the document at `path`
    ///
    /// # Errors
    ///
    /// See [`JsonDocument::load`].
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let state = Self::load(&path).await?;
        Ok(Self::new(path, state))
    }

    /// Read the document at `path`. A missing file yields `T::default()`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or is not valid JSON.
    pub async fn load(path: &Path) -> StoreResult<T> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                let state = serde_json::from_str(&content).map_err(|source| StoreError::Json {
                    path: path.to_path_buf(),
                    source,
                })?;
                info!("Loaded {}", path.display());
                Ok(state)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("{} not found, starting empty", path.display());
                Ok(T::default())
            }
            Err(source) => Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Run `f` against the current state
    pub async fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let state = self.state.lock().await;
        f(&state)
    }

    /// Apply `f` to a copy of the state, persist it, then commit it.
    ///
    /// # Errors
    ///
    /// Returns an error if the new state cannot be written. The in-memory state
    /// is left unchanged in that case.
    pub async fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> StoreResult<R> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        let out = f(&mut next);
        self.write(&next).await?;
        *state = next;
        Ok(out)
    }

    async fn write(&self, state: &T) -> StoreResult<()> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
            }
        }

        let json = serde_json::to_string_pretty(state).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;

        // Write beside the target and rename so a crash never leaves a torn file
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)?;

        debug!("Wrote {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    type Counts = BTreeMap<String, u64>;

    #[tokio::test]
    async fn test_missing_file_starts_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let doc = JsonDocument::<Counts>::open(dir.path().join("absent.json"))
            .await
            .expect("open");
        assert!(doc.read(BTreeMap::is_empty).await);
    }

    #[tokio::test]
    async fn test_update_persists_whole_document() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("counts.json");
        let doc = JsonDocument::<Counts>::open(&path).await.expect("open");

        doc.update(|c| c.insert("a".to_string(), 1))
            .await
            .expect("update");
        doc.update(|c| c.insert("b".to_string(), 2))
            .await
            .expect("update");

        let reloaded = JsonDocument::<Counts>::load(&path).await.expect("load");
        assert_eq!(reloaded.get("a"), Some(&1));
        assert_eq!(reloaded.get("b"), Some(&2));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_invalid_json_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.json");
        tokio::fs::write(&path, "{ not json").await.expect("write");
        assert!(matches!(
            JsonDocument::<Counts>::open(&path).await,
            Err(StoreError::Json { .. })
        ));
    }

    #[tokio::test]
    async fn test_failed_write_leaves_state_unchanged() {
        let dir = tempfile::tempdir().expect("tempdir");
        // A directory where the file should be makes the rename fail
        let path = dir.path().join("taken.json");
        tokio::fs::create_dir_all(&path).await.expect("mkdir");
        let doc = JsonDocument::<Counts>::new(&path, Counts::new());

        let result = doc.update(|c| c.insert("a".to_string(), 1)).await;
        assert!(matches!(result, Err(StoreError::Io { .. })));
        assert!(doc.read(BTreeMap::is_empty).await);
    }

    #[tokio::test]
    async fn test_concurrent_updates_are_not_lost() {
        let dir = tempfile::tempdir().expect("tempdir");
        let doc = Arc::new(
            JsonDocument::<Counts>::open(dir.path().join("race.json"))
                .await
                .expect("open"),
        );

        let mut tasks = Vec::new();
        for _ in 0..20 {
            let doc = Arc::clone(&doc);
            tasks.push(tokio::spawn(async move {
                doc.update(|c| *c.entry("k".to_string()).or_default() += 1)
                    .await
                    .expect("update");
            }));
        }
        for task in tasks {
            task.await.expect("join");
        }

        assert_eq!(doc.read(|c| c.get("k").copied()).await, Some(20));
    }
}
