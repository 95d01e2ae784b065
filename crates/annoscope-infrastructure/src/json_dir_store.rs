//! JSON-directory document store.
//!
//! Directory structure:
//! ```text
//! base_dir/
//! ├── runs/
//! │   └── <run-id>.json
//! ├── collections/
//! │   └── <collection-id>.json
//! └── sessions/
//!     └── <session-id>.json
//! ```
//!
//! Documents are written to a uniquely named temporary sibling, synced and
//! renamed into place, so a reader never sees a half-written file. Every
//! write holds an exclusive `fs2` lock on `<id>.lock` next to the document,
//! which makes the read-modify-write in `append_runs_unique` atomic across
//! store handles and processes sharing the directory.

use crate::memory_store::append_unique;
use annoscope_core::collection::{Collection, CollectionFilter, CollectionRepository};
use annoscope_core::error::{AnnoError, Result};
use annoscope_core::query::{FindOptions, Found};
use annoscope_core::run::{Run, RunFilter, RunRepository};
use annoscope_core::session::{SessionRecord, SessionRepository};
use async_trait::async_trait;
use fs2::FileExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::fs;

const RUNS_DIR: &str = "runs";
const COLLECTIONS_DIR: &str = "collections";
const SESSIONS_DIR: &str = "sessions";
const EXTENSION: &str = "json";
const LOCK_EXTENSION: &str = "lock";

/// Exclusive advisory lock on a document, released when dropped.
///
/// Lock files are left in place: unlinking one while another handle waits on
/// it would let a third handle lock a fresh inode concurrently.
struct DocumentLock {
    _file: File,
}

impl DocumentLock {
    fn acquire(document_path: &Path) -> Result<Self> {
        let lock_path = document_path.with_extension(LOCK_EXTENSION);
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;
        file.lock_exclusive().map_err(|e| {
            AnnoError::io(format!("Failed to lock {}: {}", lock_path.display(), e))
        })?;
        Ok(Self { _file: file })
    }
}

/// Writes `bytes` to `path` through a synced temporary file in the same
/// directory.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| AnnoError::internal(format!("{} has no parent", path.display())))?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| {
        AnnoError::io(format!("Failed to persist {}: {}", path.display(), e.error))
    })?;
    Ok(())
}

/// Runs file locking and synchronous I/O off the async workers.
async fn blocking<T, F>(task: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| AnnoError::internal(format!("Storage task failed: {}", e)))?
}

pub struct JsonDirStore {
    base_dir: PathBuf,
}

impl JsonDirStore {
    /// Opens a store rooted at `base_dir`, creating the directory layout if
    /// needed.
    pub async fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        for dir in [RUNS_DIR, COLLECTIONS_DIR, SESSIONS_DIR] {
            fs::create_dir_all(base_dir.join(dir)).await.map_err(|e| {
                AnnoError::io(format!(
                    "Failed to create {}: {}",
                    base_dir.join(dir).display(),
                    e
                ))
            })?;
        }
        tracing::debug!(target: "store", base_dir = %base_dir.display(), "Opened JSON directory store");
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn document_path(&self, kind: &str, id: &str) -> Result<PathBuf> {
        let valid = !id.is_empty()
            && id != "."
            && id != ".."
            && !id.contains(['/', '\\'])
            && !id.contains('\0');
        if !valid {
            return Err(AnnoError::validation(format!(
                "'{}' is not a valid document id",
                id
            )));
        }
        Ok(self.base_dir.join(kind).join(format!("{}.{}", id, EXTENSION)))
    }

    async fn load<T: DeserializeOwned>(&self, kind: &str, id: &str) -> Result<Option<T>> {
        let path = self.document_path(kind, id)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AnnoError::data_access(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn load_all<T: DeserializeOwned>(&self, kind: &str) -> Result<Vec<T>> {
        let dir = self.base_dir.join(kind);
        let mut entries = fs::read_dir(&dir).await?;
        let mut documents = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            let bytes = match fs::read(&path).await {
                Ok(bytes) => bytes,
                // Listed, then replaced by a concurrent rename
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            let document = serde_json::from_slice(&bytes).map_err(|e| {
                AnnoError::data_access(format!("Corrupt document {}: {}", path.display(), e))
            })?;
            documents.push(document);
        }
        Ok(documents)
    }

    /// Writes a document unconditionally.
    async fn put<T: Serialize>(&self, kind: &str, id: &str, document: &T) -> Result<()> {
        let path = self.document_path(kind, id)?;
        let bytes = serde_json::to_vec_pretty(document)?;
        blocking(move || {
            let _lock = DocumentLock::acquire(&path)?;
            write_atomic(&path, &bytes)
        })
        .await
    }

    async fn insert_new<T: Serialize>(&self, kind: &str, id: &str, document: &T) -> Result<()> {
        let path = self.document_path(kind, id)?;
        let bytes = serde_json::to_vec_pretty(document)?;
        let label = format!("{} '{}'", kind, id);
        blocking(move || {
            let _lock = DocumentLock::acquire(&path)?;
            if path.try_exists()? {
                return Err(AnnoError::data_access(format!("{} already exists", label)));
            }
            write_atomic(&path, &bytes)
        })
        .await
    }

    async fn update_collection<F>(&self, collection_id: &str, mutate: F) -> Result<Collection>
    where
        F: FnOnce(&mut Collection) + Send + 'static,
    {
        let path = self.document_path(COLLECTIONS_DIR, collection_id)?;
        let collection_id = collection_id.to_string();
        blocking(move || {
            let _lock = DocumentLock::acquire(&path)?;
            let bytes = match std::fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    return Err(AnnoError::not_found("collection", collection_id));
                }
                Err(e) => {
                    return Err(AnnoError::data_access(format!(
                        "Failed to read {}: {}",
                        path.display(),
                        e
                    )));
                }
            };
            let mut collection: Collection = serde_json::from_slice(&bytes)?;
            mutate(&mut collection);
            write_atomic(&path, &serde_json::to_vec_pretty(&collection)?)?;
            Ok(collection)
        })
        .await
    }
}

#[async_trait]
impl RunRepository for JsonDirStore {
    async fn find(&self, filter: &RunFilter, options: FindOptions) -> Result<Found<Run>> {
        let runs: Vec<Run> = self.load_all(RUNS_DIR).await?;
        let matched = runs.into_iter().filter(|r| filter.matches(r)).collect();
        Ok(options.apply(matched))
    }

    async fn find_by_id(&self, run_id: &str) -> Result<Option<Run>> {
        self.load(RUNS_DIR, run_id).await
    }

    async fn create(&self, run: &Run) -> Result<()> {
        self.insert_new(RUNS_DIR, &run.id, run).await
    }
}

#[async_trait]
impl CollectionRepository for JsonDirStore {
    async fn find(&self, filter: &CollectionFilter, options: FindOptions) -> Result<Found<Collection>> {
        let collections: Vec<Collection> = self.load_all(COLLECTIONS_DIR).await?;
        let matched = collections
            .into_iter()
            .filter(|c| filter.matches(c))
            .collect();
        Ok(options.apply(matched))
    }

    async fn find_by_id(&self, collection_id: &str) -> Result<Option<Collection>> {
        self.load(COLLECTIONS_DIR, collection_id).await
    }

    async fn create(&self, collection: &Collection) -> Result<()> {
        self.insert_new(COLLECTIONS_DIR, &collection.id, collection)
            .await
    }

    async fn append_runs_unique(&self, collection_id: &str, run_ids: &[String]) -> Result<Collection> {
        let run_ids = run_ids.to_vec();
        self.update_collection(collection_id, move |collection| {
            let appended = append_unique(&mut collection.runs, &run_ids);
            tracing::debug!(target: "store", collection_id = %collection.id, appended, "Appended runs");
        })
        .await
    }

    async fn set_has_setup(&self, collection_id: &str, has_setup: bool) -> Result<Collection> {
        self.update_collection(collection_id, move |collection| {
            collection.has_setup = has_setup;
        })
        .await
    }
}

#[async_trait]
impl SessionRepository for JsonDirStore {
    async fn find_in_project(&self, project: &str, session_ids: &[String]) -> Result<Vec<SessionRecord>> {
        let mut sessions = Vec::with_capacity(session_ids.len());
        for session_id in session_ids {
            let record: Option<SessionRecord> = self.load(SESSIONS_DIR, session_id).await?;
            if let Some(record) = record.filter(|s| s.project == project) {
                sessions.push(record);
            }
        }
        Ok(sessions)
    }

    async fn save(&self, session: &SessionRecord) -> Result<()> {
        self.put(SESSIONS_DIR, &session.id, session).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use annoscope_core::run::{AnnotationType, RunSession};
    use chrono::Utc;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn create_test_store() -> (JsonDirStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonDirStore::new(temp_dir.path()).await.unwrap();
        (store, temp_dir)
    }

    fn create_test_run(id: &str, project: &str) -> Run {
        Run {
            id: id.to_string(),
            project: project.to_string(),
            name: format!("Run {}", id),
            annotation_type: AnnotationType::PerSession,
            sessions: vec![RunSession::pending("s1"), RunSession::pending("s2")],
            prompt: "prompt-1".to_string(),
            prompt_version: 2,
            model: "CLAUDE_SONNET".to_string(),
            is_running: true,
            is_complete: false,
            has_errored: false,
            created_at: Utc::now(),
        }
    }

    fn create_test_collection(id: &str) -> Collection {
        Collection {
            id: id.to_string(),
            project: "p1".to_string(),
            name: "Baseline".to_string(),
            annotation_type: AnnotationType::PerSession,
            sessions: vec!["s1".to_string(), "s2".to_string()],
            runs: Vec::new(),
            has_setup: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_save_and_find_run() {
        let (store, temp_dir) = create_test_store().await;
        let run = create_test_run("550e8400-e29b-41d4-a716-446655440000", "p1");

        RunRepository::create(&store, &run).await.unwrap();

        assert!(temp_dir
            .path()
            .join("runs")
            .join(format!("{}.json", run.id))
            .exists());
        let found = RunRepository::find_by_id(&store, &run.id).await.unwrap();
        assert_eq!(found, Some(run));
    }

    #[tokio::test]
    async fn test_missing_document_is_none() {
        let (store, _temp_dir) = create_test_store().await;
        let found = CollectionRepository::find_by_id(&store, "nope").await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_rejects_path_like_ids() {
        let (store, _temp_dir) = create_test_store().await;
        let err = RunRepository::find_by_id(&store, "../escape").await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_find_applies_filter_and_window() {
        let (store, _temp_dir) = create_test_store().await;
        for (id, project) in [("r1", "p1"), ("r2", "p1"), ("r3", "p2")] {
            RunRepository::create(&store, &create_test_run(id, project))
                .await
                .unwrap();
        }

        let filter = RunFilter::new()
            .project("p1")
            .sessions_contain_all(["s2"]);
        let found = RunRepository::find(&store, &filter, FindOptions::default().window(1, 10))
            .await
            .unwrap();
        assert_eq!(found.count, 2);
        assert_eq!(found.data.len(), 1);
        assert_eq!(found.data[0].id, "r2");
    }

    #[tokio::test]
    async fn test_append_runs_unique_persists() {
        let (store, temp_dir) = create_test_store().await;
        CollectionRepository::create(&store, &create_test_collection("c1"))
            .await
            .unwrap();

        store
            .append_runs_unique("c1", &["r1".to_string(), "r1".to_string()])
            .await
            .unwrap();
        store
            .append_runs_unique("c1", &["r2".to_string(), "r1".to_string()])
            .await
            .unwrap();

        // Reopen to read from disk
        let reopened = JsonDirStore::new(temp_dir.path()).await.unwrap();
        let collection = CollectionRepository::find_by_id(&reopened, "c1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(collection.runs, vec!["r1", "r2"]);
    }

    #[tokio::test]
    async fn test_set_has_setup_on_missing_collection() {
        let (store, _temp_dir) = create_test_store().await;
        let err = store.set_has_setup("missing", true).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_duplicate_create_fails() {
        let (store, _temp_dir) = create_test_store().await;
        let collection = create_test_collection("c1");
        CollectionRepository::create(&store, &collection).await.unwrap();
        assert!(CollectionRepository::create(&store, &collection).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_from_two_handles_keep_every_run() {
        let temp_dir = TempDir::new().unwrap();
        let first = Arc::new(JsonDirStore::new(temp_dir.path()).await.unwrap());
        let second = Arc::new(JsonDirStore::new(temp_dir.path()).await.unwrap());
        CollectionRepository::create(first.as_ref(), &create_test_collection("c1"))
            .await
            .unwrap();

        let handles: Vec<_> = (0..50)
            .map(|i| {
                let store = if i % 2 == 0 { first.clone() } else { second.clone() };
                tokio::spawn(async move {
                    store
                        .append_runs_unique("c1", &[format!("r{}", i)])
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let reopened = JsonDirStore::new(temp_dir.path()).await.unwrap();
        let collection = CollectionRepository::find_by_id(&reopened, "c1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(collection.runs.len(), 50);
        for i in 0..50 {
            assert!(collection.contains_run(&format!("r{}", i)));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_create_from_two_handles_admits_one() {
        let temp_dir = TempDir::new().unwrap();
        let first = Arc::new(JsonDirStore::new(temp_dir.path()).await.unwrap());
        let second = Arc::new(JsonDirStore::new(temp_dir.path()).await.unwrap());

        let handles: Vec<_> = [first, second]
            .into_iter()
            .map(|store| {
                tokio::spawn(async move {
                    CollectionRepository::create(store.as_ref(), &create_test_collection("c1")).await
                })
            })
            .collect();
        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
    }

    #[tokio::test]
    async fn test_lock_and_temp_files_are_not_listed() {
        let (store, temp_dir) = create_test_store().await;
        CollectionRepository::create(&store, &create_test_collection("c1"))
            .await
            .unwrap();
        store.set_has_setup("c1", true).await.unwrap();
        std::fs::write(temp_dir.path().join("collections").join(".tmpXYZ"), b"partial").unwrap();

        let found = CollectionRepository::find(&store, &CollectionFilter::new(), FindOptions::default())
            .await
            .unwrap();
        assert_eq!(found.count, 1);
        assert!(found.data[0].has_setup);
        assert!(temp_dir.path().join("collections").join("c1.lock").exists());
    }
}
