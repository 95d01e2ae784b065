//! In-memory document store.
//!
//! Implements every repository trait over process-local maps. Each document
//! set sits behind its own `RwLock`, so `append_runs_unique` is atomic per
//! collection: the read and the write happen under one write guard.

use annoscope_core::collection::{Collection, CollectionFilter, CollectionRepository};
use annoscope_core::error::{AnnoError, Result};
use annoscope_core::query::{FindOptions, Found};
use annoscope_core::run::{Run, RunFilter, RunRepository};
use annoscope_core::session::{SessionRecord, SessionRepository};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryStore {
    runs: RwLock<HashMap<String, Run>>,
    collections: RwLock<HashMap<String, Collection>>,
    sessions: RwLock<HashMap<String, SessionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Appends the ids not yet present, keeping their relative order.
pub(crate) fn append_unique(runs: &mut Vec<String>, run_ids: &[String]) -> usize {
    let mut present: HashSet<String> = runs.iter().cloned().collect();
    let before = runs.len();
    for run_id in run_ids {
        if present.insert(run_id.clone()) {
            runs.push(run_id.clone());
        }
    }
    runs.len() - before
}

#[async_trait]
impl RunRepository for MemoryStore {
    async fn find(&self, filter: &RunFilter, options: FindOptions) -> Result<Found<Run>> {
        let runs = self.runs.read().await;
        let matched = runs.values().filter(|r| filter.matches(r)).cloned().collect();
        Ok(options.apply(matched))
    }

    async fn find_by_id(&self, run_id: &str) -> Result<Option<Run>> {
        Ok(self.runs.read().await.get(run_id).cloned())
    }

    async fn find_by_ids(&self, run_ids: &[String]) -> Result<Vec<Run>> {
        let runs = self.runs.read().await;
        Ok(run_ids.iter().filter_map(|id| runs.get(id).cloned()).collect())
    }

    async fn create(&self, run: &Run) -> Result<()> {
        let mut runs = self.runs.write().await;
        if runs.contains_key(&run.id) {
            return Err(AnnoError::data_access(format!(
                "run '{}' already exists",
                run.id
            )));
        }
        runs.insert(run.id.clone(), run.clone());
        Ok(())
    }
}

#[async_trait]
impl CollectionRepository for MemoryStore {
    async fn find(&self, filter: &CollectionFilter, options: FindOptions) -> Result<Found<Collection>> {
        let collections = self.collections.read().await;
        let matched = collections
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        Ok(options.apply(matched))
    }

    async fn find_by_id(&self, collection_id: &str) -> Result<Option<Collection>> {
        Ok(self.collections.read().await.get(collection_id).cloned())
    }

    async fn create(&self, collection: &Collection) -> Result<()> {
        let mut collections = self.collections.write().await;
        if collections.contains_key(&collection.id) {
            return Err(AnnoError::data_access(format!(
                "collection '{}' already exists",
                collection.id
            )));
        }
        collections.insert(collection.id.clone(), collection.clone());
        Ok(())
    }

    async fn append_runs_unique(&self, collection_id: &str, run_ids: &[String]) -> Result<Collection> {
        let mut collections = self.collections.write().await;
        let collection = collections
            .get_mut(collection_id)
            .ok_or_else(|| AnnoError::not_found("collection", collection_id))?;
        let appended = append_unique(&mut collection.runs, run_ids);
        tracing::debug!(target: "store", collection_id, appended, "Appended runs");
        Ok(collection.clone())
    }

    async fn set_has_setup(&self, collection_id: &str, has_setup: bool) -> Result<Collection> {
        let mut collections = self.collections.write().await;
        let collection = collections
            .get_mut(collection_id)
            .ok_or_else(|| AnnoError::not_found("collection", collection_id))?;
        collection.has_setup = has_setup;
        Ok(collection.clone())
    }
}

#[async_trait]
impl SessionRepository for MemoryStore {
    async fn find_in_project(&self, project: &str, session_ids: &[String]) -> Result<Vec<SessionRecord>> {
        let sessions = self.sessions.read().await;
        Ok(session_ids
            .iter()
            .filter_map(|id| sessions.get(id))
            .filter(|s| s.project == project)
            .cloned()
            .collect())
    }

    async fn save(&self, session: &SessionRecord) -> Result<()> {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        Ok(())
    }
}
