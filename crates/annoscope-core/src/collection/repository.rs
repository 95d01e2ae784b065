//! Collection repository trait and its typed filter.

use super::model::Collection;
use crate::error::Result;
use crate::query::{Document, FindOptions, Found};
use crate::run::AnnotationType;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

impl Document for Collection {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Match filter over the `collections` document set.
///
/// Every populated field must hold for a collection to match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionFilter {
    pub project: Option<String>,
    pub annotation_type: Option<AnnotationType>,
    pub exclude_ids: Vec<String>,
    /// Collection sessions must include every one of these ids.
    pub sessions_contain_all: Option<Vec<String>>,
}

impl CollectionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn annotation_type(mut self, annotation_type: AnnotationType) -> Self {
        self.annotation_type = Some(annotation_type);
        self
    }

    pub fn exclude_ids(mut self, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.exclude_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn sessions_contain_all(mut self, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.sessions_contain_all = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn matches(&self, collection: &Collection) -> bool {
        if let Some(project) = &self.project {
            if &collection.project != project {
                return false;
            }
        }
        if let Some(annotation_type) = self.annotation_type {
            if collection.annotation_type != annotation_type {
                return false;
            }
        }
        if self.exclude_ids.iter().any(|id| id == &collection.id) {
            return false;
        }
        if let Some(required) = &self.sessions_contain_all {
            return required
                .iter()
                .all(|id| collection.sessions.iter().any(|s| s == id));
        }
        true
    }
}

/// An abstract repository for the `collections` document set.
///
/// # Implementation Notes
///
/// `append_runs_unique` is the only way `Collection::runs` changes. It must be
/// atomic per collection: two concurrent appends against the same document
/// must both land, and ids already present are left where they are.
#[async_trait]
pub trait CollectionRepository: Send + Sync {
    /// Finds collections matching `filter`, with `count` reporting all matches.
    async fn find(&self, filter: &CollectionFilter, options: FindOptions) -> Result<Found<Collection>>;

    /// Finds a collection by its ID.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Collection))`: Collection found
    /// - `Ok(None)`: Collection not found
    /// - `Err(_)`: Error occurred during retrieval
    async fn find_by_id(&self, collection_id: &str) -> Result<Option<Collection>>;

    /// Inserts a new collection. Fails if the id is taken.
    async fn create(&self, collection: &Collection) -> Result<()>;

    /// Appends the ids not yet present to `runs`, preserving the given order,
    /// and returns the updated collection.
    ///
    /// Returns `NotFound` when the collection does not exist.
    async fn append_runs_unique(&self, collection_id: &str, run_ids: &[String]) -> Result<Collection>;

    /// Sets the `has_setup` flag and returns the updated collection.
    async fn set_has_setup(&self, collection_id: &str, has_setup: bool) -> Result<Collection>;
}
