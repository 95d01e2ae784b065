//! Run repository trait and its typed filter.

use super::model::{AnnotationType, Run};
use crate::error::Result;
use crate::query::{Document, FindOptions, Found};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

impl Document for Run {
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

/// Match filter over the `runs` document set.
///
/// Every populated field must hold for a run to match. Session matching at
/// this level is containment only; exact set equality is decided by
/// `compat::set_equals` on the candidates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunFilter {
    pub project: Option<String>,
    pub annotation_type: Option<AnnotationType>,
    pub exclude_ids: Vec<String>,
    /// Run sessions must include every one of these ids.
    pub sessions_contain_all: Option<Vec<String>>,
}

impl RunFilter {
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

    pub fn matches(&self, run: &Run) -> bool {
        if let Some(project) = &self.project {
            if &run.project != project {
                return false;
            }
        }
        if let Some(annotation_type) = self.annotation_type {
            if run.annotation_type != annotation_type {
                return false;
            }
        }
        if self.exclude_ids.iter().any(|id| id == &run.id) {
            return false;
        }
        if let Some(required) = &self.sessions_contain_all {
            return required
                .iter()
                .all(|id| run.session_ids().any(|s| s == id));
        }
        true
    }
}

/// An abstract repository for the `runs` document set.
///
/// Runs are written by the annotation pipeline and by run starters; the
/// collection engine only reads them.
#[async_trait]
pub trait RunRepository: Send + Sync {
    /// Finds runs matching `filter`, with `count` reporting all matches.
    async fn find(&self, filter: &RunFilter, options: FindOptions) -> Result<Found<Run>>;

    /// Finds a run by its ID.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Run))`: Run found
    /// - `Ok(None)`: Run not found
    /// - `Err(_)`: Error occurred during retrieval
    async fn find_by_id(&self, run_id: &str) -> Result<Option<Run>>;

    /// Resolves several runs at once. Missing ids are simply absent from the
    /// result; order is unspecified.
    async fn find_by_ids(&self, run_ids: &[String]) -> Result<Vec<Run>> {
        let mut runs = Vec::with_capacity(run_ids.len());
        for run_id in run_ids {
            if let Some(run) = self.find_by_id(run_id).await? {
                runs.push(run);
            }
        }
        Ok(runs)
    }

    /// Inserts a new run. Fails if the id is taken.
    async fn create(&self, run: &Run) -> Result<()>;
}
