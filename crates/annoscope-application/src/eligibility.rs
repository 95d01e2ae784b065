//! Eligibility queries.
//!
//! Lists the runs that could be added to a collection and the collections
//! that could be merged into it. The store prefilters on project, annotation
//! type, exclusions and session containment; exact session-set equality is
//! decided here through the shared compatibility rules, and pagination is
//! applied to what survives.

use crate::lookup::require_collection;
use annoscope_core::collection::{Collection, CollectionFilter, CollectionRepository};
use annoscope_core::compat::{is_collection_compatible, is_run_compatible};
use annoscope_core::error::Result;
use annoscope_core::query::{FindOptions, PagedResult, Pagination, Sort, SortField};
use annoscope_core::run::{Run, RunFilter, RunRepository};
use std::sync::Arc;

/// Read-only queries over runs and collections eligible for a collection.
pub struct EligibilityService {
    runs: Arc<dyn RunRepository>,
    collections: Arc<dyn CollectionRepository>,
}

impl EligibilityService {
    pub fn new(runs: Arc<dyn RunRepository>, collections: Arc<dyn CollectionRepository>) -> Self {
        Self { runs, collections }
    }

    /// Runs not yet in the collection whose project, annotation type and
    /// session set match it exactly. Newest first.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the collection does not exist
    /// - `Validation` if `pagination.page_size` is zero
    pub async fn find_eligible_runs(
        &self,
        collection_id: &str,
        pagination: Pagination,
    ) -> Result<PagedResult<Run>> {
        pagination.validate()?;
        let collection = require_collection(self.collections.as_ref(), collection_id).await?;

        let filter = RunFilter::new()
            .project(collection.project.clone())
            .annotation_type(collection.annotation_type)
            .exclude_ids(collection.runs.iter().cloned())
            .sessions_contain_all(collection.sessions.iter().cloned());
        let candidates = self
            .runs
            .find(&filter, FindOptions::sorted(Sort::descending(SortField::CreatedAt)))
            .await?;

        let candidate_count = candidates.count;
        let eligible: Vec<Run> = candidates
            .data
            .into_iter()
            .filter(|run| is_run_compatible(run, &collection))
            .collect();
        tracing::debug!(
            target: "eligibility",
            collection_id,
            candidates = candidate_count,
            eligible = eligible.len(),
            "Resolved eligible runs"
        );

        Ok(pagination.paginate(eligible))
    }

    /// Other collections in the same project with the same annotation type
    /// and the same session set. Collections merged before stay listed.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the collection does not exist
    /// - `Validation` if `pagination.page_size` is zero
    pub async fn find_mergeable_collections(
        &self,
        collection_id: &str,
        pagination: Pagination,
    ) -> Result<PagedResult<Collection>> {
        pagination.validate()?;
        let target = require_collection(self.collections.as_ref(), collection_id).await?;

        let filter = CollectionFilter::new()
            .project(target.project.clone())
            .annotation_type(target.annotation_type)
            .exclude_ids([target.id.clone()])
            .sessions_contain_all(target.sessions.iter().cloned());
        let candidates = self
            .collections
            .find(&filter, FindOptions::sorted(Sort::ascending(SortField::Name)))
            .await?;

        let mergeable: Vec<Collection> = candidates
            .data
            .into_iter()
            .filter(|source| is_collection_compatible(source, &target))
            .collect();
        tracing::debug!(
            target: "eligibility",
            collection_id,
            mergeable = mergeable.len(),
            "Resolved mergeable collections"
        );

        Ok(pagination.paginate(mergeable))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use annoscope_core::run::{AnnotationType, RunSession};
    use annoscope_infrastructure::MemoryStore;
    use chrono::{TimeZone, Utc};

    fn create_test_run(id: &str, project: &str, sessions: &[&str], minute: u32) -> Run {
        Run {
            id: id.to_string(),
            project: project.to_string(),
            name: format!("Run {}", id),
            annotation_type: AnnotationType::PerUtterance,
            sessions: sessions.iter().map(|s| RunSession::pending(*s)).collect(),
            prompt: "prompt-1".to_string(),
            prompt_version: 1,
            model: "GPT_4O".to_string(),
            is_running: false,
            is_complete: true,
            has_errored: false,
            created_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, minute, 0).unwrap(),
        }
    }

    fn create_test_collection(id: &str, name: &str, sessions: &[&str], runs: &[&str]) -> Collection {
        Collection {
            id: id.to_string(),
            project: "p1".to_string(),
            name: name.to_string(),
            annotation_type: AnnotationType::PerUtterance,
            sessions: sessions.iter().map(|s| s.to_string()).collect(),
            runs: runs.iter().map(|r| r.to_string()).collect(),
            has_setup: true,
            created_at: Utc::now(),
        }
    }

    async fn setup() -> (EligibilityService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let service = EligibilityService::new(store.clone(), store.clone());
        (service, store)
    }

    #[tokio::test]
    async fn test_only_exact_session_sets_are_eligible() {
        let (service, store) = setup().await;
        CollectionRepository::create(
            store.as_ref(),
            &create_test_collection("c1", "Baseline", &["s1", "s2"], &["r-member"]),
        )
        .await
        .unwrap();
        let runs = [
            create_test_run("r-exact", "p1", &["s1", "s2"], 1),
            create_test_run("r-reordered", "p1", &["s2", "s1"], 2),
            create_test_run("r-subset", "p1", &["s1"], 3),
            create_test_run("r-superset", "p1", &["s1", "s2", "s3"], 4),
            create_test_run("r-other-project", "p2", &["s1", "s2"], 5),
            create_test_run("r-member", "p1", &["s1", "s2"], 6),
        ];
        for run in &runs {
            RunRepository::create(store.as_ref(), run).await.unwrap();
        }

        let page = service
            .find_eligible_runs("c1", Pagination::default())
            .await
            .unwrap();

        let ids: Vec<_> = page.data.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r-reordered", "r-exact"]);
        assert_eq!(page.count, 2);
        assert_eq!(page.total_pages, 1);
    }

    #[tokio::test]
    async fn test_missing_collection_is_not_found() {
        let (service, _store) = setup().await;
        let err = service
            .find_eligible_runs("missing", Pagination::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_zero_page_size_is_rejected() {
        let (service, _store) = setup().await;
        let err = service
            .find_mergeable_collections("c1", Pagination::new(1, 0))
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_mergeable_excludes_target_and_mismatches() {
        let (service, store) = setup().await;
        let collections = [
            create_test_collection("target", "Target", &["s1", "s2"], &[]),
            create_test_collection("same", "Same sessions", &["s2", "s1"], &["r1"]),
            create_test_collection("subset", "Subset", &["s1"], &[]),
        ];
        for collection in &collections {
            CollectionRepository::create(store.as_ref(), collection)
                .await
                .unwrap();
        }
        let mut other_type = create_test_collection("typed", "Other type", &["s1", "s2"], &[]);
        other_type.annotation_type = AnnotationType::PerSession;
        CollectionRepository::create(store.as_ref(), &other_type)
            .await
            .unwrap();

        let page = service
            .find_mergeable_collections("target", Pagination::default())
            .await
            .unwrap();

        let ids: Vec<_> = page.data.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["same"]);
    }
}
