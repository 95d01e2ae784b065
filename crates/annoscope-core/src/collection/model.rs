//! Collection domain model.

use crate::error::{AnnoError, Result};
use crate::run::AnnotationType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A named grouping of compatible runs sharing one session set.
///
/// `runs` is only ever extended through
/// `CollectionRepository::append_runs_unique`; it never holds duplicates and
/// keeps the order in which runs were added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    #[serde(rename = "_id")]
    pub id: String,
    pub project: String,
    pub name: String,
    pub annotation_type: AnnotationType,
    /// Session ids. Stored in order; compared as a set.
    pub sessions: Vec<String>,
    /// Run ids in addition order.
    #[serde(default)]
    pub runs: Vec<String>,
    #[serde(default)]
    pub has_setup: bool,
    pub created_at: DateTime<Utc>,
}

impl Collection {
    pub fn contains_run(&self, run_id: &str) -> bool {
        self.runs.iter().any(|id| id == run_id)
    }
}

/// User input for a collection that does not exist yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionDraft {
    pub project: String,
    pub name: String,
    pub sessions: Vec<String>,
}

impl CollectionDraft {
    pub fn new(
        project: impl Into<String>,
        name: impl Into<String>,
        sessions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            project: project.into(),
            name: name.into(),
            sessions: sessions.into_iter().map(Into::into).collect(),
        }
    }

    /// Checks the draft before anything is persisted.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AnnoError::validation("collection name must not be empty"));
        }
        if self.project.trim().is_empty() {
            return Err(AnnoError::validation("collection project must not be empty"));
        }
        if self.sessions.is_empty() {
            return Err(AnnoError::validation(
                "collection must reference at least one session",
            ));
        }
        let mut seen = HashSet::new();
        if let Some(duplicate) = self.sessions.iter().find(|s| !seen.insert(s.as_str())) {
            return Err(AnnoError::validation(format!(
                "session '{}' is listed more than once",
                duplicate
            )));
        }
        Ok(())
    }

    /// Materializes an empty, not-yet-set-up collection with a fresh id.
    pub fn into_collection(self, annotation_type: AnnotationType) -> Collection {
        Collection {
            id: uuid::Uuid::new_v4().to_string(),
            project: self.project,
            name: self.name.trim().to_string(),
            annotation_type,
            sessions: self.sessions,
            runs: Vec::new(),
            has_setup: false,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_blank_name() {
        let draft = CollectionDraft::new("p1", "   ", ["s1"]);
        assert!(draft.validate().unwrap_err().is_validation());
    }

    #[test]
    fn test_validate_rejects_missing_sessions() {
        let draft = CollectionDraft::new("p1", "Baseline", Vec::<String>::new());
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_sessions() {
        let draft = CollectionDraft::new("p1", "Baseline", ["s1", "s2", "s1"]);
        let err = draft.validate().unwrap_err();
        assert!(err.to_string().contains("s1"));
    }

    #[test]
    fn test_into_collection_starts_empty() {
        let draft = CollectionDraft::new("p1", " Baseline ", ["s1", "s2"]);
        draft.validate().unwrap();
        let collection = draft.into_collection(AnnotationType::PerSession);
        assert_eq!(collection.name, "Baseline");
        assert!(collection.runs.is_empty());
        assert!(!collection.has_setup);
        assert!(!collection.id.is_empty());
    }

    #[test]
    fn test_serializes_with_document_keys() {
        let collection =
            CollectionDraft::new("p1", "Baseline", ["s1"]).into_collection(AnnotationType::PerUtterance);
        let value = serde_json::to_value(&collection).unwrap();
        assert!(value.get("_id").is_some());
        assert_eq!(value["annotationType"], "PER_UTTERANCE");
        assert_eq!(value["hasSetup"], false);
    }
}
