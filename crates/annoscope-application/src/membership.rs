//! Batch membership operations.
//!
//! Adding runs is best effort: every requested id is classified as added,
//! skipped (already a member) or errored (missing or incompatible), and one
//! bad id never stops the others. Merging collections is stricter: an
//! incompatible source collection fails the whole call before anything is
//! written.
//!
//! Either way the collection is written once, through the store's atomic
//! append-unique update, so concurrent batches against the same collection
//! cannot drop each other's runs.

use crate::lookup::require_collection;
use annoscope_core::collection::{Collection, CollectionRepository};
use annoscope_core::compat::{check_collection, check_run};
use annoscope_core::error::{AnnoError, Result};
use annoscope_core::run::{Run, RunRepository};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Outcome of `add_runs`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    /// Newly attached run ids, in input order.
    pub added: Vec<String>,
    /// Ids that were already members, in input order.
    pub skipped: Vec<String>,
    /// One message per rejected id; each message names the id.
    pub errors: Vec<String>,
    /// The collection after the write.
    pub collection: Collection,
}

/// Outcome of `merge_collections`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeResult {
    pub added: Vec<String>,
    pub skipped: Vec<String>,
    pub collection: Collection,
}

/// One or many source collection ids.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceIds(Vec<String>);

impl SourceIds {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl From<&str> for SourceIds {
    fn from(id: &str) -> Self {
        Self(vec![id.to_string()])
    }
}

impl From<String> for SourceIds {
    fn from(id: String) -> Self {
        Self(vec![id])
    }
}

impl From<Vec<String>> for SourceIds {
    fn from(ids: Vec<String>) -> Self {
        Self(ids)
    }
}

impl From<&[String]> for SourceIds {
    fn from(ids: &[String]) -> Self {
        Self(ids.to_vec())
    }
}

impl<const N: usize> From<[&str; N]> for SourceIds {
    fn from(ids: [&str; N]) -> Self {
        Self(ids.iter().map(|id| id.to_string()).collect())
    }
}

enum Outcome {
    Added,
    Skipped,
    Failed(String),
}

/// Accumulator for the classification fold.
struct Classified {
    /// Runs already in the collection plus those added so far.
    members: HashSet<String>,
    added: Vec<String>,
    skipped: Vec<String>,
    errors: Vec<String>,
}

impl Classified {
    fn new(collection: &Collection) -> Self {
        Self {
            members: collection.runs.iter().cloned().collect(),
            added: Vec::new(),
            skipped: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn record(mut self, run_id: &str, outcome: Outcome) -> Self {
        match outcome {
            Outcome::Added => {
                self.members.insert(run_id.to_string());
                self.added.push(run_id.to_string());
            }
            Outcome::Skipped => self.skipped.push(run_id.to_string()),
            Outcome::Failed(message) => self.errors.push(message),
        }
        self
    }

    fn is_member(&self, run_id: &str) -> bool {
        self.members.contains(run_id)
    }
}

fn classify_run(run_id: &str, run: Option<&Run>, collection: &Collection) -> Outcome {
    let Some(run) = run else {
        return Outcome::Failed(AnnoError::not_found("run", run_id).to_string());
    };
    match check_run(run, collection) {
        Ok(()) => Outcome::Added,
        Err(reason) => Outcome::Failed(
            AnnoError::Incompatible {
                run_id: run_id.to_string(),
                reason: reason.to_string(),
            }
            .to_string(),
        ),
    }
}

/// Adds runs to collections and merges collections into each other.
pub struct CollectionMembershipService {
    runs: Arc<dyn RunRepository>,
    collections: Arc<dyn CollectionRepository>,
}

impl CollectionMembershipService {
    pub fn new(runs: Arc<dyn RunRepository>, collections: Arc<dyn CollectionRepository>) -> Self {
        Self { runs, collections }
    }

    /// Attaches `run_ids` to the collection, classifying each id.
    ///
    /// Calling this twice with the same ids is a no-op the second time: the
    /// ids come back as skipped.
    ///
    /// # Errors
    ///
    /// Only call-level failures: `NotFound` for the collection itself, or a
    /// store error. Per-id problems land in `BatchResult::errors`.
    pub async fn add_runs(&self, collection_id: &str, run_ids: &[String]) -> Result<BatchResult> {
        let collection = require_collection(self.collections.as_ref(), collection_id).await?;

        let mut seen: HashSet<&str> = collection.runs.iter().map(String::as_str).collect();
        let to_resolve: Vec<String> = run_ids
            .iter()
            .filter(|run_id| seen.insert(run_id.as_str()))
            .cloned()
            .collect();
        let resolved: HashMap<String, Run> = self
            .runs
            .find_by_ids(&to_resolve)
            .await?
            .into_iter()
            .map(|run| (run.id.clone(), run))
            .collect();

        let classified = run_ids
            .iter()
            .fold(Classified::new(&collection), |classified, run_id| {
                let outcome = if classified.is_member(run_id) {
                    Outcome::Skipped
                } else {
                    classify_run(run_id, resolved.get(run_id), &collection)
                };
                classified.record(run_id, outcome)
            });

        for message in &classified.errors {
            tracing::warn!(target: "membership", collection_id, "Run rejected: {}", message);
        }

        let collection = if classified.added.is_empty() {
            collection
        } else {
            self.collections
                .append_runs_unique(collection_id, &classified.added)
                .await?
        };

        tracing::info!(
            target: "membership",
            collection_id,
            added = classified.added.len(),
            skipped = classified.skipped.len(),
            errors = classified.errors.len(),
            "Added runs to collection"
        );

        Ok(BatchResult {
            added: classified.added,
            skipped: classified.skipped,
            errors: classified.errors,
            collection,
        })
    }

    /// Copies every run of the source collections into the target.
    ///
    /// Runs are taken in source order, then run order; the first occurrence
    /// of an id wins. Occurrences that are already in the target, or were
    /// already seen earlier in this merge, are reported as skipped. Source
    /// collections are never modified.
    ///
    /// # Errors
    ///
    /// - `Validation` if no source id is given
    /// - `NotFound` if the target or any source does not exist
    /// - `CollectionsIncompatible` if any source fails the compatibility
    ///   rules; nothing is written in that case
    pub async fn merge_collections(
        &self,
        target_id: &str,
        sources: impl Into<SourceIds>,
    ) -> Result<MergeResult> {
        let sources = sources.into();
        if sources.as_slice().is_empty() {
            return Err(AnnoError::validation(
                "at least one source collection is required",
            ));
        }

        let target = require_collection(self.collections.as_ref(), target_id).await?;
        let mut source_collections = Vec::with_capacity(sources.as_slice().len());
        for source_id in sources.as_slice() {
            source_collections.push(require_collection(self.collections.as_ref(), source_id).await?);
        }

        let mut incompatible = Vec::new();
        for source in &source_collections {
            if let Err(reason) = check_collection(source, &target) {
                tracing::warn!(
                    target: "membership",
                    target_id,
                    source_id = %source.id,
                    "Source collection rejected: {}",
                    reason
                );
                if !incompatible.contains(&source.id) {
                    incompatible.push(source.id.clone());
                }
            }
        }
        if !incompatible.is_empty() {
            return Err(AnnoError::CollectionsIncompatible {
                target_id: target_id.to_string(),
                source_ids: incompatible,
            });
        }

        let classified = source_collections
            .iter()
            .flat_map(|source| source.runs.iter())
            .fold(Classified::new(&target), |classified, run_id| {
                let outcome = if classified.is_member(run_id) {
                    Outcome::Skipped
                } else {
                    Outcome::Added
                };
                classified.record(run_id, outcome)
            });

        let collection = if classified.added.is_empty() {
            target
        } else {
            self.collections
                .append_runs_unique(target_id, &classified.added)
                .await?
        };

        tracing::info!(
            target: "membership",
            target_id,
            sources = source_collections.len(),
            added = classified.added.len(),
            skipped = classified.skipped.len(),
            "Merged collections"
        );

        Ok(MergeResult {
            added: classified.added,
            skipped: classified.skipped,
            collection,
        })
    }
}
