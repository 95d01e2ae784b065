//! Run provisioning for new collections.
//!
//! Creates a collection and one run per (prompt, model) pair, then attaches
//! whatever runs could be started. Once the draft is persisted nothing is
//! fatal: failed pairs, a failed attach and a failed `has_setup` update are
//! all reported in `ProvisionResult::errors`.

use crate::membership::CollectionMembershipService;
use annoscope_core::collection::{Collection, CollectionDraft, CollectionRepository};
use annoscope_core::error::{AnnoError, Result};
use annoscope_core::run::{AnnotationType, PromptReference, RunRequest, RunStarter};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;

/// Outcome of `create_with_runs`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionResult {
    pub collection: Collection,
    /// One message per pair that could not be started or attached.
    pub errors: Vec<String>,
}

pub struct RunProvisioningService {
    collections: Arc<dyn CollectionRepository>,
    membership: Arc<CollectionMembershipService>,
    starter: Arc<dyn RunStarter>,
}

impl RunProvisioningService {
    pub fn new(
        collections: Arc<dyn CollectionRepository>,
        membership: Arc<CollectionMembershipService>,
        starter: Arc<dyn RunStarter>,
    ) -> Self {
        Self {
            collections,
            membership,
            starter,
        }
    }

    /// Creates the collection described by `draft` and provisions
    /// `prompts.len() * models.len()` runs for it.
    ///
    /// # Errors
    ///
    /// - `Validation` for a malformed draft or an empty prompt/model list;
    ///   nothing is persisted
    /// - store errors while persisting the draft
    ///
    /// Everything after that is reported in `ProvisionResult::errors`, with
    /// the last collection state the store returned.
    pub async fn create_with_runs(
        &self,
        draft: CollectionDraft,
        prompts: &[PromptReference],
        models: &[String],
        annotation_type: AnnotationType,
    ) -> Result<ProvisionResult> {
        draft.validate()?;
        if prompts.is_empty() {
            return Err(AnnoError::validation("at least one prompt is required"));
        }
        if models.is_empty() {
            return Err(AnnoError::validation("at least one model is required"));
        }

        let collection = draft.into_collection(annotation_type);
        self.collections.create(&collection).await?;
        tracing::info!(
            target: "provisioning",
            collection_id = %collection.id,
            pairs = prompts.len() * models.len(),
            "Created collection, starting runs"
        );

        let pairs: Vec<(&PromptReference, &String)> = prompts
            .iter()
            .flat_map(|prompt| models.iter().map(move |model| (prompt, model)))
            .collect();
        let starts = pairs.iter().map(|(prompt, model)| {
            self.starter.start_run(RunRequest {
                project: collection.project.clone(),
                name: format!("{} / {} / {}", collection.name, prompt, model),
                sessions: collection.sessions.clone(),
                annotation_type,
                prompt: (*prompt).clone(),
                model: (*model).clone(),
            })
        });
        let outcomes = join_all(starts).await;

        let (started, mut errors) = pairs.iter().zip(outcomes).fold(
            (Vec::new(), Vec::new()),
            |(mut started, mut errors), ((prompt, model), outcome)| {
                match outcome {
                    Ok(run) => started.push(run.id),
                    Err(e) => {
                        let message =
                            format!("prompt {} with model {}: {}", prompt, model, e);
                        tracing::warn!(target: "provisioning", collection_id = %collection.id, "Run start failed: {}", message);
                        errors.push(message);
                    }
                }
                (started, errors)
            },
        );

        let mut collection = collection;
        if !started.is_empty() {
            match self.membership.add_runs(&collection.id, &started).await {
                Ok(batch) => {
                    errors.extend(batch.errors);
                    collection = batch.collection;
                }
                Err(e) => {
                    tracing::warn!(target: "provisioning", collection_id = %collection.id, "Attaching runs failed: {}", e);
                    errors.push(format!("failed to attach {} runs: {}", started.len(), e));
                }
            }
        }

        match self.collections.set_has_setup(&collection.id, true).await {
            Ok(updated) => collection = updated,
            Err(e) => {
                tracing::warn!(target: "provisioning", collection_id = %collection.id, "Recording setup failed: {}", e);
                errors.push(format!("failed to mark collection as set up: {}", e));
            }
        }
        tracing::info!(
            target: "provisioning",
            collection_id = %collection.id,
            runs = collection.runs.len(),
            errors = errors.len(),
            "Collection setup finished"
        );

        Ok(ProvisionResult { collection, errors })
    }
}
