//! Run-start collaborator.

use super::model::{AnnotationType, PromptReference, Run};
use crate::error::Result;
use async_trait::async_trait;

/// Everything needed to create and start one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    pub project: String,
    pub name: String,
    pub sessions: Vec<String>,
    pub annotation_type: AnnotationType,
    pub prompt: PromptReference,
    pub model: String,
}

/// Creates and starts runs.
///
/// Implementations resolve sessions, the prompt version and the model, persist
/// the run so that it can be found through `RunRepository`, and hand the work
/// to the annotation pipeline. The returned run must cover exactly
/// `request.sessions`.
#[async_trait]
pub trait RunStarter: Send + Sync {
    async fn start_run(&self, request: RunRequest) -> Result<Run>;
}
