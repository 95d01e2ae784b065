//! Store-backed run starter.
//!
//! Records each requested run as a pending document for the annotation
//! pipeline to pick up. Session metadata is copied from the `sessions`
//! document set; a request naming a session the project does not have fails
//! on its own without touching the store.

use annoscope_core::error::{AnnoError, Result};
use annoscope_core::run::{Run, RunRepository, RunRequest, RunSession, RunSessionStatus, RunStarter};
use annoscope_core::session::SessionRepository;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

pub struct StoreRunStarter {
    runs: Arc<dyn RunRepository>,
    sessions: Arc<dyn SessionRepository>,
}

impl StoreRunStarter {
    pub fn new(runs: Arc<dyn RunRepository>, sessions: Arc<dyn SessionRepository>) -> Self {
        Self { runs, sessions }
    }
}

#[async_trait]
impl RunStarter for StoreRunStarter {
    async fn start_run(&self, request: RunRequest) -> Result<Run> {
        if request.model.trim().is_empty() {
            return Err(AnnoError::validation("model must not be empty"));
        }
        let records = self
            .sessions
            .find_in_project(&request.project, &request.sessions)
            .await?;
        if let Some(missing) = request
            .sessions
            .iter()
            .find(|id| !records.iter().any(|r| &r.id == *id))
        {
            return Err(AnnoError::not_found("session", missing.clone()));
        }

        let now = Utc::now();
        let run = Run {
            id: uuid::Uuid::new_v4().to_string(),
            project: request.project,
            name: request.name,
            annotation_type: request.annotation_type,
            sessions: records
                .into_iter()
                .map(|record| RunSession {
                    session_id: record.id,
                    status: RunSessionStatus::Pending,
                    name: record.name,
                    file_type: record.file_type,
                    started_at: None,
                    finished_at: None,
                })
                .collect(),
            prompt: request.prompt.prompt_id,
            prompt_version: request.prompt.version,
            model: request.model,
            is_running: true,
            is_complete: false,
            has_errored: false,
            created_at: now,
        };
        self.runs.create(&run).await?;
        tracing::debug!(target: "provisioning", run_id = %run.id, model = %run.model, "Queued run");
        Ok(run)
    }
}
