//! Command implementations. Every command prints its result as JSON.

use anyhow::{Context, Result};
use annoscope_application::{
    CollectionMembershipService, EligibilityService, RunProvisioningService,
};
use annoscope_core::collection::CollectionDraft;
use annoscope_core::config::AppConfig;
use annoscope_core::query::Pagination;
use annoscope_core::run::{AnnotationType, PromptReference};
use annoscope_core::session::SessionRecord;
use annoscope_infrastructure::{StoreRunStarter, Stores, open_stores};
use serde::Serialize;
use std::sync::Arc;

/// Services wired to the configured store.
pub struct App {
    stores: Stores,
    default_page_size: u32,
    eligibility: EligibilityService,
    membership: Arc<CollectionMembershipService>,
    provisioning: RunProvisioningService,
}

impl App {
    pub async fn open(config: &AppConfig) -> Result<Self> {
        let stores = open_stores(&config.store)
            .await
            .context("Failed to open store")?;
        let membership = Arc::new(CollectionMembershipService::new(
            stores.runs.clone(),
            stores.collections.clone(),
        ));
        let starter = Arc::new(StoreRunStarter::new(
            stores.runs.clone(),
            stores.sessions.clone(),
        ));
        Ok(Self {
            eligibility: EligibilityService::new(stores.runs.clone(), stores.collections.clone()),
            provisioning: RunProvisioningService::new(
                stores.collections.clone(),
                membership.clone(),
                starter,
            ),
            membership,
            default_page_size: config.query.default_page_size,
            stores,
        })
    }

    fn pagination(&self, page: Option<u32>, page_size: Option<u32>) -> Pagination {
        Pagination::new(page.unwrap_or(1), page_size.unwrap_or(self.default_page_size))
    }

    pub async fn eligible_runs(
        &self,
        collection_id: &str,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<()> {
        let result = self
            .eligibility
            .find_eligible_runs(collection_id, self.pagination(page, page_size))
            .await?;
        print_json(&result)
    }

    pub async fn mergeable(
        &self,
        collection_id: &str,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<()> {
        let result = self
            .eligibility
            .find_mergeable_collections(collection_id, self.pagination(page, page_size))
            .await?;
        print_json(&result)
    }

    pub async fn add_runs(&self, collection_id: &str, run_ids: &[String]) -> Result<()> {
        let result = self.membership.add_runs(collection_id, run_ids).await?;
        print_json(&result)
    }

    pub async fn merge(&self, target_id: &str, source_ids: Vec<String>) -> Result<()> {
        let result = self
            .membership
            .merge_collections(target_id, source_ids)
            .await?;
        print_json(&result)
    }

    pub async fn provision(
        &self,
        project: String,
        name: String,
        sessions: Vec<String>,
        prompts: &[PromptReference],
        models: &[String],
        annotation_type: AnnotationType,
    ) -> Result<()> {
        let draft = CollectionDraft {
            project,
            name,
            sessions,
        };
        let result = self
            .provisioning
            .create_with_runs(draft, prompts, models, annotation_type)
            .await?;
        print_json(&result)
    }

    pub async fn register_session(
        &self,
        project: String,
        id: String,
        name: String,
        file_type: String,
    ) -> Result<()> {
        let record = SessionRecord {
            id,
            project,
            name,
            file_type,
        };
        self.stores.sessions.save(&record).await?;
        print_json(&record)
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}
