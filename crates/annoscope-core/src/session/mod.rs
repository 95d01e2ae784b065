//! Session references.
//!
//! Sessions are owned by the project; the collection engine only needs their
//! ids. Run starters read the display metadata to fill `RunSession` entries.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Display metadata of one annotatable session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub project: String,
    pub name: String,
    pub file_type: String,
}

/// Read access to the `sessions` document set.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Returns the sessions of `project` whose id is in `session_ids`, in
    /// the order of `session_ids`. Unknown ids are skipped.
    async fn find_in_project(&self, project: &str, session_ids: &[String]) -> Result<Vec<SessionRecord>>;

    /// Inserts or replaces a session record.
    async fn save(&self, session: &SessionRecord) -> Result<()>;
}
