//! Adapter selection.

use crate::json_dir_store::JsonDirStore;
use crate::memory_store::MemoryStore;
use crate::paths::AnnoscopePaths;
use annoscope_core::collection::CollectionRepository;
use annoscope_core::config::{StoreAdapter, StoreConfig};
use annoscope_core::error::Result;
use annoscope_core::run::RunRepository;
use annoscope_core::session::SessionRepository;
use std::sync::Arc;

/// The repositories of one opened store, ready to be injected into services.
#[derive(Clone)]
pub struct Stores {
    pub runs: Arc<dyn RunRepository>,
    pub collections: Arc<dyn CollectionRepository>,
    pub sessions: Arc<dyn SessionRepository>,
}

impl Stores {
    /// Exposes one adapter through all three repository traits.
    pub fn from_adapter<S>(store: Arc<S>) -> Self
    where
        S: RunRepository + CollectionRepository + SessionRepository + 'static,
    {
        Self {
            runs: store.clone(),
            collections: store.clone(),
            sessions: store,
        }
    }
}

/// Opens the adapter named by `config`.
pub async fn open_stores(config: &StoreConfig) -> Result<Stores> {
    match config.adapter {
        StoreAdapter::Memory => {
            tracing::info!(target: "store", "Using in-memory store");
            Ok(Stores::from_adapter(Arc::new(MemoryStore::new())))
        }
        StoreAdapter::JsonDir => {
            let base_dir = match &config.data_dir {
                Some(dir) => dir.clone(),
                None => AnnoscopePaths::store_dir()?,
            };
            tracing::info!(target: "store", base_dir = %base_dir.display(), "Using JSON directory store");
            let store = JsonDirStore::new(base_dir).await?;
            Ok(Stores::from_adapter(Arc::new(store)))
        }
    }
}
