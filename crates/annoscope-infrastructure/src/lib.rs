//! Infrastructure layer for Annoscope.
//!
//! Storage adapters implementing the core repository traits, configuration
//! loading, and a run starter that queues runs as documents.

pub mod config_service;
pub mod json_dir_store;
pub mod memory_store;
pub mod paths;
pub mod run_starter;
pub mod stores;

pub use crate::config_service::ConfigService;
pub use crate::json_dir_store::JsonDirStore;
pub use crate::memory_store::MemoryStore;
pub use crate::run_starter::StoreRunStarter;
pub use crate::stores::{Stores, open_stores};
