//! Collection domain module.
//!
//! - `model`: `Collection` and `CollectionDraft`
//! - `repository`: `CollectionRepository` and its typed `CollectionFilter`

mod model;
pub mod repository;

pub use model::{Collection, CollectionDraft};
pub use repository::{CollectionFilter, CollectionRepository};
