use annoscope_core::collection::{Collection, CollectionRepository};
use annoscope_core::error::{AnnoError, Result};

/// Loads a collection, turning absence into `NotFound`.
pub(crate) async fn require_collection(
    collections: &dyn CollectionRepository,
    collection_id: &str,
) -> Result<Collection> {
    collections
        .find_by_id(collection_id)
        .await?
        .ok_or_else(|| AnnoError::not_found("collection", collection_id))
}
