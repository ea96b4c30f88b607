use async_trait::async_trait;
use dvg_types::Document;

use crate::error::{StoreError, StoreResult};

/// Fetches document snapshots by id and revision.
///
/// Implementations must satisfy these invariants:
/// - `revision: None` returns the latest known revision.
/// - A document or revision that does not exist is `Ok(None)`.
/// - `Err` is reserved for failures of the source itself.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch `document_id` at `revision`, or its latest revision.
    async fn fetch(
        &self,
        document_id: &str,
        revision: Option<&str>,
    ) -> StoreResult<Option<Document>>;

    /// Like [`fetch`](Self::fetch), but a missing snapshot is an error.
    async fn require(&self, document_id: &str, revision: Option<&str>) -> StoreResult<Document> {
        match self.fetch(document_id, revision).await? {
            Some(doc) => Ok(doc),
            None => Err(match revision {
                Some(revision) => StoreError::RevisionNotFound {
                    id: document_id.to_string(),
                    revision: revision.to_string(),
                },
                None => StoreError::DocumentNotFound(document_id.to_string()),
            }),
        }
    }
}
