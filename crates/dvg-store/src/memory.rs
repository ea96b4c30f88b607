use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use dvg_types::Document;
use serde_json::Value;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::SnapshotSource;

/// In-memory, revisioned snapshot store.
///
/// Every revision put for a document is kept, in put order; the last one put
/// is the latest. Putting a revision that already exists replaces it in place.
pub struct InMemorySnapshotStore {
    documents: RwLock<HashMap<String, Vec<Document>>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
        }
    }

    /// Store a revision of a document. The document must carry `_id` and
    /// `_rev`.
    pub fn put(&self, doc: Document) -> StoreResult<()> {
        if doc.id().is_empty() {
            return Err(StoreError::MissingId);
        }
        let Some(rev) = doc.rev().map(str::to_owned) else {
            return Err(StoreError::MissingRevision(doc.id().to_string()));
        };

        let mut map = self.documents.write().expect("lock poisoned");
        let revisions = map.entry(doc.id().to_string()).or_default();
        match revisions.iter_mut().find(|d| d.rev() == Some(rev.as_str())) {
            Some(existing) => *existing = doc,
            None => {
                debug!(id = doc.id(), rev = %rev, "snapshot stored");
                revisions.push(doc);
            }
        }
        Ok(())
    }

    /// Parse and store a JSON document.
    pub fn put_json(&self, value: Value) -> StoreResult<()> {
        self.put(Document::from_value(value)?)
    }

    /// The most recently put revision of a document.
    pub fn latest(&self, id: &str) -> Option<Document> {
        let map = self.documents.read().expect("lock poisoned");
        map.get(id).and_then(|revisions| revisions.last().cloned())
    }

    /// A specific revision of a document.
    pub fn revision(&self, id: &str, rev: &str) -> Option<Document> {
        let map = self.documents.read().expect("lock poisoned");
        map.get(id)?.iter().find(|d| d.rev() == Some(rev)).cloned()
    }

    /// Known revisions of a document, oldest first.
    pub fn revisions(&self, id: &str) -> Vec<String> {
        let map = self.documents.read().expect("lock poisoned");
        map.get(id)
            .map(|revisions| {
                revisions
                    .iter()
                    .filter_map(|d| d.rev().map(str::to_owned))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of documents (not revisions) stored.
    pub fn len(&self) -> usize {
        self.documents.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().expect("lock poisoned").is_empty()
    }

    pub fn clear(&self) {
        self.documents.write().expect("lock poisoned").clear();
    }
}

impl Default for InMemorySnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SnapshotSource for InMemorySnapshotStore {
    async fn fetch(
        &self,
        document_id: &str,
        revision: Option<&str>,
    ) -> StoreResult<Option<Document>> {
        Ok(match revision {
            Some(rev) => self.revision(document_id, rev),
            None => self.latest(document_id),
        })
    }
}

impl std::fmt::Debug for InMemorySnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySnapshotStore")
            .field("document_count", &self.len())
            .finish()
    }
}
