//! Persistence Adapter — the boundary to the remote document store.
//!
//! The store treats the remote as an opaque, unreliable key→document
//! service: it may fail, be slow, or be unreachable, and the sync layer
//! recovers locally in every case except a cold read. All operations are
//! idempotent except `create_document`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use sumi_types::DocumentId;

/// A document as the remote store returns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDocument {
    /// Stable identifier.
    pub id: DocumentId,
    /// Remote title.
    pub title: String,
    /// Full text content.
    pub content: String,
}

/// Errors from the remote document store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RemoteError {
    #[error("document not found: {0}")]
    NotFound(DocumentId),
    #[error("remote unreachable: {0}")]
    Unreachable(String),
    #[error("remote rejected request: {0}")]
    Rejected(String),
}

/// Minimal contract the sync core requires from the remote store.
#[async_trait]
pub trait PersistenceAdapter: Send + Sync {
    /// Fetch a document by id.
    async fn load_document(&self, id: DocumentId) -> Result<RemoteDocument, RemoteError>;

    /// Persist the full content of a document.
    async fn save_content(&self, id: DocumentId, content: &str) -> Result<(), RemoteError>;

    /// Create a new, empty document. Not idempotent.
    async fn create_document(
        &self,
        parent: Option<DocumentId>,
        title: &str,
    ) -> Result<RemoteDocument, RemoteError>;

    /// Delete a document.
    async fn delete_document(&self, id: DocumentId) -> Result<(), RemoteError>;

    /// Rename a document.
    async fn rename_document(&self, id: DocumentId, title: &str) -> Result<(), RemoteError>;
}

// ============================================================================
// MemoryRemote — in-memory backend with failure injection
// ============================================================================

#[derive(Debug, Clone)]
struct StoredDoc {
    title: String,
    content: String,
    parent: Option<DocumentId>,
}

/// In-memory remote store for tests and offline demos.
///
/// Failure injection:
/// - [`MemoryRemote::set_unreachable`] makes every operation fail with
///   [`RemoteError::Unreachable`];
/// - [`MemoryRemote::deny_save`] makes saves for one document fail with
///   [`RemoteError::Rejected`] until allowed again — this is how the
///   bulk-review independence tests fail exactly one document.
///
/// Every successful save is appended to a log so tests can assert how
/// many write attempts the debounce layer actually produced.
#[derive(Debug, Default)]
pub struct MemoryRemote {
    docs: RwLock<HashMap<DocumentId, StoredDoc>>,
    unreachable: AtomicBool,
    denied_saves: RwLock<Vec<DocumentId>>,
    save_log: Mutex<Vec<(DocumentId, String)>>,
}

impl MemoryRemote {
    /// Create an empty remote store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document and return its id.
    pub fn seed(&self, title: impl Into<String>, content: impl Into<String>) -> DocumentId {
        let id = DocumentId::new();
        self.docs.write().insert(
            id,
            StoredDoc { title: title.into(), content: content.into(), parent: None },
        );
        id
    }

    /// Toggle total unreachability.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Make saves for `id` fail until [`MemoryRemote::allow_save`].
    pub fn deny_save(&self, id: DocumentId) {
        let mut denied = self.denied_saves.write();
        if !denied.contains(&id) {
            denied.push(id);
        }
    }

    /// Lift a [`MemoryRemote::deny_save`].
    pub fn allow_save(&self, id: DocumentId) {
        self.denied_saves.write().retain(|d| *d != id);
    }

    /// Current remote content of a document, if it exists.
    pub fn content_of(&self, id: DocumentId) -> Option<String> {
        self.docs.read().get(&id).map(|d| d.content.clone())
    }

    /// Current remote title of a document, if it exists.
    pub fn title_of(&self, id: DocumentId) -> Option<String> {
        self.docs.read().get(&id).map(|d| d.title.clone())
    }

    /// Parent folder the document was created under, if any.
    pub fn parent_of(&self, id: DocumentId) -> Option<DocumentId> {
        self.docs.read().get(&id).and_then(|d| d.parent)
    }

    /// Overwrite content directly, bypassing the adapter (simulates
    /// another device writing to the same store).
    pub fn overwrite(&self, id: DocumentId, content: impl Into<String>) {
        if let Some(doc) = self.docs.write().get_mut(&id) {
            doc.content = content.into();
        }
    }

    /// All successful saves, in order.
    pub fn saves(&self) -> Vec<(DocumentId, String)> {
        self.save_log.lock().clone()
    }

    /// Successful saves for one document, in order.
    pub fn saves_for(&self, id: DocumentId) -> Vec<String> {
        self.save_log
            .lock()
            .iter()
            .filter(|(d, _)| *d == id)
            .map(|(_, c)| c.clone())
            .collect()
    }

    fn check_reachable(&self) -> Result<(), RemoteError> {
        if self.unreachable.load(Ordering::SeqCst) {
            Err(RemoteError::Unreachable("simulated outage".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PersistenceAdapter for MemoryRemote {
    async fn load_document(&self, id: DocumentId) -> Result<RemoteDocument, RemoteError> {
        self.check_reachable()?;
        self.docs
            .read()
            .get(&id)
            .map(|d| RemoteDocument { id, title: d.title.clone(), content: d.content.clone() })
            .ok_or(RemoteError::NotFound(id))
    }

    async fn save_content(&self, id: DocumentId, content: &str) -> Result<(), RemoteError> {
        self.check_reachable()?;
        if self.denied_saves.read().contains(&id) {
            return Err(RemoteError::Rejected(format!("save denied for {id}")));
        }
        let mut docs = self.docs.write();
        let doc = docs.get_mut(&id).ok_or(RemoteError::NotFound(id))?;
        doc.content = content.to_string();
        drop(docs);
        self.save_log.lock().push((id, content.to_string()));
        Ok(())
    }

    async fn create_document(
        &self,
        parent: Option<DocumentId>,
        title: &str,
    ) -> Result<RemoteDocument, RemoteError> {
        self.check_reachable()?;
        let id = DocumentId::new();
        self.docs.write().insert(
            id,
            StoredDoc { title: title.to_string(), content: String::new(), parent },
        );
        Ok(RemoteDocument { id, title: title.to_string(), content: String::new() })
    }

    async fn delete_document(&self, id: DocumentId) -> Result<(), RemoteError> {
        self.check_reachable()?;
        self.docs.write().remove(&id).ok_or(RemoteError::NotFound(id))?;
        Ok(())
    }

    async fn rename_document(&self, id: DocumentId, title: &str) -> Result<(), RemoteError> {
        self.check_reachable()?;
        let mut docs = self.docs.write();
        let doc = docs.get_mut(&id).ok_or(RemoteError::NotFound(id))?;
        doc.title = title.to_string();
        Ok(())
    }
}
