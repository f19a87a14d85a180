//! Review Engine — staged AI-proposed edits with explicit accept/reject.
//!
//! # State machine (per document)
//!
//! ```text
//! +-----------+  propose   +-----------+  accept  +-----------+
//! | Committed | ─────────► | Reviewing | ───────► | Committed |
//! +-----------+            +-----┬-----+          | (kept)    |
//!       ▲                        │ reject         +-----------+
//!       └────────────────────────┘ (content restored bit-for-bit)
//! ```
//!
//! A second proposal arriving before the first resolves updates the
//! staged content without touching the snapshot: `original_content`
//! always refers to the last *committed* state, never a prior proposal.
//! The collaborator never reaches the cache or queue directly — staged
//! content only becomes durable through accept (or the restored committed
//! content through reject), both of which re-enter the normal write path.

use tracing::warn;

use sumi_types::{DiffStats, DocumentId};

use crate::diff::line_diff_stats;
use crate::events::StoreEvent;
use crate::store::{StoreError, WorkspaceStore};

impl WorkspaceStore {
    /// Stage a proposed edit for review. Snapshots the committed content
    /// on the Committed→Reviewing transition only.
    ///
    /// Requires loaded content: a lazy registry seed carries a placeholder,
    /// and snapshotting that would make a later reject restore the
    /// placeholder over the real committed text. Callers open the document
    /// first (the agent surface does this for you).
    pub fn propose(
        &self,
        id: DocumentId,
        new_content: impl Into<String>,
    ) -> Result<(), StoreError> {
        let new_content = new_content.into();
        let started = {
            let mut docs = self.documents.write();
            let entry = docs.get_mut(&id).ok_or(StoreError::UnknownDocument(id))?;
            if !entry.loaded {
                return Err(StoreError::NotLoaded(id));
            }
            let started = if entry.original_content.is_none() {
                entry.original_content = Some(entry.content.clone());
                true
            } else {
                // Re-proposal: replace the staged content, keep the snapshot
                false
            };
            entry.content = new_content;
            entry.is_modified = true;
            started
        };
        if started {
            self.notify(StoreEvent::ReviewStarted { id });
        }
        self.notify(StoreEvent::ContentChanged { id });
        Ok(())
    }

    /// Commit the staged proposal. Returns false (no-op) when the
    /// document is not under review. The now-committed content enters the
    /// normal debounced write path.
    pub fn accept(&self, id: DocumentId) -> Result<bool, StoreError> {
        let content = {
            let mut docs = self.documents.write();
            let entry = docs.get_mut(&id).ok_or(StoreError::UnknownDocument(id))?;
            if entry.original_content.take().is_none() {
                return Ok(false);
            }
            entry.is_modified = true;
            entry.content.clone()
        };
        self.cache_put(id, &content)?;
        self.notify(StoreEvent::ReviewResolved { id, accepted: true });
        self.schedule_flush(id);
        Ok(true)
    }

    /// Discard the staged proposal, restoring the committed content
    /// bit-for-bit. Returns false (no-op) when not under review. The
    /// restored content may still differ from the last persisted value,
    /// so the document stays modified and the next debounce cycle
    /// reconciles it; no remote write happens here.
    pub fn reject(&self, id: DocumentId) -> Result<bool, StoreError> {
        let restored = {
            let mut docs = self.documents.write();
            let entry = docs.get_mut(&id).ok_or(StoreError::UnknownDocument(id))?;
            let Some(original) = entry.original_content.take() else {
                return Ok(false);
            };
            entry.content = original.clone();
            entry.is_modified = true;
            original
        };
        self.cache_put(id, &restored)?;
        self.notify(StoreEvent::ContentChanged { id });
        self.notify(StoreEvent::ReviewResolved { id, accepted: false });
        self.schedule_flush(id);
        Ok(true)
    }

    /// Accept every document currently under review, as one logical
    /// batch. Each document's persistence is independent — one failure
    /// (logged) never blocks the rest. Returns the resolved ids.
    pub fn accept_all(&self) -> Vec<DocumentId> {
        let mut resolved = Vec::new();
        for id in self.reviewing() {
            match self.accept(id) {
                Ok(true) => resolved.push(id),
                Ok(false) => {}
                Err(e) => warn!(document = %id.short(), "accept failed in bulk accept: {e}"),
            }
        }
        resolved
    }

    /// Reject every document currently under review. Same independence
    /// guarantee as [`WorkspaceStore::accept_all`].
    pub fn reject_all(&self) -> Vec<DocumentId> {
        let mut resolved = Vec::new();
        for id in self.reviewing() {
            match self.reject(id) {
                Ok(true) => resolved.push(id),
                Ok(false) => {}
                Err(e) => warn!(document = %id.short(), "reject failed in bulk reject: {e}"),
            }
        }
        resolved
    }

    /// Ids of every document currently under review, in registry order.
    pub fn reviewing(&self) -> Vec<DocumentId> {
        self.documents
            .read()
            .iter()
            .filter(|(_, e)| e.original_content.is_some())
            .map(|(id, _)| *id)
            .collect()
    }

    /// Diff statistics between the committed snapshot and the staged
    /// proposal. `None` when the document is not under review. Pure
    /// read — never mutates review state.
    pub fn diff_stats(&self, id: DocumentId) -> Result<Option<DiffStats>, StoreError> {
        let docs = self.documents.read();
        let entry = docs.get(&id).ok_or(StoreError::UnknownDocument(id))?;
        Ok(entry
            .original_content
            .as_ref()
            .map(|original| line_diff_stats(original, &entry.content)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::cache::LocalCache;
    use crate::remote::MemoryRemote;
    use crate::store::{StoreConfig, StoreError, WorkspaceStore};
    use sumi_types::DocumentId;

    const DEBOUNCE: Duration = Duration::from_millis(200);

    fn store_with_remote() -> (Arc<WorkspaceStore>, Arc<MemoryRemote>) {
        let remote = Arc::new(MemoryRemote::new());
        let store = WorkspaceStore::new(
            remote.clone(),
            LocalCache::in_memory().expect("cache"),
            StoreConfig { debounce_window: DEBOUNCE, ..StoreConfig::default() },
        );
        (store, remote)
    }

    async fn open_doc(
        store: &WorkspaceStore,
        remote: &MemoryRemote,
        content: &str,
    ) -> DocumentId {
        let id = remote.seed("Doc", content);
        store.open(id).await.expect("open");
        id
    }

    async fn past_debounce() {
        tokio::time::sleep(DEBOUNCE + Duration::from_millis(50)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn propose_snapshots_committed_state() {
        let (store, remote) = store_with_remote();
        let id = open_doc(&store, &remote, "committed").await;

        store.propose(id, "proposed").expect("propose");
        let snap = store.document(id).unwrap();
        assert!(snap.is_reviewing);
        assert_eq!(snap.content, "proposed");
        assert_eq!(snap.original_content.as_deref(), Some("committed"));
        assert!(snap.is_modified);
    }

    #[tokio::test(start_paused = true)]
    async fn reject_restores_bit_for_bit() {
        let (store, remote) = store_with_remote();
        let id = open_doc(&store, &remote, "committed\n").await;

        store.propose(id, "rewritten entirely").expect("propose");
        assert!(store.reject(id).expect("reject"));

        let snap = store.document(id).unwrap();
        assert_eq!(snap.content, "committed\n");
        assert!(!snap.is_reviewing);
        assert!(snap.original_content.is_none());
        assert!(snap.is_modified);
        // No direct remote write happened
        assert!(remote.saves_for(id).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn reproposal_keeps_first_snapshot() {
        let (store, remote) = store_with_remote();
        let id = open_doc(&store, &remote, "v1").await;

        store.propose(id, "v2").expect("propose");
        store.propose(id, "v3").expect("re-propose");
        assert_eq!(
            store.document(id).unwrap().original_content.as_deref(),
            Some("v1")
        );

        assert!(store.reject(id).expect("reject"));
        // Restored to the state before the FIRST propose, not v2
        assert_eq!(store.document(id).unwrap().content, "v1");
    }

    #[tokio::test(start_paused = true)]
    async fn accept_persists_through_normal_write_path() {
        let (store, remote) = store_with_remote();
        let id = open_doc(&store, &remote, "old").await;

        store.propose(id, "new").expect("propose");
        // Staged content is not durable yet
        assert_eq!(store.cached_content(id).unwrap().as_deref(), Some("old"));

        assert!(store.accept(id).expect("accept"));
        assert_eq!(store.cached_content(id).unwrap().as_deref(), Some("new"));
        past_debounce().await;
        assert_eq!(remote.content_of(id).as_deref(), Some("new"));
        assert!(!store.document(id).unwrap().is_reviewing);
    }

    #[tokio::test(start_paused = true)]
    async fn accept_reject_outside_review_are_noops() {
        let (store, remote) = store_with_remote();
        let id = open_doc(&store, &remote, "text").await;

        assert!(!store.accept(id).expect("accept"));
        assert!(!store.reject(id).expect("reject"));
        let snap = store.document(id).unwrap();
        assert_eq!(snap.content, "text");
        assert!(snap.original_content.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn bulk_accept_is_per_document_independent() {
        let (store, remote) = store_with_remote();
        let a = open_doc(&store, &remote, "a-old").await;
        let b = open_doc(&store, &remote, "b-old").await;

        store.propose(a, "a-new").expect("propose a");
        store.propose(b, "b-new").expect("propose b");
        remote.deny_save(b);

        let resolved = store.accept_all();
        assert_eq!(resolved, vec![a, b]);
        past_debounce().await;

        // A is committed and persisted
        assert_eq!(remote.content_of(a).as_deref(), Some("a-new"));
        assert!(!store.document(a).unwrap().is_reviewing);

        // B is accepted locally and queued for retry
        assert!(!store.document(b).unwrap().is_reviewing);
        assert_eq!(store.document(b).unwrap().content, "b-new");
        let queued = store.queued_writes().expect("queued");
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].document_id, b);
    }

    #[tokio::test(start_paused = true)]
    async fn reject_all_restores_every_document() {
        let (store, remote) = store_with_remote();
        let a = open_doc(&store, &remote, "a").await;
        let b = open_doc(&store, &remote, "b").await;

        store.propose(a, "a2").expect("propose a");
        store.propose(b, "b2").expect("propose b");
        assert_eq!(store.reviewing().len(), 2);

        store.reject_all();
        assert!(store.reviewing().is_empty());
        assert_eq!(store.document(a).unwrap().content, "a");
        assert_eq!(store.document(b).unwrap().content, "b");
    }

    #[tokio::test(start_paused = true)]
    async fn diff_stats_are_read_only() {
        let (store, remote) = store_with_remote();
        let id = open_doc(&store, &remote, "line one\nline two\n").await;
        assert_eq!(store.diff_stats(id).unwrap(), None);

        store
            .propose(id, "line one\nline two changed\nline three\n")
            .expect("propose");
        let stats = store.diff_stats(id).unwrap().expect("stats");
        assert_eq!(stats.additions, 2);
        assert_eq!(stats.deletions, 1);

        // Asking twice mutates nothing
        assert_eq!(store.diff_stats(id).unwrap(), Some(stats));
        assert!(store.document(id).unwrap().is_reviewing);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_flush_backs_off_while_review_is_open() {
        let (store, remote) = store_with_remote();
        let id = open_doc(&store, &remote, "base").await;

        // A human edit arms the debounce timer; the proposal lands before
        // it fires
        store.update_content(id, "human edit", true).expect("edit");
        tokio::time::sleep(Duration::from_millis(100)).await;
        store.propose(id, "agent draft").expect("propose");
        past_debounce().await;

        // The timer fired but persisted nothing
        assert!(remote.saves_for(id).is_empty());
        let snap = store.document(id).unwrap();
        assert!(snap.is_reviewing);
        assert!(snap.is_modified);
        assert_eq!(snap.original_content.as_deref(), Some("human edit"));

        // Resolution reschedules the write; only committed content lands
        assert!(store.reject(id).expect("reject"));
        past_debounce().await;
        assert_eq!(remote.saves_for(id), vec!["human edit".to_string()]);
        assert!(!store.document(id).unwrap().is_modified);
    }

    #[tokio::test(start_paused = true)]
    async fn propose_refuses_unloaded_seed() {
        let (store, remote) = store_with_remote();
        let id = remote.seed("Doc", "precious committed text");
        store.register(id, "Doc");

        let err = store.propose(id, "agent draft").unwrap_err();
        assert!(matches!(err, StoreError::NotLoaded(_)));

        // Nothing was staged and the remote content is untouched
        let snap = store.document(id).unwrap();
        assert!(!snap.is_reviewing);
        assert!(snap.original_content.is_none());
        past_debounce().await;
        assert_eq!(
            remote.content_of(id).as_deref(),
            Some("precious committed text")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn delete_while_reviewing_is_implicit_reject() {
        let (store, remote) = store_with_remote();
        let id = open_doc(&store, &remote, "keep me").await;
        store.propose(id, "staged").expect("propose");

        store.delete(id).await.expect("delete");
        assert!(store.document(id).is_none());
        assert!(store.reviewing().is_empty());
        // Nothing of the staged proposal survives anywhere durable
        assert_eq!(store.cached_content(id).unwrap(), None);
        assert!(store.queued_writes().unwrap().is_empty());
    }
}
