//! The Document Registry — authoritative in-memory table of open documents.
//!
//! [`WorkspaceStore`] composes the Local Cache, Sync Queue, History Engine,
//! Review Engine, Tab Manager, and Notification Bus. It is the single
//! logical owner of all mutable workspace state: no other component
//! mutates documents directly, all mutation goes through the operations
//! here (and in the `sync`/`review` modules, which extend this type).
//!
//! # Concurrency model
//!
//! Mutation operations are synchronous and run to completion; concurrency
//! exists only at the I/O boundary (remote reads/writes, queue drain).
//! Subscribers are notified synchronously after state mutation, before any
//! async persistence work begins — the UI reflects intent immediately,
//! durability is eventual.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tracing::warn;

use sumi_types::{
    DocumentId, DocumentSnapshot, Selection, SyncQueueItem, SyncState, TabId, TabSnapshot,
};

use crate::cache::LocalCache;
use crate::events::StoreEvent;
use crate::history::{DocHistory, DEFAULT_HISTORY_CAP};
use crate::remote::{PersistenceAdapter, RemoteError};

/// Errors surfaced by registry operations.
///
/// Most remote failures are recovered locally (queued for retry) and only
/// logged; the variants here are the hard failures callers must handle:
/// unknown documents, cold reads with no fallback, and remote creation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unknown document: {0}")]
    UnknownDocument(DocumentId),
    #[error("document content not loaded: {0}")]
    NotLoaded(DocumentId),
    #[error("remote persistence error: {0}")]
    Remote(#[from] RemoteError),
    #[error("local cache error: {0}")]
    Cache(#[from] rusqlite::Error),
}

/// Tunable windows and bounds for a store instance.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Quiet period after the last edit before a remote write is attempted.
    pub debounce_window: Duration,
    /// Edits closer together than this share one undo step.
    pub coalesce_window: Duration,
    /// Bound on each undo/redo stack (FIFO eviction).
    pub history_cap: usize,
    /// Broadcast channel capacity for the notification bus.
    pub event_capacity: usize,
    /// Initial connectivity assumption.
    pub start_online: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            debounce_window: Duration::from_secs(1),
            coalesce_window: Duration::from_secs(1),
            history_cap: DEFAULT_HISTORY_CAP,
            event_capacity: 256,
            start_online: true,
        }
    }
}

/// One document's live state inside the registry.
///
/// `original_content` doubles as the review flag: the invariant
/// `is_reviewing ⇔ original_content.is_some()` holds by construction
/// because nothing else ever sets the snapshot. History and the snapshot
/// are owned here and die with the entry — no side maps to orphan.
#[derive(Debug)]
pub(crate) struct DocumentEntry {
    pub(crate) title: String,
    pub(crate) content: String,
    /// False for registry seeds whose content is loaded lazily on open.
    pub(crate) loaded: bool,
    pub(crate) is_modified: bool,
    /// Last committed content, present iff a proposal is under review.
    pub(crate) original_content: Option<String>,
    pub(crate) history: DocHistory,
}

impl DocumentEntry {
    fn seed(title: String, history_cap: usize) -> Self {
        Self {
            title,
            content: String::new(),
            loaded: false,
            is_modified: false,
            original_content: None,
            history: DocHistory::with_cap(history_cap),
        }
    }

    fn snapshot(&self, id: DocumentId) -> DocumentSnapshot {
        DocumentSnapshot {
            id,
            title: self.title.clone(),
            content: self.content.clone(),
            loaded: self.loaded,
            is_modified: self.is_modified,
            is_reviewing: self.original_content.is_some(),
            original_content: self.original_content.clone(),
        }
    }
}

/// The workspace store. Construct with [`WorkspaceStore::new`]; all
/// consumers share the returned `Arc`.
pub struct WorkspaceStore {
    /// Self-reference for spawning debounce/reconcile tasks from
    /// synchronous mutators without keeping the store alive.
    pub(crate) weak: Weak<Self>,
    pub(crate) config: StoreConfig,
    pub(crate) remote: Arc<dyn PersistenceAdapter>,
    pub(crate) cache: Mutex<LocalCache>,
    pub(crate) documents: RwLock<IndexMap<DocumentId, DocumentEntry>>,
    pub(crate) tabs: RwLock<crate::tabs::TabStrip>,
    pub(crate) selection: RwLock<Option<Selection>>,
    pub(crate) online: AtomicBool,
    pub(crate) event_tx: broadcast::Sender<StoreEvent>,
    /// Latest debounce generation per document; a stale generation means
    /// the timer was superseded or cancelled.
    pub(crate) timers: Mutex<HashMap<DocumentId, u64>>,
    pub(crate) timer_seq: AtomicU64,
}

impl WorkspaceStore {
    /// Create a store over the given remote adapter and local cache.
    pub fn new(
        remote: Arc<dyn PersistenceAdapter>,
        cache: LocalCache,
        config: StoreConfig,
    ) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));
        let start_online = config.start_online;
        Arc::new_cyclic(|weak| Self {
            weak: weak.clone(),
            config,
            remote,
            cache: Mutex::new(cache),
            documents: RwLock::new(IndexMap::new()),
            tabs: RwLock::new(crate::tabs::TabStrip::new()),
            selection: RwLock::new(None),
            online: AtomicBool::new(start_online),
            event_tx,
            timers: Mutex::new(HashMap::new()),
            timer_seq: AtomicU64::new(0),
        })
    }

    /// Subscribe to state transitions. Events are wake-ups; observers
    /// re-read snapshots rather than patching local copies.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.event_tx.subscribe()
    }

    pub(crate) fn notify(&self, event: StoreEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    // ========================================================================
    // Connectivity
    // ========================================================================

    /// Current connectivity assumption.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Record a connectivity transition. Going offline→online drains the
    /// sync queue before returning (each item retried once).
    pub async fn set_online(&self, online: bool) {
        let was = self.online.swap(online, Ordering::SeqCst);
        if was == online {
            return;
        }
        self.notify(StoreEvent::ConnectivityChanged { online });
        if online {
            self.drain_sync_queue().await;
        }
    }

    // ========================================================================
    // Registry
    // ========================================================================

    /// Seed a known document from the workspace listing. Content stays
    /// unloaded until the first open. Idempotent.
    pub fn register(&self, id: DocumentId, title: impl Into<String>) {
        {
            let mut docs = self.documents.write();
            if docs.contains_key(&id) {
                return;
            }
            docs.insert(id, DocumentEntry::seed(title.into(), self.config.history_cap));
        }
        self.notify(StoreEvent::DocumentRegistered { id });
    }

    /// Snapshot of one document.
    pub fn document(&self, id: DocumentId) -> Option<DocumentSnapshot> {
        self.documents.read().get(&id).map(|e| e.snapshot(id))
    }

    /// Snapshots of every registered document, in registration order.
    pub fn documents(&self) -> Vec<DocumentSnapshot> {
        self.documents
            .read()
            .iter()
            .map(|(id, e)| e.snapshot(*id))
            .collect()
    }

    /// Open a document for viewing: load content if needed (cache-first),
    /// create or activate its tab, and clear the selection. Idempotent.
    pub async fn open(&self, id: DocumentId) -> Result<(), StoreError> {
        self.ensure_loaded(id).await?;
        let title = self
            .documents
            .read()
            .get(&id)
            .map(|e| e.title.clone())
            .ok_or(StoreError::UnknownDocument(id))?;
        self.tabs.write().open(id, title);
        self.clear_selection();
        self.notify(StoreEvent::DocumentOpened { id });
        self.notify(StoreEvent::TabsChanged);
        Ok(())
    }

    /// Apply an edit. Sets content and the modified flag, optionally
    /// records history (subject to coalescing), writes the cache
    /// synchronously (the durability floor), notifies subscribers, and
    /// schedules the debounced remote write.
    pub fn update_content(
        &self,
        id: DocumentId,
        new_content: impl Into<String>,
        record_history: bool,
    ) -> Result<(), StoreError> {
        let new_content = new_content.into();
        {
            let mut docs = self.documents.write();
            let entry = docs.get_mut(&id).ok_or(StoreError::UnknownDocument(id))?;
            if record_history {
                let prev = std::mem::take(&mut entry.content);
                entry.history.record(prev, self.config.coalesce_window);
            }
            entry.content = new_content.clone();
            entry.loaded = true;
            entry.is_modified = true;
        }
        self.cache_put(id, &new_content)?;
        self.notify(StoreEvent::ContentChanged { id });
        self.schedule_flush(id);
        Ok(())
    }

    /// Undo the most recent edit step. Returns false (no error) when
    /// there is nothing to undo.
    pub fn undo(&self, id: DocumentId) -> Result<bool, StoreError> {
        let restored = {
            let mut docs = self.documents.write();
            let entry = docs.get_mut(&id).ok_or(StoreError::UnknownDocument(id))?;
            let current = entry.content.clone();
            entry.history.undo(&current)
        };
        match restored {
            Some(content) => {
                self.update_content(id, content, false)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Mirror of [`WorkspaceStore::undo`].
    pub fn redo(&self, id: DocumentId) -> Result<bool, StoreError> {
        let reapplied = {
            let mut docs = self.documents.write();
            let entry = docs.get_mut(&id).ok_or(StoreError::UnknownDocument(id))?;
            let current = entry.content.clone();
            entry.history.redo(&current)
        };
        match reapplied {
            Some(content) => {
                self.update_content(id, content, false)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Optimistic rename: local state and tabs update immediately, the
    /// remote rename is best-effort. A remote failure is logged and not
    /// rolled back (accepted staleness window).
    pub async fn rename(&self, id: DocumentId, new_title: &str) -> Result<(), StoreError> {
        {
            let mut docs = self.documents.write();
            let entry = docs.get_mut(&id).ok_or(StoreError::UnknownDocument(id))?;
            entry.title = new_title.to_string();
        }
        self.tabs.write().retitle(id, new_title);
        self.notify(StoreEvent::TitleChanged { id, title: new_title.to_string() });
        self.notify(StoreEvent::TabsChanged);
        if let Err(e) = self.remote.rename_document(id, new_title).await {
            warn!(document = %id.short(), "remote rename failed (local title kept): {e}");
        }
        Ok(())
    }

    /// Create a document at the workspace root and auto-open it.
    pub async fn create(&self, title: &str) -> Result<DocumentId, StoreError> {
        self.create_in(None, title).await
    }

    /// Create a document under a parent folder and auto-open it. Remote
    /// creation failure propagates — no local-only document is fabricated.
    pub async fn create_in(
        &self,
        parent: Option<DocumentId>,
        title: &str,
    ) -> Result<DocumentId, StoreError> {
        let doc = self.remote.create_document(parent, title).await?;
        {
            let mut docs = self.documents.write();
            docs.insert(
                doc.id,
                DocumentEntry {
                    title: doc.title.clone(),
                    content: doc.content.clone(),
                    loaded: true,
                    is_modified: false,
                    original_content: None,
                    history: DocHistory::with_cap(self.config.history_cap),
                },
            );
        }
        self.cache_put_logged(doc.id, &doc.content);
        self.notify(StoreEvent::DocumentCreated { id: doc.id });
        self.open(doc.id).await?;
        Ok(doc.id)
    }

    /// Delete a document: closes its tabs, drops it from the registry and
    /// cache optimistically (history and any staged review die with it —
    /// deletion is an implicit reject), then requests remote deletion.
    /// Remote failure is logged, not rolled back.
    pub async fn delete(&self, id: DocumentId) -> Result<(), StoreError> {
        let removed = {
            let mut docs = self.documents.write();
            docs.shift_remove(&id).ok_or(StoreError::UnknownDocument(id))?
        };
        if removed.original_content.is_some() {
            tracing::debug!(document = %id.short(), "deleting a document under review (implicit reject)");
        }
        self.cancel_flush(id);
        let closed = self.tabs.write().close_for_document(id);
        if closed > 0 {
            self.notify(StoreEvent::TabsChanged);
        }
        if self
            .selection
            .read()
            .as_ref()
            .is_some_and(|s| s.document_id == id)
        {
            self.clear_selection();
        }
        if let Err(e) = self.with_cache(|c| c.remove(id)) {
            warn!(document = %id.short(), "cache cleanup failed on delete: {e}");
        }
        self.notify(StoreEvent::DocumentDeleted { id });
        if let Err(e) = self.remote.delete_document(id).await {
            warn!(document = %id.short(), "remote delete failed (local removal kept): {e}");
        }
        Ok(())
    }

    /// Per-document sync status for status-bar display.
    pub fn sync_state(&self, id: DocumentId) -> Result<SyncState, StoreError> {
        let modified = self
            .documents
            .read()
            .get(&id)
            .map(|e| e.is_modified)
            .ok_or(StoreError::UnknownDocument(id))?;
        if self.with_cache(|c| c.queued_for(id))?.is_some() {
            Ok(SyncState::Queued)
        } else if modified {
            Ok(SyncState::Pending)
        } else {
            Ok(SyncState::Synced)
        }
    }

    // ========================================================================
    // Selection
    // ========================================================================

    /// Replace the process-wide selection.
    pub fn set_selection(&self, selection: Selection) {
        *self.selection.write() = Some(selection);
        self.notify(StoreEvent::SelectionChanged);
    }

    /// Clear the selection (no event if there was none).
    pub fn clear_selection(&self) {
        let had = self.selection.write().take().is_some();
        if had {
            self.notify(StoreEvent::SelectionChanged);
        }
    }

    /// The current selection, if any.
    pub fn selection(&self) -> Option<Selection> {
        self.selection.read().clone()
    }

    // ========================================================================
    // Tabs
    // ========================================================================

    /// Tab snapshots in strip order.
    pub fn tabs(&self) -> Vec<TabSnapshot> {
        self.tabs.read().snapshots()
    }

    /// The active tab's document, if any tab is open.
    pub fn active_document(&self) -> Option<DocumentId> {
        self.tabs.read().active_document()
    }

    /// Close a tab (active-tab fallback handled by the strip).
    pub fn close_tab(&self, tab_id: TabId) {
        self.tabs.write().close(tab_id);
        self.notify(StoreEvent::TabsChanged);
    }

    /// Close every tab except `keep` and pinned ones.
    pub fn close_other_tabs(&self, keep: TabId) {
        self.tabs.write().close_others(keep);
        self.notify(StoreEvent::TabsChanged);
    }

    /// Activate a tab and clear the selection (document switch).
    pub fn activate_tab(&self, tab_id: TabId) {
        self.tabs.write().activate(tab_id);
        self.clear_selection();
        self.notify(StoreEvent::TabsChanged);
    }

    /// Move a tab between positions, preserving the active tab.
    pub fn reorder_tabs(&self, from: usize, to: usize) {
        self.tabs.write().reorder(from, to);
        self.notify(StoreEvent::TabsChanged);
    }

    /// Pin or unpin a tab.
    pub fn pin_tab(&self, tab_id: TabId, pinned: bool) {
        self.tabs.write().set_pinned(tab_id, pinned);
        self.notify(StoreEvent::TabsChanged);
    }

    // ========================================================================
    // Cache plumbing
    // ========================================================================

    pub(crate) fn with_cache<T>(
        &self,
        f: impl FnOnce(&LocalCache) -> rusqlite::Result<T>,
    ) -> rusqlite::Result<T> {
        f(&self.cache.lock())
    }

    pub(crate) fn cache_put(&self, id: DocumentId, content: &str) -> Result<(), StoreError> {
        self.with_cache(|c| c.put(id, content))?;
        Ok(())
    }

    pub(crate) fn cache_put_logged(&self, id: DocumentId, content: &str) {
        if let Err(e) = self.with_cache(|c| c.put(id, content)) {
            warn!(document = %id.short(), "cache write failed: {e}");
        }
    }

    /// Last content the durable cache holds for a document.
    pub fn cached_content(&self, id: DocumentId) -> Result<Option<String>, StoreError> {
        Ok(self.with_cache(|c| c.get(id))?)
    }

    /// Writes pending remote confirmation, in drain order.
    pub fn queued_writes(&self) -> Result<Vec<SyncQueueItem>, StoreError> {
        Ok(self.with_cache(|c| c.queued())?)
    }
}
