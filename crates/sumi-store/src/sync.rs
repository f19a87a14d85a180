//! Offline-tolerant read/write path.
//!
//! # Read path
//!
//! Cache hit → serve immediately, then reconcile against the remote in
//! the background (online only); a difference overwrites memory + cache
//! and notifies. Cache miss → synchronous remote fetch; a cold-read
//! failure surfaces to the caller because there is no fallback data.
//!
//! # Write path
//!
//! ```text
//! update_content ──► cache (sync, durability floor)
//!       │
//!       ▼ reset per-document debounce timer
//!   timer fires ──► offline? ──► sync queue (one slot per document)
//!       │               │
//!       ▼ online        ▼ offline→online transition
//!   remote save ◄── drain (each item retried once)
//!       │
//!       ├─ ok: drop queued item, clear modified flag
//!       └─ err: enqueue + warn, stays retry-eligible
//! ```
//!
//! Timer reset is the cancellation primitive: a new edit supersedes the
//! scheduled write by bumping the document's generation. A network request
//! already in flight is never cancelled; its result is applied but
//! superseded by later state through the queue semantics.

use std::sync::atomic::Ordering;

use tracing::{debug, info, warn};

use sumi_types::{DocumentId, SyncState};

use crate::events::StoreEvent;
use crate::store::{StoreError, WorkspaceStore};

impl WorkspaceStore {
    /// Make sure a document's content is in memory, cache-first.
    ///
    /// Unregistered ids always take the cold path: the cache stores
    /// content only, and a usable entry needs the remote title.
    pub(crate) async fn ensure_loaded(&self, id: DocumentId) -> Result<(), StoreError> {
        let registered = {
            let docs = self.documents.read();
            match docs.get(&id) {
                Some(entry) if entry.loaded => return Ok(()),
                Some(_) => true,
                None => false,
            }
        };

        if registered {
            if let Some(cached) = self.with_cache(|c| c.get(id))? {
                {
                    let mut docs = self.documents.write();
                    if let Some(entry) = docs.get_mut(&id) {
                        entry.content = cached;
                        entry.loaded = true;
                    }
                }
                // Instant availability beats strict freshness; catch up
                // in the background when the network allows.
                if self.is_online() {
                    self.spawn_reconcile(id);
                }
                return Ok(());
            }
        }

        // Cold path: no cached copy, the remote is the only source.
        let doc = self.remote.load_document(id).await?;
        {
            let mut docs = self.documents.write();
            let entry = docs.entry(id).or_insert_with(|| {
                crate::store::DocumentEntry {
                    title: doc.title.clone(),
                    content: String::new(),
                    loaded: false,
                    is_modified: false,
                    original_content: None,
                    history: crate::history::DocHistory::with_cap(self.config.history_cap),
                }
            });
            entry.title = doc.title.clone();
            entry.content = doc.content.clone();
            entry.loaded = true;
        }
        self.cache_put_logged(id, &doc.content);
        Ok(())
    }

    fn spawn_reconcile(&self, id: DocumentId) {
        let Some(store) = self.weak.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            store.reconcile(id).await;
        });
    }

    /// Background reconciliation after a warm read. Failures are silently
    /// ignored — the cached value was already served.
    pub(crate) async fn reconcile(&self, id: DocumentId) {
        let remote_doc = match self.remote.load_document(id).await {
            Ok(d) => d,
            Err(e) => {
                debug!(document = %id.short(), "background reconcile skipped: {e}");
                return;
            }
        };
        let changed = {
            let mut docs = self.documents.write();
            let Some(entry) = docs.get_mut(&id) else {
                return;
            };
            // A local edit or staged review supersedes background freshness.
            if entry.is_modified || entry.original_content.is_some() {
                return;
            }
            if entry.loaded && entry.content != remote_doc.content {
                entry.content = remote_doc.content.clone();
                true
            } else {
                false
            }
        };
        if changed {
            info!(document = %id.short(), "remote content newer than cache, reloaded");
            self.cache_put_logged(id, &remote_doc.content);
            self.notify(StoreEvent::DocumentReloaded { id });
        }
    }

    // ========================================================================
    // Debounced write path
    // ========================================================================

    /// Reset the document's debounce timer. Only the final firing inside a
    /// burst of edits reaches the remote.
    pub(crate) fn schedule_flush(&self, id: DocumentId) {
        let Some(store) = self.weak.upgrade() else {
            return;
        };
        let seq = self.timer_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.timers.lock().insert(id, seq);
        let window = self.config.debounce_window;
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            {
                let mut timers = store.timers.lock();
                if timers.get(&id) != Some(&seq) {
                    // Superseded by a later edit, or cancelled by delete
                    return;
                }
                timers.remove(&id);
            }
            store.flush_now(id).await;
        });
    }

    /// Drop any scheduled write for a document (delete path).
    pub(crate) fn cancel_flush(&self, id: DocumentId) {
        self.timers.lock().remove(&id);
    }

    /// Attempt the remote write for a document's current content now.
    ///
    /// This is the debounce timer body, public so callers (and tests) can
    /// force a flush without waiting out the window. Never fails: offline
    /// and remote errors both queue the write for retry.
    ///
    /// Backs off entirely while a proposal is under review: in-memory
    /// content is the staged proposal then, which must only become durable
    /// through accept. Accept and reject both reschedule the flush, so the
    /// skipped write is not lost.
    pub async fn flush_now(&self, id: DocumentId) {
        let (content, reviewing) = {
            let docs = self.documents.read();
            match docs.get(&id) {
                Some(e) => (e.content.clone(), e.original_content.is_some()),
                None => return,
            }
        };
        if reviewing {
            debug!(document = %id.short(), "flush skipped, review open");
            return;
        }
        if !self.is_online() {
            debug!(document = %id.short(), "offline, queueing write");
            self.enqueue_logged(id, &content);
            self.notify(StoreEvent::SyncStateChanged { id, state: SyncState::Queued });
            return;
        }
        match self.remote.save_content(id, &content).await {
            Ok(()) => self.mark_saved(id, &content),
            Err(e) => {
                warn!(document = %id.short(), "debounced write failed, queued for retry: {e}");
                self.enqueue_logged(id, &content);
                self.notify(StoreEvent::SyncStateChanged { id, state: SyncState::Queued });
            }
        }
    }

    /// Retry every queued write once. Successes leave the queue; failures
    /// stay for the next drain trigger (next online transition, or the
    /// next successful edit flush on that document).
    pub async fn drain_sync_queue(&self) {
        let items = match self.with_cache(|c| c.queued()) {
            Ok(items) => items,
            Err(e) => {
                warn!("sync queue unreadable, drain skipped: {e}");
                return;
            }
        };
        if items.is_empty() {
            return;
        }
        info!("draining sync queue ({} pending writes)", items.len());
        for item in items {
            match self
                .remote
                .save_content(item.document_id, &item.content)
                .await
            {
                Ok(()) => self.mark_saved(item.document_id, &item.content),
                Err(e) => {
                    warn!(
                        document = %item.document_id.short(),
                        "queued write still failing, kept for next drain: {e}"
                    );
                }
            }
        }
    }

    /// Bookkeeping after a confirmed remote save. The modified flag and
    /// queue slot are only cleared when the saved content is still
    /// current — an edit made while the request was in flight keeps the
    /// document dirty and lets its own flush supersede this one.
    fn mark_saved(&self, id: DocumentId, saved_content: &str) {
        let still_current = {
            let mut docs = self.documents.write();
            match docs.get_mut(&id) {
                // An unloaded entry has placeholder content; the queued
                // write was the latest known value, so it counts as current
                Some(entry) if !entry.loaded || entry.content == saved_content => {
                    entry.is_modified = false;
                    true
                }
                Some(_) => false,
                // Document deleted since; the queued write landed anyway
                None => true,
            }
        };
        if still_current {
            if let Err(e) = self.with_cache(|c| c.remove_queued(id)) {
                warn!(document = %id.short(), "failed to clear queued write: {e}");
            }
            self.notify(StoreEvent::SyncStateChanged { id, state: SyncState::Synced });
        }
    }

    fn enqueue_logged(&self, id: DocumentId, content: &str) {
        if let Err(e) = self.with_cache(|c| c.enqueue(id, content)) {
            warn!(document = %id.short(), "failed to queue write: {e}");
        }
    }
}
