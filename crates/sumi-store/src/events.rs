//! Events broadcast when workspace state changes.
//!
//! Observers subscribe through [`crate::store::WorkspaceStore::subscribe`]
//! and re-render from snapshots; events are wake-ups, not deltas. The
//! channel is a `tokio::sync::broadcast` — lagging receivers lose the
//! oldest events, which is safe under the re-read-snapshots contract.

use sumi_types::{DocumentId, SyncState};

/// A state transition somewhere in the workspace store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// A document was seeded into the registry (workspace load).
    DocumentRegistered { id: DocumentId },
    /// A document was opened for viewing.
    DocumentOpened { id: DocumentId },
    /// In-memory content changed (edit, undo/redo, review resolution).
    ContentChanged { id: DocumentId },
    /// Background reconciliation replaced stale local content.
    DocumentReloaded { id: DocumentId },
    /// Local title changed (remote rename is best-effort).
    TitleChanged { id: DocumentId, title: String },
    /// A document was created remotely and registered.
    DocumentCreated { id: DocumentId },
    /// A document was removed from the registry.
    DocumentDeleted { id: DocumentId },
    /// A proposal was staged for review.
    ReviewStarted { id: DocumentId },
    /// A review ended; `accepted` tells which way.
    ReviewResolved { id: DocumentId, accepted: bool },
    /// The tab strip changed (open/close/reorder/pin/retitle).
    TabsChanged,
    /// The process-wide selection changed or cleared.
    SelectionChanged,
    /// A document's sync status moved between synced/pending/queued.
    SyncStateChanged { id: DocumentId, state: SyncState },
    /// The runtime went online or offline.
    ConnectivityChanged { online: bool },
}

impl StoreEvent {
    /// The document this event concerns, when it concerns exactly one.
    pub fn document_id(&self) -> Option<DocumentId> {
        match self {
            StoreEvent::DocumentRegistered { id }
            | StoreEvent::DocumentOpened { id }
            | StoreEvent::ContentChanged { id }
            | StoreEvent::DocumentReloaded { id }
            | StoreEvent::TitleChanged { id, .. }
            | StoreEvent::DocumentCreated { id }
            | StoreEvent::DocumentDeleted { id }
            | StoreEvent::ReviewStarted { id }
            | StoreEvent::ReviewResolved { id, .. }
            | StoreEvent::SyncStateChanged { id, .. } => Some(*id),
            StoreEvent::TabsChanged
            | StoreEvent::SelectionChanged
            | StoreEvent::ConnectivityChanged { .. } => None,
        }
    }
}
