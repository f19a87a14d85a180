//! Snapshot and value types shared between the store and its consumers.
//!
//! Snapshots are read-only copies handed out by the store; mutating one has
//! no effect on store state. Consumers treat events as wake-ups and re-read
//! snapshots rather than patching local copies.

use serde::{Deserialize, Serialize};

use crate::ids::{DocumentId, TabId};

/// Read-only view of a document held by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    /// Stable document identifier.
    pub id: DocumentId,
    /// Human-facing title.
    pub title: String,
    /// Current text content. Empty until first open for lazily-loaded
    /// documents — check `loaded` to tell the two apart.
    pub content: String,
    /// Whether content has been populated (registry seeds carry title only).
    pub loaded: bool,
    /// Edited since the last confirmed remote write.
    pub is_modified: bool,
    /// A proposed edit is staged and awaiting accept/reject.
    pub is_reviewing: bool,
    /// The last committed content, present iff `is_reviewing`.
    pub original_content: Option<String>,
}

impl DocumentSnapshot {
    /// Whitespace-separated word count of the current content.
    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }

    /// Character count (Unicode scalar values, not bytes).
    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }
}

/// Read-only view of an open tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabSnapshot {
    /// Stable tab identifier.
    pub id: TabId,
    /// The document this tab views (non-owning reference).
    pub document_id: DocumentId,
    /// Denormalized title copy, refreshed on rename.
    pub title: String,
    /// Exactly one tab is active whenever any tabs exist.
    pub is_active: bool,
    /// Pinned tabs sort before unpinned ones.
    pub is_pinned: bool,
}

/// The single process-wide text selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// Document the selection lives in.
    pub document_id: DocumentId,
    /// Selected text.
    pub text: String,
    /// Start offset (chars), `start <= end`.
    pub start: usize,
    /// End offset (chars).
    pub end: usize,
}

impl Selection {
    /// Build a selection, swapping offsets if given backwards.
    pub fn new(document_id: DocumentId, text: impl Into<String>, start: usize, end: usize) -> Self {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        Self { document_id, text: text.into(), start, end }
    }

    /// Length of the selected range in chars.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the selection is a bare caret.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A write pending remote confirmation. At most one per document —
/// re-enqueueing replaces the content (last write wins).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncQueueItem {
    /// Document the write belongs to.
    pub document_id: DocumentId,
    /// Full content to persist.
    pub content: String,
    /// Enqueue time (Unix epoch seconds), informational; drain order is
    /// insertion order, replacement keeps the slot's position.
    pub queued_at: i64,
}

/// Per-document sync status for status-bar display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncState {
    /// Last known content is confirmed remotely.
    Synced,
    /// Edited; a debounced write is scheduled but not yet attempted.
    Pending,
    /// A write failed or was made offline; queued for retry.
    Queued,
}

/// Line-level diff statistics for review UI. Pure derivation — see
/// `sumi-store`'s diff module for the computation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    /// Lines present in the proposal but not the committed content.
    pub additions: usize,
    /// Lines present in the committed content but not the proposal.
    pub deletions: usize,
}

impl DiffStats {
    /// True when the two sides are line-identical.
    pub fn is_unchanged(&self) -> bool {
        self.additions == 0 && self.deletions == 0
    }
}
