//! Ordered list of open views onto documents.
//!
//! Pure in-memory presentation state: no persistence, no async. Tabs hold
//! a non-owning `DocumentId` reference; the registry closes them when the
//! document goes away. Exactly one tab is active whenever the list is
//! non-empty, and pinned tabs keep a stable prefix of the strip.

use sumi_types::{DocumentId, TabId, TabSnapshot};

#[derive(Debug, Clone)]
struct Tab {
    id: TabId,
    document_id: DocumentId,
    title: String,
    is_active: bool,
    is_pinned: bool,
}

/// The tab strip. All operations are synchronous and touch nothing but
/// the list itself.
#[derive(Debug, Default)]
pub struct TabStrip {
    tabs: Vec<Tab>,
}

impl TabStrip {
    /// Create an empty strip.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a view onto `document_id`: activate the existing tab if one
    /// exists, otherwise append a new active tab. Returns the tab id.
    pub fn open(&mut self, document_id: DocumentId, title: impl Into<String>) -> TabId {
        if let Some(existing) = self.tabs.iter().find(|t| t.document_id == document_id) {
            let id = existing.id;
            self.activate(id);
            return id;
        }
        let id = TabId::new();
        for t in &mut self.tabs {
            t.is_active = false;
        }
        self.tabs.push(Tab {
            id,
            document_id,
            title: title.into(),
            is_active: true,
            is_pinned: false,
        });
        id
    }

    /// Close a tab. If it was active, the tab now at the same index takes
    /// over, falling back to the last tab; an empty strip has no active tab.
    /// Unknown ids are ignored.
    pub fn close(&mut self, tab_id: TabId) {
        let Some(index) = self.tabs.iter().position(|t| t.id == tab_id) else {
            return;
        };
        let was_active = self.tabs[index].is_active;
        self.tabs.remove(index);
        if was_active && !self.tabs.is_empty() {
            let fallback = index.min(self.tabs.len() - 1);
            self.tabs[fallback].is_active = true;
        }
    }

    /// Close every tab viewing `document_id`. Returns how many were closed.
    pub fn close_for_document(&mut self, document_id: DocumentId) -> usize {
        let mut closed = 0;
        while let Some(tab_id) = self
            .tabs
            .iter()
            .find(|t| t.document_id == document_id)
            .map(|t| t.id)
        {
            self.close(tab_id);
            closed += 1;
        }
        closed
    }

    /// Close all tabs except `keep` and any pinned tabs.
    pub fn close_others(&mut self, keep: TabId) {
        let victims: Vec<TabId> = self
            .tabs
            .iter()
            .filter(|t| t.id != keep && !t.is_pinned)
            .map(|t| t.id)
            .collect();
        for id in victims {
            self.close(id);
        }
    }

    /// Make `tab_id` the single active tab. Unknown ids are ignored.
    pub fn activate(&mut self, tab_id: TabId) {
        if !self.tabs.iter().any(|t| t.id == tab_id) {
            return;
        }
        for t in &mut self.tabs {
            t.is_active = t.id == tab_id;
        }
    }

    /// Move the tab at `from` to position `to`, preserving which tab is
    /// active. Out-of-range indices are ignored.
    pub fn reorder(&mut self, from: usize, to: usize) {
        if from >= self.tabs.len() || to >= self.tabs.len() || from == to {
            return;
        }
        let tab = self.tabs.remove(from);
        self.tabs.insert(to, tab);
    }

    /// Pin or unpin a tab. Pinned tabs are kept as a stable prefix of the
    /// strip (relative order within each group is preserved).
    pub fn set_pinned(&mut self, tab_id: TabId, pinned: bool) {
        let Some(tab) = self.tabs.iter_mut().find(|t| t.id == tab_id) else {
            return;
        };
        if tab.is_pinned == pinned {
            return;
        }
        tab.is_pinned = pinned;
        self.tabs.sort_by_key(|t| !t.is_pinned);
    }

    /// Refresh the denormalized title on every tab viewing `document_id`.
    pub fn retitle(&mut self, document_id: DocumentId, title: &str) {
        for t in &mut self.tabs {
            if t.document_id == document_id {
                t.title = title.to_string();
            }
        }
    }

    /// The active tab's document, if any tab is open.
    pub fn active_document(&self) -> Option<DocumentId> {
        self.tabs.iter().find(|t| t.is_active).map(|t| t.document_id)
    }

    /// Number of open tabs.
    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    /// Whether the strip is empty.
    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    /// Read-only snapshots in strip order.
    pub fn snapshots(&self) -> Vec<TabSnapshot> {
        self.tabs
            .iter()
            .map(|t| TabSnapshot {
                id: t.id,
                document_id: t.document_id,
                title: t.title.clone(),
                is_active: t.is_active,
                is_pinned: t.is_pinned,
            })
            .collect()
    }
}
