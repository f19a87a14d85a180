//! Per-document undo/redo stacks with time-windowed coalescing.
//!
//! The engine does not record every keystroke. Rapid edits inside the
//! coalescing window are absorbed into the most recent undo step, the way
//! text editors group continuous typing; a pause longer than the window
//! starts a new step. Each [`DocHistory`] is owned by its document entry
//! and dies with it — there are no side maps to orphan.
//!
//! Undo/redo application goes back through the registry's
//! `update_content(.., record_history = false)` so it never generates new
//! history entries of its own.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

/// One undo (or redo) step: a full content snapshot.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    /// Document content as it was before the change that created this step.
    pub content: String,
    /// When the step was recorded.
    pub at: Instant,
}

/// Undo/redo stacks for a single document.
///
/// Both stacks are bounded; exceeding the cap evicts the oldest entry
/// (FIFO, not an error). The redo stack is cleared by every new
/// non-undo/redo mutation — new edits invalidate the redo future.
#[derive(Debug)]
pub struct DocHistory {
    undo: VecDeque<HistoryEntry>,
    redo: VecDeque<HistoryEntry>,
    cap: usize,
    /// Time of the most recent mutation (recorded or absorbed). The
    /// coalescing window slides: continuous typing never starts a new step.
    last_change: Option<Instant>,
}

/// Default stack bound, matching a generous editor history.
pub const DEFAULT_HISTORY_CAP: usize = 100;

impl Default for DocHistory {
    fn default() -> Self {
        Self::with_cap(DEFAULT_HISTORY_CAP)
    }
}

impl DocHistory {
    /// Create empty stacks with the given bound.
    pub fn with_cap(cap: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: VecDeque::new(),
            cap: cap.max(1),
            last_change: None,
        }
    }

    /// Record a mutation. `prev_content` is the document content *as it was
    /// before this change*. Returns true if a new undo step was pushed,
    /// false if the edit was absorbed into the current step.
    ///
    /// Any push clears the redo stack.
    pub fn record(&mut self, prev_content: String, window: Duration) -> bool {
        let now = Instant::now();
        let absorbed = self
            .last_change
            .is_some_and(|last| now.duration_since(last) <= window);
        self.last_change = Some(now);

        if absorbed {
            // In-flight edit continues the most recent undo step. The redo
            // stack was already cleared when that step was pushed.
            return false;
        }

        self.push_undo(HistoryEntry { content: prev_content, at: now });
        self.redo.clear();
        true
    }

    /// Pop the most recent undo step. `current_content` is pushed onto the
    /// redo stack so the operation can be mirrored. Returns the content to
    /// apply, or `None` (silent no-op) when there is nothing to undo.
    pub fn undo(&mut self, current_content: &str) -> Option<String> {
        let entry = self.undo.pop_back()?;
        push_bounded(
            &mut self.redo,
            HistoryEntry { content: current_content.to_string(), at: Instant::now() },
            self.cap,
        );
        // The restored step must not be coalesced with whatever follows.
        self.last_change = None;
        Some(entry.content)
    }

    /// Mirror of [`DocHistory::undo`] using the redo stack.
    pub fn redo(&mut self, current_content: &str) -> Option<String> {
        let entry = self.redo.pop_back()?;
        push_bounded(
            &mut self.undo,
            HistoryEntry { content: current_content.to_string(), at: Instant::now() },
            self.cap,
        );
        self.last_change = None;
        Some(entry.content)
    }

    /// Number of undo steps available.
    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    /// Number of redo steps available.
    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    fn push_undo(&mut self, entry: HistoryEntry) {
        push_bounded(&mut self.undo, entry, self.cap);
    }
}

/// Push with FIFO eviction at the cap.
fn push_bounded(stack: &mut VecDeque<HistoryEntry>, entry: HistoryEntry, cap: usize) {
    while stack.len() >= cap {
        stack.pop_front();
    }
    stack.push_back(entry);
}
