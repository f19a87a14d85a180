//! The editing surface handed to an AI collaborator.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use sumi_store::{StoreError, WorkspaceStore};
use sumi_types::DocumentId;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("find/replace needle must not be empty")]
    EmptyNeedle,
}

// ============================================================================
// Find/replace
// ============================================================================

/// Which documents a find/replace pass touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceScope {
    /// A single document, loaded on demand.
    Document(DocumentId),
    /// Every document with an open tab, in tab order.
    OpenSet,
}

/// Per-document result of a find/replace pass. Documents with zero
/// matches are omitted entirely, so an empty result means "found
/// nothing anywhere".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceOutcome {
    pub document_id: DocumentId,
    pub replacements: usize,
}

// ============================================================================
// Editor
// ============================================================================

/// Mediated write access to the store for an AI collaborator.
///
/// Content mutations stage a proposal instead of committing; structural
/// operations (create, rename, delete) apply directly, same as they
/// would from the human's own UI.
#[derive(Clone)]
pub struct AgentEditor {
    store: Arc<WorkspaceStore>,
}

impl AgentEditor {
    pub fn new(store: Arc<WorkspaceStore>) -> Self {
        Self { store }
    }

    /// Stage a full-content rewrite for human review. Opens the document
    /// first so the review baseline is its real committed content, never
    /// a lazy placeholder.
    pub async fn propose(
        &self,
        id: DocumentId,
        content: impl Into<String>,
    ) -> Result<(), AgentError> {
        self.store.open(id).await?;
        self.store.propose(id, content)?;
        Ok(())
    }

    /// Create a document, open it, and stage its body as a proposal so
    /// the human reviews agent-authored content before it commits. An
    /// empty body skips the review step.
    pub async fn create_and_open(
        &self,
        title: &str,
        content: &str,
    ) -> Result<DocumentId, AgentError> {
        let id = self.store.create(title).await?;
        if !content.is_empty() {
            self.store.propose(id, content)?;
        }
        info!(document = %id.short(), title, "agent created document");
        Ok(id)
    }

    /// Rename a document. Applies immediately, not subject to review.
    pub async fn rename(&self, id: DocumentId, title: &str) -> Result<(), AgentError> {
        self.store.rename(id, title).await?;
        Ok(())
    }

    /// Delete a document. Applies immediately; any staged review on it
    /// dies with the document.
    pub async fn delete(&self, id: DocumentId) -> Result<(), AgentError> {
        self.store.delete(id).await?;
        Ok(())
    }

    /// Replace every occurrence of `needle` across the scope, staging
    /// one proposal per affected document. Documents already under
    /// review get a re-proposal on top of the staged content, so the
    /// human still sees a single cumulative diff against committed
    /// state.
    pub async fn find_replace(
        &self,
        scope: ReplaceScope,
        needle: &str,
        replacement: &str,
    ) -> Result<Vec<ReplaceOutcome>, AgentError> {
        if needle.is_empty() {
            return Err(AgentError::EmptyNeedle);
        }
        let targets = match scope {
            ReplaceScope::Document(id) => {
                self.store.open(id).await?;
                vec![id]
            }
            ReplaceScope::OpenSet => {
                let mut seen = Vec::new();
                for tab in self.store.tabs() {
                    if !seen.contains(&tab.document_id) {
                        seen.push(tab.document_id);
                    }
                }
                seen
            }
        };

        let mut outcomes = Vec::new();
        for id in targets {
            let snapshot = self
                .store
                .document(id)
                .ok_or(StoreError::UnknownDocument(id))?;
            let replacements = snapshot.content.matches(needle).count();
            if replacements == 0 {
                continue;
            }
            let rewritten = snapshot.content.replace(needle, replacement);
            self.store.propose(id, rewritten)?;
            debug!(
                document = %id.short(),
                replacements,
                "staged find/replace proposal"
            );
            outcomes.push(ReplaceOutcome { document_id: id, replacements });
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use sumi_store::{LocalCache, MemoryRemote, StoreConfig};

    fn editor_with_remote() -> (AgentEditor, Arc<WorkspaceStore>, Arc<MemoryRemote>) {
        let remote = Arc::new(MemoryRemote::new());
        let store = WorkspaceStore::new(
            remote.clone(),
            LocalCache::in_memory().expect("cache"),
            StoreConfig::default(),
        );
        (AgentEditor::new(store.clone()), store, remote)
    }

    #[tokio::test(start_paused = true)]
    async fn created_document_body_awaits_review() {
        let (editor, store, remote) = editor_with_remote();
        let id = editor
            .create_and_open("Draft", "agent-written body")
            .await
            .expect("create");

        let snap = store.document(id).expect("registered");
        assert!(snap.is_reviewing);
        assert_eq!(snap.content, "agent-written body");
        // The committed baseline is the empty document
        assert_eq!(snap.original_content.as_deref(), Some(""));
        assert_eq!(remote.title_of(id).as_deref(), Some("Draft"));
    }

    #[tokio::test(start_paused = true)]
    async fn create_with_empty_body_skips_review() {
        let (editor, store, _remote) = editor_with_remote();
        let id = editor.create_and_open("Empty", "").await.expect("create");
        assert!(!store.document(id).expect("registered").is_reviewing);
    }

    #[tokio::test(start_paused = true)]
    async fn find_replace_single_document() {
        let (editor, store, remote) = editor_with_remote();
        let id = remote.seed("Essay", "the colour of colourful things");

        let outcomes = editor
            .find_replace(ReplaceScope::Document(id), "colour", "color")
            .await
            .expect("replace");
        assert_eq!(
            outcomes,
            vec![ReplaceOutcome { document_id: id, replacements: 2 }]
        );

        let snap = store.document(id).expect("loaded");
        assert!(snap.is_reviewing);
        assert_eq!(snap.content, "the color of colorful things");
        // Nothing committed until the human accepts
        assert_eq!(
            remote.content_of(id).as_deref(),
            Some("the colour of colourful things")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn open_set_scope_skips_unmatched_documents() {
        let (editor, store, remote) = editor_with_remote();
        let a = remote.seed("A", "teh quick fox");
        let b = remote.seed("B", "no typos here");
        store.open(a).await.expect("open a");
        store.open(b).await.expect("open b");

        let outcomes = editor
            .find_replace(ReplaceScope::OpenSet, "teh", "the")
            .await
            .expect("replace");
        assert_eq!(
            outcomes,
            vec![ReplaceOutcome { document_id: a, replacements: 1 }]
        );
        assert!(store.document(a).expect("a").is_reviewing);
        assert!(!store.document(b).expect("b").is_reviewing);
    }

    #[tokio::test(start_paused = true)]
    async fn find_replace_on_reviewing_doc_keeps_committed_baseline() {
        let (editor, store, remote) = editor_with_remote();
        let id = remote.seed("Doc", "committed text");
        store.open(id).await.expect("open");
        editor.propose(id, "staged text").await.expect("propose");

        editor
            .find_replace(ReplaceScope::Document(id), "staged", "reworked")
            .await
            .expect("replace");

        let snap = store.document(id).expect("doc");
        assert_eq!(snap.content, "reworked text");
        assert_eq!(snap.original_content.as_deref(), Some("committed text"));

        // Rejecting unwinds the whole cumulative proposal
        assert!(store.reject(id).expect("reject"));
        assert_eq!(store.document(id).expect("doc").content, "committed text");
    }

    #[tokio::test(start_paused = true)]
    async fn propose_on_unopened_document_loads_the_real_baseline() {
        let (editor, store, remote) = editor_with_remote();
        let id = remote.seed("Doc", "precious committed text");
        store.register(id, "Doc");

        editor.propose(id, "agent draft").await.expect("propose");
        let snap = store.document(id).expect("doc");
        assert_eq!(
            snap.original_content.as_deref(),
            Some("precious committed text")
        );
        assert_eq!(snap.content, "agent draft");

        // Rejecting restores the committed text, not a placeholder
        assert!(store.reject(id).expect("reject"));
        assert_eq!(
            store.document(id).expect("doc").content,
            "precious committed text"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn empty_needle_is_rejected() {
        let (editor, _store, remote) = editor_with_remote();
        let id = remote.seed("Doc", "text");
        let err = editor
            .find_replace(ReplaceScope::Document(id), "", "x")
            .await
            .expect_err("must fail");
        assert!(matches!(err, AgentError::EmptyNeedle));
    }
}
