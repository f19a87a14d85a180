//! AI collaborator surface over the workspace store.
//!
//! Everything an AI collaborator does to documents flows through the
//! [`AgentEditor`], which routes content changes into the store's review
//! pipeline. The collaborator never commits content directly: a human
//! accepts or rejects every staged edit.
//!
//! ## Usage
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use sumi_store::{LocalCache, MemoryRemote, StoreConfig, WorkspaceStore};
//! # use sumi_agent::{AgentEditor, ReplaceScope};
//! # async fn run() -> anyhow::Result<()> {
//! let store = WorkspaceStore::new(
//!     Arc::new(MemoryRemote::new()),
//!     LocalCache::in_memory()?,
//!     StoreConfig::default(),
//! );
//! let editor = AgentEditor::new(store.clone());
//! let outcomes = editor
//!     .find_replace(ReplaceScope::OpenSet, "colour", "color")
//!     .await?;
//! for o in outcomes {
//!     println!("{}: {} replacements staged", o.document_id.short(), o.replacements);
//! }
//! # Ok(())
//! # }
//! ```

mod editor;

pub use editor::{AgentEditor, AgentError, ReplaceOutcome, ReplaceScope};
