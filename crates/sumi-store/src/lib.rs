//! # sumi-store
//!
//! Client-side document core for sumi: the registry, cache, sync and
//! review layers that sit between editor surfaces and remote storage.
//!
//! The [`WorkspaceStore`] is the single owner of document state. One
//! instance per workspace session:
//! - Holds every known document in memory (registry + lazy content)
//! - Mirrors content into a durable [`LocalCache`] on every local edit
//! - Debounces remote writes and queues them while offline
//! - Keeps per-document undo/redo history with time-coalesced steps
//! - Stages AI-proposed edits for explicit human accept/reject
//! - Broadcasts [`StoreEvent`]s so surfaces stay render-only
//!
//! Remote storage is behind the [`PersistenceAdapter`] trait; everything
//! above it is backend-agnostic.

pub mod cache;
pub mod diff;
pub mod events;
pub mod history;
pub mod remote;
pub mod review;
pub mod store;
pub mod sync;
pub mod tabs;

pub use cache::LocalCache;
pub use diff::line_diff_stats;
pub use events::StoreEvent;
pub use history::{DEFAULT_HISTORY_CAP, DocHistory};
pub use remote::{MemoryRemote, PersistenceAdapter, RemoteDocument, RemoteError};
pub use store::{StoreConfig, StoreError, WorkspaceStore};
pub use tabs::TabStrip;
