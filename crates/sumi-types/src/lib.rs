//! Shared identifier and snapshot types for sumi.
//!
//! Everything the store and the agent surface exchange lives here:
//! typed UUIDv7 identifiers, read-only snapshot structs, and the small
//! value types (selection, sync state, diff statistics) that cross crate
//! boundaries. No behavior beyond pure derivations.

pub mod document;
pub mod ids;

pub use document::{
    DiffStats, DocumentSnapshot, Selection, SyncQueueItem, SyncState, TabSnapshot,
};
pub use ids::{DocumentId, TabId};
