//! SQLite-backed local cache and sync queue.
//!
//! The durability floor of the write path: every `update_content` call
//! lands here synchronously before any network work is scheduled, so a
//! completed call never loses data even if the process dies immediately
//! after. The sync queue shares the same database — one row per document,
//! last write wins.

use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use sumi_types::{DocumentId, SyncQueueItem};

const SCHEMA: &str = r#"
-- Last-known content per document (the fast read path)
CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY,
    content TEXT NOT NULL,
    updated_at INTEGER DEFAULT (unixepoch())
);

-- Writes pending remote confirmation; at most one row per document
CREATE TABLE IF NOT EXISTS sync_queue (
    document_id TEXT PRIMARY KEY,
    content TEXT NOT NULL,
    queued_at INTEGER DEFAULT (unixepoch())
);
"#;

/// Durable key→content cache plus the sync queue.
pub struct LocalCache {
    conn: Connection,
}

impl LocalCache {
    /// Open or create a cache database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> SqliteResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Create an in-memory cache (for testing).
    pub fn in_memory() -> SqliteResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    // ========================================================================
    // Document content
    // ========================================================================

    /// Last cached content for a document.
    pub fn get(&self, id: DocumentId) -> SqliteResult<Option<String>> {
        self.conn
            .query_row(
                "SELECT content FROM documents WHERE id = ?1",
                params![id.to_hex()],
                |row| row.get(0),
            )
            .optional()
    }

    /// Insert or overwrite the cached content for a document.
    pub fn put(&self, id: DocumentId, content: &str) -> SqliteResult<()> {
        self.conn.execute(
            "INSERT INTO documents (id, content, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET content = ?2, updated_at = ?3",
            params![id.to_hex(), content, epoch_secs()],
        )?;
        Ok(())
    }

    /// Drop a document's cached content (and any queued write for it).
    pub fn remove(&self, id: DocumentId) -> SqliteResult<()> {
        self.conn
            .execute("DELETE FROM documents WHERE id = ?1", params![id.to_hex()])?;
        self.remove_queued(id)?;
        Ok(())
    }

    /// Number of cached documents.
    pub fn len(&self) -> SqliteResult<usize> {
        self.conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get::<_, i64>(0))
            .map(|n| n as usize)
    }

    /// Whether the cache holds no documents.
    pub fn is_empty(&self) -> SqliteResult<bool> {
        Ok(self.len()? == 0)
    }

    // ========================================================================
    // Sync queue
    // ========================================================================

    /// Queue (or replace) a pending write for a document. The original
    /// enqueue time is preserved on replacement so drain order stays
    /// stable while the content is last-write-wins.
    pub fn enqueue(&self, id: DocumentId, content: &str) -> SqliteResult<()> {
        self.conn.execute(
            "INSERT INTO sync_queue (document_id, content, queued_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(document_id) DO UPDATE SET content = ?2",
            params![id.to_hex(), content, epoch_secs()],
        )?;
        Ok(())
    }

    /// Remove a pending write after a successful remote save.
    pub fn remove_queued(&self, id: DocumentId) -> SqliteResult<()> {
        self.conn.execute(
            "DELETE FROM sync_queue WHERE document_id = ?1",
            params![id.to_hex()],
        )?;
        Ok(())
    }

    /// The pending write for one document, if any.
    pub fn queued_for(&self, id: DocumentId) -> SqliteResult<Option<SyncQueueItem>> {
        self.conn
            .query_row(
                "SELECT document_id, content, queued_at FROM sync_queue WHERE document_id = ?1",
                params![id.to_hex()],
                row_to_item,
            )
            .optional()
    }

    /// All pending writes, in enqueue order. Replacing a document's
    /// content keeps its position (rowid survives the upsert), and
    /// `queued_at` is second-granularity, so rowid is the order source.
    pub fn queued(&self) -> SqliteResult<Vec<SyncQueueItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT document_id, content, queued_at FROM sync_queue
             ORDER BY rowid",
        )?;
        let rows = stmt.query_map([], row_to_item)?;
        rows.collect()
    }
}

fn row_to_item(row: &rusqlite::Row<'_>) -> SqliteResult<SyncQueueItem> {
    let id_hex: String = row.get(0)?;
    let document_id = DocumentId::parse(&id_hex).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })?;
    Ok(SyncQueueItem {
        document_id,
        content: row.get(1)?,
        queued_at: row.get(2)?,
    })
}

fn epoch_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_round_trip() {
        let cache = LocalCache::in_memory().unwrap();
        let id = DocumentId::new();
        assert_eq!(cache.get(id).unwrap(), None);

        cache.put(id, "draft one").unwrap();
        assert_eq!(cache.get(id).unwrap().as_deref(), Some("draft one"));

        cache.put(id, "draft two").unwrap();
        assert_eq!(cache.get(id).unwrap().as_deref(), Some("draft two"));
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[test]
    fn remove_clears_content_and_queue() {
        let cache = LocalCache::in_memory().unwrap();
        let id = DocumentId::new();
        cache.put(id, "text").unwrap();
        cache.enqueue(id, "text").unwrap();

        cache.remove(id).unwrap();
        assert_eq!(cache.get(id).unwrap(), None);
        assert!(cache.queued_for(id).unwrap().is_none());
        assert!(cache.is_empty().unwrap());
    }

    #[test]
    fn enqueue_is_single_slot_last_write_wins() {
        let cache = LocalCache::in_memory().unwrap();
        let id = DocumentId::new();
        cache.enqueue(id, "first").unwrap();
        cache.enqueue(id, "second").unwrap();

        let queued = cache.queued().unwrap();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].document_id, id);
        assert_eq!(queued[0].content, "second");
    }

    #[test]
    fn queue_drains_in_enqueue_order() {
        let cache = LocalCache::in_memory().unwrap();
        // UUIDv7 ids are time-ordered; enqueue the later id first so the
        // assertion cannot pass on id order by accident
        let earlier = DocumentId::new();
        let later = DocumentId::new();
        cache.enqueue(later, "l").unwrap();
        cache.enqueue(earlier, "e").unwrap();
        // Replacing content must not move the item behind newer entries
        cache.enqueue(later, "l2").unwrap();

        let ids: Vec<DocumentId> = cache
            .queued()
            .unwrap()
            .into_iter()
            .map(|i| i.document_id)
            .collect();
        assert_eq!(ids, vec![later, earlier]);
    }

    #[test]
    fn remove_queued_leaves_others() {
        let cache = LocalCache::in_memory().unwrap();
        let a = DocumentId::new();
        let b = DocumentId::new();
        cache.enqueue(a, "a").unwrap();
        cache.enqueue(b, "b").unwrap();

        cache.remove_queued(a).unwrap();
        assert!(cache.queued_for(a).unwrap().is_none());
        assert!(cache.queued_for(b).unwrap().is_some());
    }

    #[test]
    fn survives_reopen_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");
        let id = DocumentId::new();

        {
            let cache = LocalCache::open(&path).unwrap();
            cache.put(id, "persisted").unwrap();
            cache.enqueue(id, "persisted").unwrap();
        }

        let cache = LocalCache::open(&path).unwrap();
        assert_eq!(cache.get(id).unwrap().as_deref(), Some("persisted"));
        assert_eq!(cache.queued().unwrap().len(), 1);
    }
}
