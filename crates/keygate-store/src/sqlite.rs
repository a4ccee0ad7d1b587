//! SqliteKeyStore: durable, origin-scoped key persistence.
//!
//! Every row carries the origin it was written under, so one database file
//! can back several origins without any of them seeing the others' keys.
//! Writes are `INSERT OR REPLACE` (one slot per user), and `clear_all_keys`
//! wipes the origin's rows in a single transaction.
//!
//! # Key material at rest
//! Master keys are written as raw bytes. Unlike the in-memory store, whose
//! handles never leave the process, anyone who can read the database file can
//! read the keys. Put the file in a directory only the owning user can read;
//! the trust window and logout bound how long the bytes stay there.
//!
//! # Threading
//! `rusqlite` is synchronous. Calls block the current thread for the duration
//! of a single-row statement.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keygate_crypto::MasterKey;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{KeyStoreError, Result};
use crate::traits::KeyStore;
use crate::types::{StoredKeyEntry, WrappedUnitKey};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS master_keys (
    origin     TEXT NOT NULL,
    user_id    TEXT NOT NULL,
    key_id     TEXT NOT NULL,
    key        BLOB NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (origin, user_id)
);
CREATE TABLE IF NOT EXISTS unit_keys (
    origin     TEXT NOT NULL,
    user_id    TEXT NOT NULL,
    unit_id    TEXT NOT NULL,
    wrapped    BLOB NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (origin, user_id, unit_id)
);
";

pub struct SqliteKeyStore {
    conn: Mutex<Connection>,
    origin: String,
}

impl SqliteKeyStore {
    /// Open (or create) the key database at `path`, scoped to `origin`.
    pub fn open(path: &Path, origin: impl Into<String>) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| KeyStoreError::Unavailable(format!("{}: {}", path.display(), e)))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        let store = Self::from_connection(conn, origin)?;
        info!(path = %path.display(), origin = %store.origin, "key store opened");
        Ok(store)
    }

    /// In-memory database; same semantics, nothing survives the process.
    pub fn open_in_memory(origin: impl Into<String>) -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, origin)
    }

    fn from_connection(conn: Connection, origin: impl Into<String>) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            origin: origin.into(),
        })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }
}

fn parse_timestamp(user_id: &str, raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| KeyStoreError::Corrupt {
            user_id: user_id.to_string(),
            reason: format!("bad created_at: {e}"),
        })
}

#[async_trait]
impl KeyStore for SqliteKeyStore {
    async fn store_master_key(&self, entry: StoredKeyEntry) -> Result<()> {
        let raw = entry.key.export_raw();
        self.conn.lock().execute(
            "INSERT OR REPLACE INTO master_keys (origin, user_id, key_id, key, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                self.origin,
                entry.user_id,
                entry.key_id,
                raw.as_slice(),
                entry.created_at.to_rfc3339(),
            ],
        )?;
        debug!(user_id = %entry.user_id, key_id = %entry.key_id, "master key stored");
        Ok(())
    }

    async fn get_master_key(&self, user_id: &str) -> Result<Option<StoredKeyEntry>> {
        let row = self
            .conn
            .lock()
            .query_row(
                "SELECT key_id, key, created_at FROM master_keys
                 WHERE origin = ?1 AND user_id = ?2",
                params![self.origin, user_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Vec<u8>>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((key_id, raw, created_at)) = row else {
            return Ok(None);
        };
        let raw = zeroize::Zeroizing::new(raw);
        let key = MasterKey::from_raw(&raw).map_err(|e| KeyStoreError::Corrupt {
            user_id: user_id.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Some(StoredKeyEntry {
            user_id: user_id.to_string(),
            key_id,
            created_at: parse_timestamp(user_id, &created_at)?,
            key: Arc::new(key),
        }))
    }

    async fn delete_master_key(&self, user_id: &str) -> Result<()> {
        self.conn.lock().execute(
            "DELETE FROM master_keys WHERE origin = ?1 AND user_id = ?2",
            params![self.origin, user_id],
        )?;
        Ok(())
    }

    async fn store_unit_key(&self, entry: WrappedUnitKey) -> Result<()> {
        self.conn.lock().execute(
            "INSERT OR REPLACE INTO unit_keys (origin, user_id, unit_id, wrapped, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                self.origin,
                entry.user_id,
                entry.unit_id,
                entry.wrapped,
                entry.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn get_unit_key(&self, user_id: &str, unit_id: &str) -> Result<Option<WrappedUnitKey>> {
        let row = self
            .conn
            .lock()
            .query_row(
                "SELECT wrapped, created_at FROM unit_keys
                 WHERE origin = ?1 AND user_id = ?2 AND unit_id = ?3",
                params![self.origin, user_id, unit_id],
                |row| Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        let Some((wrapped, created_at)) = row else {
            return Ok(None);
        };
        Ok(Some(WrappedUnitKey {
            user_id: user_id.to_string(),
            unit_id: unit_id.to_string(),
            wrapped,
            created_at: parse_timestamp(user_id, &created_at)?,
        }))
    }

    async fn delete_unit_key(&self, user_id: &str, unit_id: &str) -> Result<()> {
        self.conn.lock().execute(
            "DELETE FROM unit_keys WHERE origin = ?1 AND user_id = ?2 AND unit_id = ?3",
            params![self.origin, user_id, unit_id],
        )?;
        Ok(())
    }

    async fn clear_all_keys(&self) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let masters = tx.execute("DELETE FROM master_keys WHERE origin = ?1", [&self.origin])?;
        let units = tx.execute("DELETE FROM unit_keys WHERE origin = ?1", [&self.origin])?;
        tx.commit()?;
        debug!(origin = %self.origin, masters, units, "all keys cleared");
        Ok(())
    }

    async fn is_available(&self) -> bool {
        self.conn
            .lock()
            .query_row("SELECT COUNT(*) FROM master_keys", [], |row| {
                row.get::<_, i64>(0)
            })
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(user: &str, byte: u8) -> StoredKeyEntry {
        StoredKeyEntry::new(
            user,
            format!("kid-{byte}"),
            Arc::new(MasterKey::from_raw(&[byte; 32]).unwrap()),
        )
    }

    fn unit(user: &str, unit_id: &str) -> WrappedUnitKey {
        WrappedUnitKey {
            user_id: user.into(),
            unit_id: unit_id.into(),
            wrapped: vec![9u8; 40],
            created_at: DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        }
    }

    #[tokio::test]
    async fn master_key_round_trip() {
        let store = SqliteKeyStore::open_in_memory("https://app.example").unwrap();
        let stored = entry("alice", 3);
        store.store_master_key(stored.clone()).await.unwrap();

        let got = store.get_master_key("alice").await.unwrap().unwrap();
        assert_eq!(got.key_id, "kid-3");
        assert_eq!(*got.key.export_raw(), *stored.key.export_raw());
        assert_eq!(
            got.created_at.timestamp_micros(),
            stored.created_at.timestamp_micros()
        );
    }

    #[tokio::test]
    async fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.db");
        {
            let store = SqliteKeyStore::open(&path, "https://app.example").unwrap();
            store.store_master_key(entry("alice", 4)).await.unwrap();
        }
        let store = SqliteKeyStore::open(&path, "https://app.example").unwrap();
        let got = store.get_master_key("alice").await.unwrap().unwrap();
        assert_eq!(got.key_id, "kid-4");
    }

    #[tokio::test]
    async fn origins_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.db");
        let a = SqliteKeyStore::open(&path, "https://a.example").unwrap();
        a.store_master_key(entry("alice", 1)).await.unwrap();
        drop(a);

        let b = SqliteKeyStore::open(&path, "https://b.example").unwrap();
        assert!(b.get_master_key("alice").await.unwrap().is_none());
        b.clear_all_keys().await.unwrap();
        drop(b);

        let a = SqliteKeyStore::open(&path, "https://a.example").unwrap();
        assert!(a.get_master_key("alice").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn overwrite_keeps_one_row() {
        let store = SqliteKeyStore::open_in_memory("o").unwrap();
        store.store_master_key(entry("alice", 1)).await.unwrap();
        store.store_master_key(entry("alice", 2)).await.unwrap();
        let count: i64 = store
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM master_keys", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
        let got = store.get_master_key("alice").await.unwrap().unwrap();
        assert_eq!(got.key_id, "kid-2");
    }

    #[tokio::test]
    async fn unit_keys_round_trip() {
        let store = SqliteKeyStore::open_in_memory("o").unwrap();
        store.store_unit_key(unit("alice", "ws-1")).await.unwrap();
        assert_eq!(
            store.get_unit_key("alice", "ws-1").await.unwrap(),
            Some(unit("alice", "ws-1"))
        );
        store.delete_unit_key("alice", "ws-1").await.unwrap();
        assert!(store.get_unit_key("alice", "ws-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clear_all_wipes_every_user() {
        let store = SqliteKeyStore::open_in_memory("o").unwrap();
        store.store_master_key(entry("alice", 1)).await.unwrap();
        store.store_master_key(entry("bob", 2)).await.unwrap();
        store.store_unit_key(unit("bob", "ws-1")).await.unwrap();

        store.clear_all_keys().await.unwrap();

        assert!(store.get_master_key("alice").await.unwrap().is_none());
        assert!(store.get_master_key("bob").await.unwrap().is_none());
        assert!(store.get_unit_key("bob", "ws-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_key_is_reported() {
        let store = SqliteKeyStore::open_in_memory("o").unwrap();
        store
            .conn
            .lock()
            .execute(
                "INSERT INTO master_keys VALUES ('o', 'alice', 'kid', x'0102', '2026-01-01T00:00:00Z')",
                [],
            )
            .unwrap();
        let err = store.get_master_key("alice").await.unwrap_err();
        assert!(matches!(err, KeyStoreError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn available_when_open() {
        let store = SqliteKeyStore::open_in_memory("o").unwrap();
        assert!(store.is_available().await);
    }
}
