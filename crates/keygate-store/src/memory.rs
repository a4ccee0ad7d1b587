//! MemoryKeyStore: session-only key residency.
//!
//! Used when durable storage is disabled (private browsing, storage quota,
//! locked-down profiles) and in tests. Interior mutability via
//! `parking_lot::Mutex`; uncontended locks are near-free on single-threaded
//! targets.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::Result;
use crate::traits::KeyStore;
use crate::types::{StoredKeyEntry, WrappedUnitKey};

#[derive(Default)]
pub struct MemoryKeyStore {
    /// user id → master key entry
    master_keys: Mutex<HashMap<String, StoredKeyEntry>>,
    /// (user id, unit id) → wrapped unit key
    unit_keys: Mutex<HashMap<(String, String), WrappedUnitKey>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached master keys.
    pub fn master_key_count(&self) -> usize {
        self.master_keys.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.master_keys.lock().is_empty() && self.unit_keys.lock().is_empty()
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn store_master_key(&self, entry: StoredKeyEntry) -> Result<()> {
        self.master_keys
            .lock()
            .insert(entry.user_id.clone(), entry);
        Ok(())
    }

    async fn get_master_key(&self, user_id: &str) -> Result<Option<StoredKeyEntry>> {
        Ok(self.master_keys.lock().get(user_id).cloned())
    }

    async fn delete_master_key(&self, user_id: &str) -> Result<()> {
        self.master_keys.lock().remove(user_id);
        Ok(())
    }

    async fn store_unit_key(&self, entry: WrappedUnitKey) -> Result<()> {
        self.unit_keys
            .lock()
            .insert((entry.user_id.clone(), entry.unit_id.clone()), entry);
        Ok(())
    }

    async fn get_unit_key(&self, user_id: &str, unit_id: &str) -> Result<Option<WrappedUnitKey>> {
        Ok(self
            .unit_keys
            .lock()
            .get(&(user_id.to_string(), unit_id.to_string()))
            .cloned())
    }

    async fn delete_unit_key(&self, user_id: &str, unit_id: &str) -> Result<()> {
        self.unit_keys
            .lock()
            .remove(&(user_id.to_string(), unit_id.to_string()));
        Ok(())
    }

    async fn clear_all_keys(&self) -> Result<()> {
        self.master_keys.lock().clear();
        self.unit_keys.lock().clear();
        Ok(())
    }

    async fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use keygate_crypto::MasterKey;
    use std::sync::Arc;

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
            wrapped: vec![7u8; 40],
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn store_get_delete() {
        let store = MemoryKeyStore::new();
        assert!(store.get_master_key("alice").await.unwrap().is_none());

        store.store_master_key(entry("alice", 1)).await.unwrap();
        let got = store.get_master_key("alice").await.unwrap().unwrap();
        assert_eq!(got.key_id, "kid-1");

        store.delete_master_key("alice").await.unwrap();
        assert!(store.get_master_key("alice").await.unwrap().is_none());
        // Deleting again is fine
        store.delete_master_key("alice").await.unwrap();
    }

    #[tokio::test]
    async fn users_are_isolated() {
        let store = MemoryKeyStore::new();
        store.store_master_key(entry("alice", 1)).await.unwrap();
        assert!(store.get_master_key("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn store_overwrites_single_slot() {
        let store = MemoryKeyStore::new();
        store.store_master_key(entry("alice", 1)).await.unwrap();
        store.store_master_key(entry("alice", 2)).await.unwrap();
        assert_eq!(store.master_key_count(), 1);
        let got = store.get_master_key("alice").await.unwrap().unwrap();
        assert_eq!(got.key_id, "kid-2");
    }

    #[tokio::test]
    async fn unit_keys_round_trip() {
        let store = MemoryKeyStore::new();
        let stored = unit("alice", "ws-1");
        store.store_unit_key(stored.clone()).await.unwrap();
        assert_eq!(store.get_unit_key("alice", "ws-1").await.unwrap(), Some(stored));
        assert!(store.get_unit_key("alice", "ws-2").await.unwrap().is_none());
        assert!(store.get_unit_key("bob", "ws-1").await.unwrap().is_none());

        store.delete_unit_key("alice", "ws-1").await.unwrap();
        assert!(store.get_unit_key("alice", "ws-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clear_all_wipes_every_user() {
        let store = MemoryKeyStore::new();
        store.store_master_key(entry("alice", 1)).await.unwrap();
        store.store_master_key(entry("bob", 2)).await.unwrap();
        store.store_unit_key(unit("alice", "ws-1")).await.unwrap();

        store.clear_all_keys().await.unwrap();

        assert!(store.get_master_key("alice").await.unwrap().is_none());
        assert!(store.get_master_key("bob").await.unwrap().is_none());
        assert!(store.get_unit_key("alice", "ws-1").await.unwrap().is_none());
        assert!(store.is_empty());
    }
}
