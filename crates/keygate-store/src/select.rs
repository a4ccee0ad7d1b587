//! Choosing between durable and session-only key residency.

use std::sync::Arc;

use tracing::warn;

use crate::memory::MemoryKeyStore;
use crate::traits::KeyStore;
use crate::types::Persistence;

/// The store the gate will use, and how long its keys will live.
#[derive(Clone)]
pub struct SelectedStore {
    pub store: Arc<dyn KeyStore>,
    pub persistence: Persistence,
}

impl std::fmt::Debug for SelectedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectedStore")
            .field("persistence", &self.persistence)
            .finish_non_exhaustive()
    }
}

/// Capability probe for a durable store.
pub async fn is_storage_available(store: &dyn KeyStore) -> bool {
    store.is_available().await
}

/// Use `durable` if it answers the availability probe, otherwise fall back to
/// a fresh in-memory store. Never fails: lack of durable storage degrades to
/// session-only residency, it does not block unlocking.
pub async fn select_key_store(durable: Option<Arc<dyn KeyStore>>) -> SelectedStore {
    if let Some(store) = durable {
        if is_storage_available(store.as_ref()).await {
            return SelectedStore {
                store,
                persistence: Persistence::Durable,
            };
        }
        warn!("durable key storage unavailable, keeping keys in memory for this session");
    }
    SelectedStore {
        store: Arc::new(MemoryKeyStore::new()),
        persistence: Persistence::SessionOnly,
    }
}
