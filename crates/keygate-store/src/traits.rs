//! Key storage interface.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{StoredKeyEntry, WrappedUnitKey};

/// Persistent storage for derived keys.
///
/// One master-key slot per user and one unit-key slot per (user, unit).
/// Every store operation overwrites: two tabs unlocking the same user derive
/// the same key, so last-writer-wins is correct and no locking is needed.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Put the user's master key, replacing any previous entry.
    async fn store_master_key(&self, entry: StoredKeyEntry) -> Result<()>;

    /// The user's cached master key, if any.
    async fn get_master_key(&self, user_id: &str) -> Result<Option<StoredKeyEntry>>;

    /// Remove the user's master key. Removing a missing key is not an error.
    async fn delete_master_key(&self, user_id: &str) -> Result<()>;

    /// Put a wrapped unit key, replacing any previous entry.
    async fn store_unit_key(&self, entry: WrappedUnitKey) -> Result<()>;

    async fn get_unit_key(&self, user_id: &str, unit_id: &str) -> Result<Option<WrappedUnitKey>>;

    async fn delete_unit_key(&self, user_id: &str, unit_id: &str) -> Result<()>;

    /// Remove every key of every user. Must complete before the session is
    /// invalidated on logout.
    async fn clear_all_keys(&self) -> Result<()>;

    /// Whether the backing medium can currently be read and written.
    async fn is_available(&self) -> bool;
}
