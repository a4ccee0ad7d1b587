use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use keygate_crypto::MasterKey;

/// A cached master key for one user.
///
/// `key_id` ties the entry to the PRF parameters it was derived from; see
/// `keygate_crypto::key_id_for`.
#[derive(Debug, Clone)]
pub struct StoredKeyEntry {
    pub user_id: String,
    pub key_id: String,
    pub created_at: DateTime<Utc>,
    pub key: Arc<MasterKey>,
}

impl StoredKeyEntry {
    pub fn new(user_id: impl Into<String>, key_id: impl Into<String>, key: Arc<MasterKey>) -> Self {
        Self {
            user_id: user_id.into(),
            key_id: key_id.into(),
            created_at: Utc::now(),
            key,
        }
    }

    /// True once the entry is older than `window` at `now`.
    ///
    /// Entries stamped in the future (clock moved backwards) count as expired.
    pub fn is_expired(&self, window: Duration, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.created_at);
        match age.to_std() {
            Ok(age) => age > window,
            Err(_) => true,
        }
    }
}

/// A unit key in AES-KW wrapped form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedUnitKey {
    pub user_id: String,
    pub unit_id: String,
    pub wrapped: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

/// Where keys live for the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    /// Survives reloads until logout or trust-window expiry.
    Durable,
    /// Memory only; lost when the tab/process goes away.
    SessionOnly,
}
