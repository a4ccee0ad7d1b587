//! Per-unit keys (one per workspace, shared document, ...).
//!
//! Unit keys are random, wrapped by the live master key and stored only in
//! wrapped form. Losing the master key loses every unit key with it.

use chrono::Utc;
use keygate_crypto::{generate_unit_key, unwrap_unit_key, wrap_unit_key, UnitKey};
use keygate_store::{KeyStore, WrappedUnitKey};
use tracing::debug;

use crate::context::EncryptionContext;
use crate::error::Result;

/// Create, wrap and store a fresh key for `unit_id`, replacing any existing one.
pub async fn create_unit_key(
    context: &EncryptionContext,
    store: &dyn KeyStore,
    user_id: &str,
    unit_id: &str,
) -> Result<UnitKey> {
    let master = context.master_key()?;
    let key = generate_unit_key()?;
    let wrapped = wrap_unit_key(&key, &master)?;
    store
        .store_unit_key(WrappedUnitKey {
            user_id: user_id.to_string(),
            unit_id: unit_id.to_string(),
            wrapped: wrapped.to_vec(),
            created_at: Utc::now(),
        })
        .await?;
    debug!(user_id, unit_id, "unit key created");
    Ok(key)
}

/// Load and unwrap the stored key for `unit_id`, if any.
///
/// A wrapped key that does not unwrap under the live master key is an error,
/// not a miss.
pub async fn load_unit_key(
    context: &EncryptionContext,
    store: &dyn KeyStore,
    user_id: &str,
    unit_id: &str,
) -> Result<Option<UnitKey>> {
    let master = context.master_key()?;
    let Some(entry) = store.get_unit_key(user_id, unit_id).await? else {
        return Ok(None);
    };
    Ok(Some(unwrap_unit_key(&entry.wrapped, &master)?))
}
