//! First-time setup and unlock orchestration.
//!
//! Both flows end with a master key in the key store. A failed store write is
//! logged and reported through [`UnlockedKey::persisted`] rather than failing
//! the flow: the key is still usable for this session.

use std::sync::Arc;

use keygate_crypto::{
    check_verifier, create_verifier, derive_key_from_prf, generate_prf_params, key_id_for,
    MasterKey, PrfKeyParams, PrfParamRecord,
};
use keygate_store::{KeyStore, StoredKeyEntry};
use tracing::{info, warn};

use crate::ceremony::{ensure_prf_supported, prf_output_from, CeremonyOutcome, PasskeyCeremony};
use crate::error::{GateError, Result};
use crate::transport::ParamsSource;

/// A freshly derived master key.
#[derive(Debug, Clone)]
pub struct UnlockedKey {
    pub key: Arc<MasterKey>,
    pub key_id: String,
    pub credential_id: String,
    /// False if the key store refused the write.
    pub persisted: bool,
}

/// Key material recovered from a ceremony outcome, not yet stored anywhere.
#[derive(Debug)]
pub struct DerivedKey {
    pub key: MasterKey,
    pub key_id: String,
    pub credential_id: String,
}

/// Turn a registration outcome into a master key and the parameter record
/// to save on the server.
pub fn complete_setup(
    user_id: &str,
    prf: &PrfKeyParams,
    outcome: CeremonyOutcome,
) -> Result<(DerivedKey, PrfParamRecord)> {
    let (credential_id, prf_output) = prf_output_from(outcome)?;
    let key = derive_key_from_prf(&prf_output, prf)?;
    let verifier = create_verifier(&key, user_id)?;
    let record = prf.to_record(&credential_id, Some(verifier));
    let key_id = key_id_for(prf, &credential_id);
    Ok((
        DerivedKey {
            key,
            key_id,
            credential_id,
        },
        record,
    ))
}

/// Turn an authentication outcome into the master key for `record`.
///
/// The derived key is checked against the record's verifier. A key that
/// cannot open it came from a different passkey and is dropped with
/// `CredentialMismatch`.
pub fn complete_unlock(
    user_id: &str,
    record: &PrfParamRecord,
    outcome: CeremonyOutcome,
) -> Result<DerivedKey> {
    let prf = PrfKeyParams::from_record(record)?;
    let (credential_id, prf_output) = prf_output_from(outcome)?;
    let key = derive_key_from_prf(&prf_output, &prf)?;

    match &record.verifier {
        Some(verifier) => {
            if !check_verifier(&key, user_id, verifier)? {
                warn!(user_id, "derived key does not open the verifier");
                return Err(GateError::CredentialMismatch);
            }
        }
        None => {
            if credential_id != record.credential_id {
                return Err(GateError::CredentialMismatch);
            }
            warn!(user_id, "parameter record has no verifier, key not checked");
        }
    }

    Ok(DerivedKey {
        key,
        key_id: key_id_for(&prf, &record.credential_id),
        credential_id: record.credential_id.clone(),
    })
}

/// Register a passkey and derive the user's master key for the first time.
///
/// Fails with `AlreadySetUp` if the server already holds parameters; setting
/// up again would orphan everything encrypted under the existing key.
pub async fn initialize_prf_encryption(
    user_id: &str,
    ceremony: &dyn PasskeyCeremony,
    params: &dyn ParamsSource,
    store: &dyn KeyStore,
) -> Result<UnlockedKey> {
    ensure_prf_supported(ceremony)?;

    if params.fetch_prf_params(user_id).await?.is_some() {
        return Err(GateError::AlreadySetUp);
    }

    let prf = generate_prf_params()?;
    let mut outcome = ceremony.register(user_id, &prf.prf_salt).await?;
    if outcome.prf_output.is_none() {
        // Some authenticators only report `prf.enabled` at registration; an
        // immediate assertion yields the actual output.
        outcome = ceremony
            .authenticate(&prf.prf_salt, Some(outcome.credential_id.as_str()))
            .await?;
    }

    let (derived, record) = complete_setup(user_id, &prf, outcome)?;
    params.save_prf_params(user_id, &record).await?;

    let unlocked = persist(user_id, derived, store).await;
    info!(user_id, key_id = %unlocked.key_id, "encryption set up");
    Ok(unlocked)
}

/// Fetch the user's parameters and unlock with them.
pub async fn unlock_prf_encryption(
    user_id: &str,
    ceremony: &dyn PasskeyCeremony,
    params: &dyn ParamsSource,
    store: &dyn KeyStore,
) -> Result<UnlockedKey> {
    let record = params
        .fetch_prf_params(user_id)
        .await?
        .ok_or(GateError::NotSetUp)?;
    unlock_with_record(user_id, &record, ceremony, store).await
}

/// Unlock with an already fetched parameter record.
pub async fn unlock_with_record(
    user_id: &str,
    record: &PrfParamRecord,
    ceremony: &dyn PasskeyCeremony,
    store: &dyn KeyStore,
) -> Result<UnlockedKey> {
    ensure_prf_supported(ceremony)?;

    let prf = PrfKeyParams::from_record(record)?;
    let outcome = ceremony
        .authenticate(&prf.prf_salt, Some(record.credential_id.as_str()))
        .await?;
    let derived = complete_unlock(user_id, record, outcome)?;

    let unlocked = persist(user_id, derived, store).await;
    info!(user_id, key_id = %unlocked.key_id, "encryption unlocked");
    Ok(unlocked)
}

async fn persist(user_id: &str, derived: DerivedKey, store: &dyn KeyStore) -> UnlockedKey {
    let key = Arc::new(derived.key);
    let entry = StoredKeyEntry::new(user_id, derived.key_id.clone(), key.clone());
    let persisted = match store.store_master_key(entry).await {
        Ok(()) => true,
        Err(e) => {
            warn!(user_id, error = %e, "could not persist master key, keeping it for this session only");
            false
        }
    };
    UnlockedKey {
        key,
        key_id: derived.key_id,
        credential_id: derived.credential_id,
        persisted,
    }
}
