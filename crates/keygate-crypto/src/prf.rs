//! Passkey PRF key derivation.
//!
//! masterKey = HKDF-SHA256(ikm=prfOutput, salt=prfSalt, info="keygate:prf-master:v{version}")
//!
//! The same (prfOutput, prfSalt) pair always yields the same key, which is
//! what lets any device holding the passkey decrypt the user's data.

use sha2::{Digest, Sha256};

use crate::base64url::{base64url_decode, base64url_encode};
use crate::engine::{decrypt_from_string, encrypt_to_string};
use crate::error::CryptoError;
use crate::hkdf::hkdf_derive;
use crate::key::MasterKey;
use crate::random::generate_salt;
use crate::types::{
    PrfKeyParams, PrfParamRecord, PRF_PARAMS_VERSION, PRF_SALT_LENGTH, SUPPORTED_PRF_VERSIONS,
};

const MASTER_INFO_PREFIX: &str = "keygate:prf-master:v";
const KEY_ID_DOMAIN: &[u8] = b"keygate:key-id:v1\0";
const VERIFIER_PLAINTEXT: &str = "keygate:prf-verifier:v1";
const VERIFIER_TABLE: &str = "prf_verifier";

/// Fresh parameters for first-time setup.
pub fn generate_prf_params() -> Result<PrfKeyParams, CryptoError> {
    Ok(PrfKeyParams {
        prf_salt: generate_salt()?,
        version: PRF_PARAMS_VERSION,
    })
}

/// Decode the stored salt into the bytes handed to the PRF extension as
/// `eval.first`.
pub fn get_prf_salt_bytes(record: &PrfParamRecord) -> Result<[u8; PRF_SALT_LENGTH], CryptoError> {
    let bytes = base64url_decode(&record.prf_salt)?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::InvalidSaltLength {
            expected: PRF_SALT_LENGTH,
            got: bytes.len(),
        })
}

impl PrfKeyParams {
    /// Parse and validate a server record.
    pub fn from_record(record: &PrfParamRecord) -> Result<Self, CryptoError> {
        if !SUPPORTED_PRF_VERSIONS.contains(&record.version) {
            return Err(CryptoError::UnsupportedPrfVersion(record.version));
        }
        Ok(Self {
            prf_salt: get_prf_salt_bytes(record)?,
            version: record.version,
        })
    }

    /// Build the server record for these params.
    pub fn to_record(&self, credential_id: &str, verifier: Option<String>) -> PrfParamRecord {
        PrfParamRecord {
            prf_salt: base64url_encode(&self.prf_salt),
            version: self.version,
            credential_id: credential_id.to_string(),
            verifier,
        }
    }
}

/// Derive the non-extractable master key from a PRF output.
///
/// # Arguments
/// * `prf_output` - Raw `prf.results.first` from the authenticator
/// * `params` - Stored salt and version
pub fn derive_key_from_prf(
    prf_output: &[u8],
    params: &PrfKeyParams,
) -> Result<MasterKey, CryptoError> {
    if prf_output.is_empty() {
        return Err(CryptoError::EmptyPrfOutput);
    }
    if !SUPPORTED_PRF_VERSIONS.contains(&params.version) {
        return Err(CryptoError::UnsupportedPrfVersion(params.version));
    }
    let info = format!("{}{}", MASTER_INFO_PREFIX, params.version);
    let okm = hkdf_derive(prf_output, &params.prf_salt, info.as_bytes())?;
    MasterKey::from_raw(okm.as_slice())
}

/// Stable identifier for keys derived from `params` with `credential_id`.
///
/// Changes whenever the salt, version or credential changes, so cached keys
/// from before a rotation no longer match. Reveals nothing about the key.
pub fn key_id_for(params: &PrfKeyParams, credential_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(KEY_ID_DOMAIN);
    hasher.update(params.version.to_be_bytes());
    hasher.update(params.prf_salt);
    hasher.update(credential_id.as_bytes());
    let digest = hasher.finalize();
    base64url_encode(&digest[..16])
}

fn verifier_aad(user_id: &str) -> Result<Vec<u8>, CryptoError> {
    crate::engine::build_aad(VERIFIER_TABLE, user_id)
}

/// Encrypt the fixed probe value under `key`, bound to `user_id`.
pub fn create_verifier(key: &MasterKey, user_id: &str) -> Result<String, CryptoError> {
    encrypt_to_string(VERIFIER_PLAINTEXT, key, &verifier_aad(user_id)?)
}

/// True if `key` opens the probe written at setup.
///
/// Only a failed tag check counts as a mismatch; a malformed verifier is an
/// error in its own right.
pub fn check_verifier(key: &MasterKey, user_id: &str, verifier: &str) -> Result<bool, CryptoError> {
    match decrypt_from_string(verifier, key, &verifier_aad(user_id)?) {
        Ok(plaintext) => Ok(plaintext == VERIFIER_PLAINTEXT),
        Err(CryptoError::DecryptionFailed) => Ok(false),
        Err(e) => Err(e),
    }
}
