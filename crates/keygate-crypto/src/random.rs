//! CSPRNG-backed salts and IVs.

use crate::error::CryptoError;
use crate::types::{AES_GCM_IV_LENGTH, PRF_SALT_LENGTH};

/// Fill `buf` from the OS CSPRNG.
pub fn fill_random(buf: &mut [u8]) -> Result<(), CryptoError> {
    getrandom::getrandom(buf).map_err(|e| CryptoError::RngFailed(e.to_string()))
}

/// Generate a random 32-byte PRF salt.
pub fn generate_salt() -> Result<[u8; PRF_SALT_LENGTH], CryptoError> {
    let mut salt = [0u8; PRF_SALT_LENGTH];
    fill_random(&mut salt)?;
    Ok(salt)
}

/// Generate a random 12-byte IV for AES-GCM.
///
/// Always random: an IV reused under the same key breaks GCM, and no counter
/// survives browser restarts.
pub fn generate_iv() -> Result<[u8; AES_GCM_IV_LENGTH], CryptoError> {
    let mut iv = [0u8; AES_GCM_IV_LENGTH];
    fill_random(&mut iv)?;
    Ok(iv)
}
