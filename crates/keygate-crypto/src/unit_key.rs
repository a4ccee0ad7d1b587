//! Per-unit keys wrapped by the master key.
//!
//! Each unit (workspace, shared collection, ...) gets a random 256-bit key.
//! Only the AES-KW wrapped form is ever stored: [AES-KW(masterKey, unitKey):40].
//! Losing the master key therefore loses every unit key with it.

use aes_kw::Kek;

use crate::error::CryptoError;
use crate::key::{MasterKey, UnitKey};
use crate::random::fill_random;
use crate::types::AES_KEY_LENGTH;
use zeroize::Zeroizing;

/// AES-KW output size for a 32-byte key: 32 + 8 = 40 bytes.
pub const WRAPPED_UNIT_KEY_SIZE: usize = 40;

/// Generate a random unit key.
pub fn generate_unit_key() -> Result<UnitKey, CryptoError> {
    let mut raw = Zeroizing::new([0u8; AES_KEY_LENGTH]);
    fill_random(&mut raw[..])?;
    UnitKey::from_raw(&raw[..])
}

/// Wrap a unit key under the master key with AES-KW.
pub fn wrap_unit_key(
    unit_key: &UnitKey,
    master: &MasterKey,
) -> Result<[u8; WRAPPED_UNIT_KEY_SIZE], CryptoError> {
    let kek = Kek::from(*master.raw());
    let mut wrapped = [0u8; WRAPPED_UNIT_KEY_SIZE];
    kek.wrap(unit_key.raw(), &mut wrapped)
        .map_err(|e| CryptoError::WrapFailed(format!("{:?}", e)))?;
    Ok(wrapped)
}

/// Unwrap a stored unit key. Fails with `UnwrapFailed` under the wrong master
/// key or on tampered bytes.
pub fn unwrap_unit_key(wrapped: &[u8], master: &MasterKey) -> Result<UnitKey, CryptoError> {
    if wrapped.len() != WRAPPED_UNIT_KEY_SIZE {
        return Err(CryptoError::InvalidWrappedKeyLength {
            expected: WRAPPED_UNIT_KEY_SIZE,
            got: wrapped.len(),
        });
    }
    let kek = Kek::from(*master.raw());
    let mut raw = Zeroizing::new([0u8; AES_KEY_LENGTH]);
    kek.unwrap(wrapped, &mut raw[..])
        .map_err(|_| CryptoError::UnwrapFailed)?;
    UnitKey::from_raw(&raw[..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{build_aad, decrypt, encrypt};

    fn random_master() -> MasterKey {
        let mut raw = [0u8; 32];
        getrandom::getrandom(&mut raw).unwrap();
        MasterKey::from_raw(&raw).unwrap()
    }

    #[test]
    fn unit_keys_are_unique() {
        let a = generate_unit_key().unwrap();
        let b = generate_unit_key().unwrap();
        assert_ne!(a.raw(), b.raw());
    }

    #[test]
    fn wrap_unwrap_round_trip() {
        let master = random_master();
        let unit = generate_unit_key().unwrap();
        let wrapped = wrap_unit_key(&unit, &master).unwrap();
        assert_eq!(wrapped.len(), WRAPPED_UNIT_KEY_SIZE);

        let unwrapped = unwrap_unit_key(&wrapped, &master).unwrap();
        let aad = build_aad("documents", "d1").unwrap();
        let enc = encrypt("shared", &unit, &aad).unwrap();
        assert_eq!(decrypt(&enc, &unwrapped, &aad).unwrap(), "shared");
    }

    #[test]
    fn wrong_master_fails() {
        let unit = generate_unit_key().unwrap();
        let wrapped = wrap_unit_key(&unit, &random_master()).unwrap();
        assert!(matches!(
            unwrap_unit_key(&wrapped, &random_master()).unwrap_err(),
            CryptoError::UnwrapFailed
        ));
    }

    #[test]
    fn tampered_data_fails() {
        let master = random_master();
        let unit = generate_unit_key().unwrap();
        let mut wrapped = wrap_unit_key(&unit, &master).unwrap();
        wrapped[WRAPPED_UNIT_KEY_SIZE - 1] ^= 0xff;
        assert!(unwrap_unit_key(&wrapped, &master).is_err());
    }

    #[test]
    fn wrong_length_fails() {
        let master = random_master();
        assert!(unwrap_unit_key(&[0u8; 20], &master).is_err());
        assert!(unwrap_unit_key(&[0u8; 44], &master).is_err());
    }
}
