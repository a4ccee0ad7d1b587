//! Opaque symmetric key handles.
//!
//! Key bytes never appear in `Debug` output, are not `Serialize`, and are
//! zeroized on drop. The only way to get them back out is `export_raw`, which
//! exists for key stores that persist handles across reloads.

use aes_gcm::aead::KeyInit;
use aes_gcm::Aes256Gcm;
use zeroize::Zeroizing;

use crate::error::CryptoError;
use crate::types::AES_KEY_LENGTH;

struct KeyMaterial {
    raw: Zeroizing<[u8; AES_KEY_LENGTH]>,
    cipher: Aes256Gcm,
}

impl KeyMaterial {
    fn from_raw(raw: &[u8]) -> Result<Self, CryptoError> {
        let raw: [u8; AES_KEY_LENGTH] =
            raw.try_into().map_err(|_| CryptoError::InvalidKeyLength {
                expected: AES_KEY_LENGTH,
                got: raw.len(),
            })?;
        let raw = Zeroizing::new(raw);
        let cipher = Aes256Gcm::new_from_slice(raw.as_slice())
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
        Ok(Self { raw, cipher })
    }
}

/// The per-user AES-256-GCM key derived from a passkey's PRF output.
pub struct MasterKey(KeyMaterial);

impl MasterKey {
    /// Rebuild a handle from raw bytes previously produced by `export_raw`.
    pub fn from_raw(raw: &[u8]) -> Result<Self, CryptoError> {
        KeyMaterial::from_raw(raw).map(Self)
    }

    /// Raw key bytes for durable key stores. Nothing else should call this.
    pub fn export_raw(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(self.0.raw.to_vec())
    }

    pub(crate) fn cipher(&self) -> &Aes256Gcm {
        &self.0.cipher
    }

    pub(crate) fn raw(&self) -> &[u8; AES_KEY_LENGTH] {
        &self.0.raw
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey(<redacted>)")
    }
}

/// A secondary key scoped to one unit (workspace, shared folder, ...).
///
/// Stored only in wrapped form; see `unit_key::wrap_unit_key`.
pub struct UnitKey(KeyMaterial);

impl UnitKey {
    pub(crate) fn from_raw(raw: &[u8]) -> Result<Self, CryptoError> {
        KeyMaterial::from_raw(raw).map(Self)
    }

    pub(crate) fn cipher(&self) -> &Aes256Gcm {
        &self.0.cipher
    }

    pub(crate) fn raw(&self) -> &[u8; AES_KEY_LENGTH] {
        &self.0.raw
    }
}

impl std::fmt::Debug for UnitKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("UnitKey(<redacted>)")
    }
}

/// Anything the engine can encrypt with.
pub trait EncryptionKey {
    #[doc(hidden)]
    fn aead(&self) -> &Aes256Gcm;
}

impl EncryptionKey for MasterKey {
    fn aead(&self) -> &Aes256Gcm {
        self.cipher()
    }
}

impl EncryptionKey for UnitKey {
    fn aead(&self) -> &Aes256Gcm {
        self.cipher()
    }
}
