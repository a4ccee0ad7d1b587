use serde::{Deserialize, Serialize};

/// Wire format version for encrypted fields.
///
/// Version 1: AES-256-GCM, 12-byte random IV, AAD = "{table}:{record}\n".
/// Serialized as `{"iv": b64url, "ciphertext": b64url, "version": 1}`.
pub const CURRENT_VERSION: u32 = 1;

/// Supported wire format versions (for decryption).
pub const SUPPORTED_VERSIONS: &[u32] = &[1];

/// Version tag written into freshly generated PRF parameters.
pub const PRF_PARAMS_VERSION: u32 = 1;

/// PRF parameter versions this build can derive keys for.
pub const SUPPORTED_PRF_VERSIONS: &[u32] = &[1];

/// AES-GCM IV length in bytes (96 bits per NIST recommendation).
pub const AES_GCM_IV_LENGTH: usize = 12;

/// AES-GCM tag length in bytes (128 bits).
pub const AES_GCM_TAG_LENGTH: usize = 16;

/// AES key length in bytes (256 bits).
pub const AES_KEY_LENGTH: usize = 32;

/// PRF salt length in bytes.
pub const PRF_SALT_LENGTH: usize = 32;

/// Salt and version that make PRF key derivation reproducible across devices.
///
/// Persisted server-side per user (and per credential). The same salt must be
/// handed to every authentication ceremony, otherwise the authenticator
/// returns a different PRF output and the derived key silently changes.
#[derive(Clone, PartialEq, Eq)]
pub struct PrfKeyParams {
    pub prf_salt: [u8; PRF_SALT_LENGTH],
    pub version: u32,
}

impl std::fmt::Debug for PrfKeyParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrfKeyParams")
            .field("prf_salt", &crate::base64url::base64url_encode(&self.prf_salt))
            .field("version", &self.version)
            .finish()
    }
}

/// PRF parameters as stored in (and fetched from) the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrfParamRecord {
    /// Base64url salt fed to the PRF extension as `eval.first`.
    pub prf_salt: String,
    pub version: u32,
    /// WebAuthn credential the parameters belong to.
    pub credential_id: String,
    /// Serialized `EncryptedData` of a fixed probe, encrypted at setup time
    /// with the derived key. Absent on records created before probes existed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifier: Option<String>,
}

/// One encrypted value.
///
/// Never constructed from untrusted JSON without passing `is_encrypted_data`
/// first; see `engine::parse_encrypted_data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedData {
    pub iv: [u8; AES_GCM_IV_LENGTH],
    /// Ciphertext with the 16-byte GCM tag appended.
    pub ciphertext: Vec<u8>,
    pub version: u32,
}

/// JSON shape of `EncryptedData`. Field order is the canonical wire order.
#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct EncryptedDataWire {
    pub iv: String,
    pub ciphertext: String,
    pub version: u32,
}

/// Table and record a ciphertext is bound to via AAD.
/// Prevents ciphertext relocation between rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordContext {
    pub table_name: String,
    pub record_id: String,
}

impl RecordContext {
    pub fn new(table_name: impl Into<String>, record_id: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            record_id: record_id.into(),
        }
    }
}
