//! Client-side encryption primitives for keygate.
//!
//! - Base64url encoding and CSPRNG salts/IVs
//! - Passkey PRF → AES-256 master key derivation (HKDF-SHA256)
//! - AES-256-GCM field encryption bound to `{table}:{record}` AAD
//! - AES-KW wrapping of per-unit keys under the master key
//!
//! Ceremony orchestration, key persistence and the unlock gate live in
//! `keygate-store` and `keygate-core`.

pub mod base64url;
pub mod engine;
pub mod error;
pub mod fields;
pub mod hkdf;
pub mod key;
pub mod prf;
pub mod random;
pub mod types;
pub mod unit_key;

pub use base64url::{base64url_decode, base64url_encode};
pub use engine::{
    build_aad, context_aad, decrypt, decrypt_bytes, decrypt_from_string, decrypt_optional,
    encrypt, encrypt_bytes, encrypt_optional, encrypt_to_string, is_encrypted_data,
    is_encrypted_string, parse_encrypted_data, serialize_encrypted_data,
};
pub use error::CryptoError;
pub use fields::{decrypt_fields, decrypt_object, encrypt_fields, encrypt_object};
pub use key::{EncryptionKey, MasterKey, UnitKey};
pub use prf::{
    check_verifier, create_verifier, derive_key_from_prf, generate_prf_params,
    get_prf_salt_bytes, key_id_for,
};
pub use random::{generate_iv, generate_salt};
pub use types::{
    EncryptedData, PrfKeyParams, PrfParamRecord, RecordContext, CURRENT_VERSION,
    PRF_PARAMS_VERSION, SUPPORTED_VERSIONS,
};
pub use unit_key::{generate_unit_key, unwrap_unit_key, wrap_unit_key, WRAPPED_UNIT_KEY_SIZE};
