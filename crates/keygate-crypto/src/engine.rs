//! AES-256-GCM encryption of record fields.
//!
//! Wire format v1 (JSON string):
//! {"iv": "<b64url 12B>", "ciphertext": "<b64url ciphertext+tag>", "version": 1}
//! Every ciphertext is bound to its table and record through AAD.

use aes_gcm::aead::{Aead, Payload};
use aes_gcm::Nonce;
use serde_json::Value;

use crate::base64url::{base64url_decode, base64url_encode};
use crate::error::CryptoError;
use crate::key::EncryptionKey;
use crate::random::generate_iv;
use crate::types::{
    EncryptedData, EncryptedDataWire, RecordContext, AES_GCM_IV_LENGTH, AES_GCM_TAG_LENGTH,
    CURRENT_VERSION, SUPPORTED_VERSIONS,
};

const AAD_SEPARATOR: char = ':';
const AAD_TERMINATOR: char = '\n';

/// Build AAD (Additional Authenticated Data) for a record.
/// Format: "{tableName}:{recordId}\n"
///
/// Table names may not contain the separator or terminator, which keeps the
/// encoding injective: no two (table, record) pairs share an AAD.
pub fn build_aad(table_name: &str, record_id: &str) -> Result<Vec<u8>, CryptoError> {
    if table_name.is_empty() {
        return Err(CryptoError::InvalidAad("table name is empty".into()));
    }
    if table_name.contains(AAD_SEPARATOR) || table_name.contains(AAD_TERMINATOR) {
        return Err(CryptoError::InvalidAad(format!(
            "table name {:?} contains a reserved character",
            table_name
        )));
    }
    if record_id.contains(AAD_TERMINATOR) {
        return Err(CryptoError::InvalidAad("record id contains a newline".into()));
    }
    Ok(format!("{table_name}{AAD_SEPARATOR}{record_id}{AAD_TERMINATOR}").into_bytes())
}

/// AAD for a `RecordContext`.
pub fn context_aad(context: &RecordContext) -> Result<Vec<u8>, CryptoError> {
    build_aad(&context.table_name, &context.record_id)
}

/// Encrypt a UTF-8 string with a fresh random IV.
pub fn encrypt(
    plaintext: &str,
    key: &impl EncryptionKey,
    aad: &[u8],
) -> Result<EncryptedData, CryptoError> {
    encrypt_bytes(plaintext.as_bytes(), key, aad)
}

/// Encrypt raw bytes with a fresh random IV.
pub fn encrypt_bytes(
    data: &[u8],
    key: &impl EncryptionKey,
    aad: &[u8],
) -> Result<EncryptedData, CryptoError> {
    let iv = generate_iv()?;
    let nonce = Nonce::from_slice(&iv);
    let ciphertext = key
        .aead()
        .encrypt(nonce, Payload { msg: data, aad })
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
    Ok(EncryptedData {
        iv,
        ciphertext,
        version: CURRENT_VERSION,
    })
}

/// Decrypt to a UTF-8 string.
///
/// Fails closed: any tag mismatch (wrong key, wrong AAD, tampered bytes) or
/// non-UTF-8 output is `DecryptionFailed`, never partial plaintext.
pub fn decrypt(
    encrypted: &EncryptedData,
    key: &impl EncryptionKey,
    aad: &[u8],
) -> Result<String, CryptoError> {
    let bytes = decrypt_bytes(encrypted, key, aad)?;
    String::from_utf8(bytes).map_err(|_| CryptoError::DecryptionFailed)
}

/// Decrypt to raw bytes.
pub fn decrypt_bytes(
    encrypted: &EncryptedData,
    key: &impl EncryptionKey,
    aad: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if !SUPPORTED_VERSIONS.contains(&encrypted.version) {
        return Err(CryptoError::UnsupportedVersion(encrypted.version));
    }
    if encrypted.ciphertext.len() < AES_GCM_TAG_LENGTH {
        return Err(CryptoError::DecryptionFailed);
    }
    let nonce = Nonce::from_slice(&encrypted.iv);
    key.aead()
        .decrypt(
            nonce,
            Payload {
                msg: &encrypted.ciphertext,
                aad,
            },
        )
        .map_err(|_| CryptoError::DecryptionFailed)
}

/// Serialize to the canonical JSON wire string.
pub fn serialize_encrypted_data(encrypted: &EncryptedData) -> String {
    let wire = EncryptedDataWire {
        iv: base64url_encode(&encrypted.iv),
        ciphertext: base64url_encode(&encrypted.ciphertext),
        version: encrypted.version,
    };
    // A struct of two strings and an integer always serializes.
    serde_json::to_string(&wire).unwrap_or_default()
}

/// Structural check: a JSON object with exactly `iv` (string),
/// `ciphertext` (string) and `version` (non-negative integer).
pub fn is_encrypted_data(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    obj.len() == 3
        && obj.get("iv").is_some_and(Value::is_string)
        && obj.get("ciphertext").is_some_and(Value::is_string)
        && obj
            .get("version")
            .and_then(Value::as_u64)
            .is_some_and(|v| v <= u64::from(u32::MAX))
}

/// Same check on a raw string, for columns that may hold legacy plaintext.
pub fn is_encrypted_string(s: &str) -> bool {
    serde_json::from_str::<Value>(s).is_ok_and(|v| is_encrypted_data(&v))
}

/// Parse the JSON wire string.
///
/// Runs `is_encrypted_data` before decoding so near-misses (extra keys,
/// wrong types) are rejected up front instead of caught later.
pub fn parse_encrypted_data(s: &str) -> Result<EncryptedData, CryptoError> {
    let value: Value =
        serde_json::from_str(s).map_err(|_| CryptoError::NotEncryptedData)?;
    if !is_encrypted_data(&value) {
        return Err(CryptoError::NotEncryptedData);
    }
    let wire: EncryptedDataWire =
        serde_json::from_value(value).map_err(|e| CryptoError::SerializationError(e.to_string()))?;

    let iv_bytes = decode_field(&wire.iv)?;
    let iv: [u8; AES_GCM_IV_LENGTH] =
        iv_bytes
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidIvLength {
                expected: AES_GCM_IV_LENGTH,
                got: iv_bytes.len(),
            })?;
    let ciphertext = decode_field(&wire.ciphertext)?;

    Ok(EncryptedData {
        iv,
        ciphertext,
        version: wire.version,
    })
}

fn decode_field(encoded: &str) -> Result<Vec<u8>, CryptoError> {
    base64url_decode(encoded).map_err(|e| CryptoError::MalformedCiphertext(e.to_string()))
}

/// Encrypt a string and serialize it in one step.
pub fn encrypt_to_string(
    plaintext: &str,
    key: &impl EncryptionKey,
    aad: &[u8],
) -> Result<String, CryptoError> {
    encrypt(plaintext, key, aad).map(|e| serialize_encrypted_data(&e))
}

/// Parse and decrypt a serialized payload in one step.
pub fn decrypt_from_string(
    serialized: &str,
    key: &impl EncryptionKey,
    aad: &[u8],
) -> Result<String, CryptoError> {
    let encrypted = parse_encrypted_data(serialized)?;
    decrypt(&encrypted, key, aad)
}

/// Encrypt a nullable column. `None` stays `None`.
pub fn encrypt_optional(
    plaintext: Option<&str>,
    key: &impl EncryptionKey,
    aad: &[u8],
) -> Result<Option<String>, CryptoError> {
    plaintext
        .map(|p| encrypt_to_string(p, key, aad))
        .transpose()
}

/// Decrypt a nullable column.
///
/// With `allow_plaintext`, values that are not encrypted payloads are returned
/// as-is (rows written before encryption was enabled). Payloads that *are*
/// encrypted still fail closed.
pub fn decrypt_optional(
    stored: Option<&str>,
    key: &impl EncryptionKey,
    aad: &[u8],
    allow_plaintext: bool,
) -> Result<Option<String>, CryptoError> {
    match stored {
        None => Ok(None),
        Some(s) if allow_plaintext && !is_encrypted_string(s) => Ok(Some(s.to_string())),
        Some(s) => decrypt_from_string(s, key, aad).map(Some),
    }
}
