//! Field-level encryption of records.
//!
//! Only whitelisted fields are encrypted. Everything else (ids, timestamps,
//! foreign keys, sort order) stays plaintext so the server can still order,
//! filter and join rows. All fields of one record share the record's AAD.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::engine::{context_aad, decrypt_from_string, encrypt_to_string, is_encrypted_string};
use crate::error::CryptoError;
use crate::key::EncryptionKey;
use crate::types::RecordContext;

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn as_object(record: &Value) -> Result<&Map<String, Value>, CryptoError> {
    record
        .as_object()
        .ok_or_else(|| CryptoError::NotAnObject(json_kind(record)))
}

/// Encrypt the whitelisted `fields` of a JSON object.
///
/// Missing and `null` fields are left as they are. Whitelisted fields holding
/// anything other than a string are rejected.
pub fn encrypt_fields(
    record: &Value,
    fields: &[&str],
    key: &impl EncryptionKey,
    context: &RecordContext,
) -> Result<Value, CryptoError> {
    let mut out = as_object(record)?.clone();
    let aad = context_aad(context)?;

    for field in fields {
        let Some(value) = out.get_mut(*field) else {
            continue;
        };
        match value {
            Value::Null => {}
            Value::String(plaintext) => {
                let encrypted = encrypt_to_string(plaintext, key, &aad)?;
                *value = Value::String(encrypted);
            }
            _ => return Err(CryptoError::FieldNotText((*field).to_string())),
        }
    }

    Ok(Value::Object(out))
}

/// Decrypt the whitelisted `fields` of a JSON object.
///
/// A whitelisted string that is not an encrypted payload fails with
/// `NotEncryptedData`; a payload that does not authenticate fails with
/// `DecryptionFailed`. No field is ever returned half-decrypted.
pub fn decrypt_fields(
    record: &Value,
    fields: &[&str],
    key: &impl EncryptionKey,
    context: &RecordContext,
) -> Result<Value, CryptoError> {
    let mut out = as_object(record)?.clone();
    let aad = context_aad(context)?;

    for field in fields {
        let Some(value) = out.get_mut(*field) else {
            continue;
        };
        match value {
            Value::Null => {}
            Value::String(stored) if is_encrypted_string(stored) => {
                let plaintext = decrypt_from_string(stored, key, &aad)?;
                *value = Value::String(plaintext);
            }
            _ => return Err(CryptoError::NotEncryptedData),
        }
    }

    Ok(Value::Object(out))
}

/// Serialize `entity` to JSON and encrypt its whitelisted fields.
pub fn encrypt_object<T: Serialize>(
    entity: &T,
    fields: &[&str],
    key: &impl EncryptionKey,
    context: &RecordContext,
) -> Result<Value, CryptoError> {
    let value =
        serde_json::to_value(entity).map_err(|e| CryptoError::SerializationError(e.to_string()))?;
    encrypt_fields(&value, fields, key, context)
}

/// Decrypt the whitelisted fields of a stored row and deserialize it.
pub fn decrypt_object<T: DeserializeOwned>(
    row: &Value,
    fields: &[&str],
    key: &impl EncryptionKey,
    context: &RecordContext,
) -> Result<T, CryptoError> {
    let value = decrypt_fields(row, fields, key, context)?;
    serde_json::from_value(value).map_err(|e| CryptoError::SerializationError(e.to_string()))
}
