//! WASM bindings for keygate-crypto.
//!
//! Keys cross the boundary only as opaque handles (`MasterKey`, `UnitKey`);
//! JS never sees key bytes.

use crate::error::{to_js_error, to_js_value};
use keygate_crypto::{
    base64url_decode, base64url_encode, build_aad, decrypt_fields, decrypt_from_string,
    decrypt_optional, encrypt_fields, encrypt_to_string, generate_unit_key, is_encrypted_string,
    unwrap_unit_key, wrap_unit_key, MasterKey, RecordContext, UnitKey, CURRENT_VERSION,
    SUPPORTED_VERSIONS,
};
use serde_json::Value;
use wasm_bindgen::prelude::*;

// --- Constants ---

#[wasm_bindgen(js_name = "CURRENT_VERSION")]
pub fn current_version() -> u32 {
    CURRENT_VERSION
}

#[wasm_bindgen(js_name = "SUPPORTED_VERSIONS")]
pub fn supported_versions() -> Vec<u32> {
    SUPPORTED_VERSIONS.to_vec()
}

// --- Base64url ---

#[wasm_bindgen(js_name = "base64urlEncode")]
pub fn wasm_base64url_encode(data: &[u8]) -> String {
    base64url_encode(data)
}

#[wasm_bindgen(js_name = "base64urlDecode")]
pub fn wasm_base64url_decode(encoded: &str) -> Result<Vec<u8>, JsValue> {
    base64url_decode(encoded).map_err(to_js_error)
}

// --- Wire format ---

#[wasm_bindgen(js_name = "buildAad")]
pub fn wasm_build_aad(table_name: &str, record_id: &str) -> Result<Vec<u8>, JsValue> {
    build_aad(table_name, record_id).map_err(to_js_error)
}

#[wasm_bindgen(js_name = "isEncryptedData")]
pub fn wasm_is_encrypted_data(value: &str) -> bool {
    is_encrypted_string(value)
}

fn fields_of(fields: &[String]) -> Vec<&str> {
    fields.iter().map(String::as_str).collect()
}

fn aad_for(table_name: &str, record_id: &str) -> Result<Vec<u8>, JsValue> {
    build_aad(table_name, record_id).map_err(to_js_error)
}

// --- Master key ---

/// Opaque handle to a passkey-derived master key.
#[wasm_bindgen(js_name = "MasterKey")]
pub struct WasmMasterKey {
    inner: MasterKey,
    key_id: String,
}

impl WasmMasterKey {
    pub(crate) fn new(inner: MasterKey, key_id: String) -> Self {
        Self { inner, key_id }
    }
}

#[wasm_bindgen(js_class = "MasterKey")]
impl WasmMasterKey {
    /// Fingerprint of the parameters this key was derived from.
    #[wasm_bindgen(getter, js_name = "keyId")]
    pub fn key_id(&self) -> String {
        self.key_id.clone()
    }

    pub fn encrypt(
        &self,
        plaintext: &str,
        table_name: &str,
        record_id: &str,
    ) -> Result<String, JsValue> {
        encrypt_to_string(plaintext, &self.inner, &aad_for(table_name, record_id)?)
            .map_err(to_js_error)
    }

    pub fn decrypt(
        &self,
        serialized: &str,
        table_name: &str,
        record_id: &str,
    ) -> Result<String, JsValue> {
        decrypt_from_string(serialized, &self.inner, &aad_for(table_name, record_id)?)
            .map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = "decryptOptional")]
    pub fn decrypt_optional(
        &self,
        stored: Option<String>,
        table_name: &str,
        record_id: &str,
        allow_plaintext: bool,
    ) -> Result<Option<String>, JsValue> {
        decrypt_optional(
            stored.as_deref(),
            &self.inner,
            &aad_for(table_name, record_id)?,
            allow_plaintext,
        )
        .map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = "encryptFields")]
    pub fn encrypt_fields(
        &self,
        record: JsValue,
        fields: Vec<String>,
        table_name: &str,
        record_id: &str,
    ) -> Result<JsValue, JsValue> {
        let value: Value = serde_wasm_bindgen::from_value(record).map_err(to_js_error)?;
        let context = RecordContext::new(table_name, record_id);
        let sealed = encrypt_fields(&value, &fields_of(&fields), &self.inner, &context)
            .map_err(to_js_error)?;
        to_js_value(&sealed)
    }

    #[wasm_bindgen(js_name = "decryptFields")]
    pub fn decrypt_fields(
        &self,
        record: JsValue,
        fields: Vec<String>,
        table_name: &str,
        record_id: &str,
    ) -> Result<JsValue, JsValue> {
        let value: Value = serde_wasm_bindgen::from_value(record).map_err(to_js_error)?;
        let context = RecordContext::new(table_name, record_id);
        let opened = decrypt_fields(&value, &fields_of(&fields), &self.inner, &context)
            .map_err(to_js_error)?;
        to_js_value(&opened)
    }

    /// Export raw key bytes for a durable store. Never hand these to
    /// application code.
    #[wasm_bindgen(js_name = "exportForStorage")]
    pub fn export_for_storage(&self) -> Vec<u8> {
        self.inner.export_raw().to_vec()
    }

    /// Rebuild a handle from bytes previously returned by `exportForStorage`.
    #[wasm_bindgen(js_name = "importFromStorage")]
    pub fn import_from_storage(raw: &[u8], key_id: String) -> Result<WasmMasterKey, JsValue> {
        let inner = MasterKey::from_raw(raw).map_err(to_js_error)?;
        Ok(Self::new(inner, key_id))
    }
}

// --- Unit keys ---

/// Opaque handle to a per-unit key.
#[wasm_bindgen(js_name = "UnitKey")]
pub struct WasmUnitKey {
    inner: UnitKey,
}

#[wasm_bindgen(js_class = "UnitKey")]
impl WasmUnitKey {
    pub fn generate() -> Result<WasmUnitKey, JsValue> {
        Ok(Self {
            inner: generate_unit_key().map_err(to_js_error)?,
        })
    }

    /// AES-KW wrap under `master`. The 40-byte result is safe to store.
    pub fn wrap(&self, master: &WasmMasterKey) -> Result<Vec<u8>, JsValue> {
        wrap_unit_key(&self.inner, &master.inner)
            .map(|w| w.to_vec())
            .map_err(to_js_error)
    }

    pub fn unwrap(wrapped: &[u8], master: &WasmMasterKey) -> Result<WasmUnitKey, JsValue> {
        Ok(Self {
            inner: unwrap_unit_key(wrapped, &master.inner).map_err(to_js_error)?,
        })
    }

    pub fn encrypt(
        &self,
        plaintext: &str,
        table_name: &str,
        record_id: &str,
    ) -> Result<String, JsValue> {
        encrypt_to_string(plaintext, &self.inner, &aad_for(table_name, record_id)?)
            .map_err(to_js_error)
    }

    pub fn decrypt(
        &self,
        serialized: &str,
        table_name: &str,
        record_id: &str,
    ) -> Result<String, JsValue> {
        decrypt_from_string(serialized, &self.inner, &aad_for(table_name, record_id)?)
            .map_err(to_js_error)
    }
}
