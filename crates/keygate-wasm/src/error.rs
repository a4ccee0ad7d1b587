//! Error conversion for the WASM boundary.

use keygate_core::GateError;
use serde::Serialize;
use wasm_bindgen::JsValue;

/// Convert any error with Display into a JsValue error.
pub fn to_js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Convert a gate error into a JS `Error` whose `name` is the error kind
/// (`"credential_mismatch"`, `"cancelled"`, ...), so callers can branch
/// without parsing messages.
pub fn gate_error_to_js(e: GateError) -> JsValue {
    let err = js_sys::Error::new(&e.to_string());
    let kind = serde_json::to_value(e.kind())
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| "permanent".to_string());
    err.set_name(&kind);
    err.into()
}

/// Serialize a Rust value to a JS value, using plain objects instead of Maps.
///
/// `serde_wasm_bindgen::to_value` serializes maps as JS `Map` by default,
/// which breaks property access on the JS side (`record.email` is
/// `undefined` on a Map).
pub fn to_js_value(value: &impl Serialize) -> Result<JsValue, JsValue> {
    let serializer = serde_wasm_bindgen::Serializer::new().serialize_maps_as_objects(true);
    value.serialize(&serializer).map_err(to_js_error)
}
