//! Browser side of the passkey ceremony.
//!
//! The TypeScript layer runs `navigator.credentials.create/get` with the PRF
//! extension and hands the outcome here. Derivation and the verifier check
//! run in Rust, so key bytes never exist as JS values.

use crate::crypto::WasmMasterKey;
use crate::error::{gate_error_to_js, to_js_error, to_js_value};
use keygate_core::{complete_setup, complete_unlock, CeremonyOutcome, PrfSupportInfo};
use keygate_crypto::{generate_prf_params, PrfKeyParams, PrfParamRecord};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use zeroize::Zeroizing;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewPrfParams {
    prf_salt: String,
    version: u32,
}

/// True if the probed capabilities (`{webauthn, platformAuthenticator,
/// prfExtension}`) are enough to back encryption.
#[wasm_bindgen(js_name = "isPrfSupported")]
pub fn wasm_is_prf_supported(info: JsValue) -> Result<bool, JsValue> {
    let info: PrfSupportInfo = serde_wasm_bindgen::from_value(info).map_err(to_js_error)?;
    Ok(info.is_prf_supported())
}

/// Fresh salt and version for a registration ceremony.
#[wasm_bindgen(js_name = "generatePrfParams")]
pub fn wasm_generate_prf_params() -> Result<JsValue, JsValue> {
    let params = generate_prf_params().map_err(to_js_error)?;
    to_js_value(&NewPrfParams {
        prf_salt: keygate_crypto::base64url_encode(&params.prf_salt),
        version: params.version,
    })
}

fn outcome(credential_id: String, prf_output: Option<Vec<u8>>) -> CeremonyOutcome {
    CeremonyOutcome {
        credential_id,
        prf_output: prf_output.map(Zeroizing::new),
    }
}

/// Result of `completeSetup`: the key plus the record to save on the server.
#[wasm_bindgen(js_name = "SetupResult")]
pub struct WasmSetupResult {
    key: Option<WasmMasterKey>,
    record: PrfParamRecord,
}

#[wasm_bindgen(js_class = "SetupResult")]
impl WasmSetupResult {
    /// `{prf_salt, version, credential_id, verifier}` for the server.
    #[wasm_bindgen(getter)]
    pub fn record(&self) -> Result<JsValue, JsValue> {
        to_js_value(&self.record)
    }

    /// Move the key out. Returns `undefined` on the second call.
    #[wasm_bindgen(js_name = "takeKey")]
    pub fn take_key(&mut self) -> Option<WasmMasterKey> {
        self.key.take()
    }
}

/// Derive the master key from a registration ceremony.
///
/// `prf_output` is `prf.results.first`; `undefined` or empty fails with a
/// `not_supported` error.
#[wasm_bindgen(js_name = "completeSetup")]
pub fn wasm_complete_setup(
    user_id: &str,
    prf_salt: &str,
    version: u32,
    credential_id: String,
    prf_output: Option<Vec<u8>>,
) -> Result<WasmSetupResult, JsValue> {
    let prf = PrfKeyParams::from_record(&PrfParamRecord {
        prf_salt: prf_salt.to_string(),
        version,
        credential_id: credential_id.clone(),
        verifier: None,
    })
    .map_err(to_js_error)?;
    let (derived, record) = complete_setup(user_id, &prf, outcome(credential_id, prf_output))
        .map_err(gate_error_to_js)?;
    Ok(WasmSetupResult {
        key: Some(WasmMasterKey::new(derived.key, derived.key_id)),
        record,
    })
}

/// Derive and verify the master key from an authentication ceremony run
/// with the record's salt.
///
/// Throws an error named `credential_mismatch` when the passkey is not the
/// one encryption was set up with.
#[wasm_bindgen(js_name = "completeUnlock")]
pub fn wasm_complete_unlock(
    user_id: &str,
    record: JsValue,
    credential_id: String,
    prf_output: Option<Vec<u8>>,
) -> Result<WasmMasterKey, JsValue> {
    let record: PrfParamRecord = serde_wasm_bindgen::from_value(record).map_err(to_js_error)?;
    let derived = complete_unlock(user_id, &record, outcome(credential_id, prf_output))
        .map_err(gate_error_to_js)?;
    Ok(WasmMasterKey::new(derived.key, derived.key_id))
}
