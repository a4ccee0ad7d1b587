#![cfg(target_arch = "wasm32")]

use keygate_wasm::ceremony::{wasm_complete_setup, wasm_complete_unlock};
use keygate_wasm::crypto::WasmUnitKey;
use wasm_bindgen_test::*;

const SALT: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

#[wasm_bindgen_test]
fn setup_then_unlock_round_trip() {
    let mut setup =
        wasm_complete_setup("alice", SALT, 1, "cred-1".into(), Some(vec![7u8; 32])).unwrap();
    let key = setup.take_key().unwrap();
    assert!(setup.take_key().is_none());

    let sealed = key.encrypt("hello", "notes", "n1").unwrap();
    let unlocked =
        wasm_complete_unlock("alice", setup.record().unwrap(), "cred-1".into(), Some(vec![7u8; 32]))
            .unwrap();
    assert_eq!(unlocked.key_id(), key.key_id());
    assert_eq!(unlocked.decrypt(&sealed, "notes", "n1").unwrap(), "hello");
}

#[wasm_bindgen_test]
fn other_passkey_throws_credential_mismatch() {
    let setup =
        wasm_complete_setup("alice", SALT, 1, "cred-1".into(), Some(vec![7u8; 32])).unwrap();
    let err =
        wasm_complete_unlock("alice", setup.record().unwrap(), "cred-1".into(), Some(vec![8u8; 32]))
            .err()
            .unwrap();
    let err: js_sys::Error = err.into();
    assert_eq!(String::from(err.name()), "credential_mismatch");
}

#[wasm_bindgen_test]
fn missing_prf_output_is_not_supported() {
    let err = wasm_complete_setup("alice", SALT, 1, "cred-1".into(), None)
        .err()
        .unwrap();
    let err: js_sys::Error = err.into();
    assert_eq!(String::from(err.name()), "not_supported");
}

#[wasm_bindgen_test]
fn unit_key_wraps_under_master() {
    let mut setup =
        wasm_complete_setup("alice", SALT, 1, "cred-1".into(), Some(vec![7u8; 32])).unwrap();
    let master = setup.take_key().unwrap();
    let unit = WasmUnitKey::generate().unwrap();
    let wrapped = unit.wrap(&master).unwrap();
    assert_eq!(wrapped.len(), 40);

    let restored = WasmUnitKey::unwrap(&wrapped, &master).unwrap();
    let sealed = unit.encrypt("doc", "docs", "d1").unwrap();
    assert_eq!(restored.decrypt(&sealed, "docs", "d1").unwrap(), "doc");
}
