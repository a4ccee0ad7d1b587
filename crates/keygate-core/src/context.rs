//! The encryption context handed to feature code.
//!
//! Feature code never sees key bytes. It asks the context to encrypt or
//! decrypt on its behalf; while locked every helper returns
//! [`GateError::Locked`].

use std::sync::Arc;

use keygate_crypto::{
    context_aad, decrypt_fields, decrypt_from_string, decrypt_object, encrypt_fields,
    encrypt_object, encrypt_to_string, MasterKey, RecordContext,
};
use keygate_store::Persistence;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{GateError, Result};

#[derive(Default)]
struct ContextState {
    master_key: Option<Arc<MasterKey>>,
    is_loading: bool,
    error: Option<String>,
    persistence: Option<Persistence>,
}

/// Point-in-time view of the context, safe to hand to UI code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextSnapshot {
    pub is_unlocked: bool,
    pub is_loading: bool,
    pub error: Option<String>,
    pub persistence: Option<Persistence>,
}

#[derive(Default)]
pub struct EncryptionContext {
    state: RwLock<ContextState>,
}

impl std::fmt::Debug for EncryptionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionContext")
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

impl EncryptionContext {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Start a (re)load: drops any key and error, marks loading.
    pub fn init(&self) {
        let mut state = self.state.write();
        state.master_key = None;
        state.error = None;
        state.is_loading = true;
    }

    pub(crate) fn set_unlocked(&self, key: Arc<MasterKey>, persistence: Persistence) {
        let mut state = self.state.write();
        state.master_key = Some(key);
        state.error = None;
        state.is_loading = false;
        state.persistence = Some(persistence);
    }

    pub(crate) fn set_locked(&self, error: Option<String>) {
        let mut state = self.state.write();
        state.master_key = None;
        state.error = error;
        state.is_loading = false;
    }

    /// Drop the key and reset every field. Called on logout and unmount.
    pub fn teardown(&self) {
        *self.state.write() = ContextState::default();
        debug!("encryption context torn down");
    }

    pub fn snapshot(&self) -> ContextSnapshot {
        let state = self.state.read();
        ContextSnapshot {
            is_unlocked: state.master_key.is_some(),
            is_loading: state.is_loading,
            error: state.error.clone(),
            persistence: state.persistence,
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.state.read().master_key.is_some()
    }

    fn key(&self) -> Result<Arc<MasterKey>> {
        self.state.read().master_key.clone().ok_or(GateError::Locked)
    }

    /// Encrypt one value bound to `context`.
    pub fn encrypt(&self, plaintext: &str, context: &RecordContext) -> Result<String> {
        let key = self.key()?;
        Ok(encrypt_to_string(plaintext, &*key, &context_aad(context)?)?)
    }

    /// Decrypt one serialized payload bound to `context`.
    pub fn decrypt(&self, serialized: &str, context: &RecordContext) -> Result<String> {
        let key = self.key()?;
        Ok(decrypt_from_string(serialized, &*key, &context_aad(context)?)?)
    }

    pub fn encrypt_fields(
        &self,
        record: &Value,
        fields: &[&str],
        context: &RecordContext,
    ) -> Result<Value> {
        let key = self.key()?;
        Ok(encrypt_fields(record, fields, &*key, context)?)
    }

    pub fn decrypt_fields(
        &self,
        record: &Value,
        fields: &[&str],
        context: &RecordContext,
    ) -> Result<Value> {
        let key = self.key()?;
        Ok(decrypt_fields(record, fields, &*key, context)?)
    }

    pub fn encrypt_object<T: Serialize>(
        &self,
        record: &T,
        fields: &[&str],
        context: &RecordContext,
    ) -> Result<Value> {
        let key = self.key()?;
        Ok(encrypt_object(record, fields, &*key, context)?)
    }

    pub fn decrypt_object<T: DeserializeOwned>(
        &self,
        record: &Value,
        fields: &[&str],
        context: &RecordContext,
    ) -> Result<T> {
        let key = self.key()?;
        Ok(decrypt_object(record, fields, &*key, context)?)
    }

    /// The live key, for callers that wrap unit keys.
    pub(crate) fn master_key(&self) -> Result<Arc<MasterKey>> {
        self.key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn unlocked() -> Arc<EncryptionContext> {
        let ctx = EncryptionContext::new();
        ctx.set_unlocked(
            Arc::new(MasterKey::from_raw(&[5u8; 32]).unwrap()),
            Persistence::Durable,
        );
        ctx
    }

    #[test]
    fn locked_context_refuses_everything() {
        let ctx = EncryptionContext::new();
        let rc = RecordContext::new("notes", "n1");
        assert!(matches!(ctx.encrypt("x", &rc), Err(GateError::Locked)));
        assert!(matches!(ctx.decrypt("x", &rc), Err(GateError::Locked)));
        assert!(matches!(
            ctx.encrypt_fields(&json!({}), &["a"], &rc),
            Err(GateError::Locked)
        ));
    }

    #[test]
    fn round_trip_through_context() {
        let ctx = unlocked();
        let rc = RecordContext::new("notes", "n1");
        let sealed = ctx.encrypt("secret", &rc).unwrap();
        assert_eq!(ctx.decrypt(&sealed, &rc).unwrap(), "secret");
    }

    #[test]
    fn wrong_record_fails_closed() {
        let ctx = unlocked();
        let sealed = ctx.encrypt("secret", &RecordContext::new("notes", "n1")).unwrap();
        let err = ctx
            .decrypt(&sealed, &RecordContext::new("notes", "n2"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecryptionFailed);
    }

    #[test]
    fn fields_round_trip() {
        let ctx = unlocked();
        let rc = RecordContext::new("contacts", "c1");
        let record = json!({"id": "c1", "email": "a@b.c"});
        let sealed = ctx.encrypt_fields(&record, &["email"], &rc).unwrap();
        assert_ne!(sealed["email"], record["email"]);
        assert_eq!(sealed["id"], "c1");
        assert_eq!(ctx.decrypt_fields(&sealed, &["email"], &rc).unwrap(), record);
    }

    #[test]
    fn teardown_resets_everything() {
        let ctx = unlocked();
        assert!(ctx.is_unlocked());
        ctx.teardown();
        assert_eq!(
            ctx.snapshot(),
            ContextSnapshot {
                is_unlocked: false,
                is_loading: false,
                error: None,
                persistence: None,
            }
        );
    }

    #[test]
    fn init_marks_loading_and_drops_key() {
        let ctx = unlocked();
        ctx.init();
        let snap = ctx.snapshot();
        assert!(snap.is_loading);
        assert!(!snap.is_unlocked);
    }

    #[test]
    fn debug_does_not_print_key() {
        let dbg = format!("{:?}", unlocked());
        assert!(dbg.contains("is_unlocked: true"));
        assert!(!dbg.contains("[5"));
    }
}
