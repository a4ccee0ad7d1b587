//! Scripted collaborators shared by the gate scenarios.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use keygate_core::{
    CeremonyError, CeremonyOutcome, EncryptionGate, GateConfig, GateOptions, GateState,
    ParamsSource, PasskeyCeremony, PrfSupportInfo, SessionTerminator, TransportError,
};
use keygate_crypto::PrfParamRecord;
use keygate_store::{KeyStore, SelectedStore};
use parking_lot::Mutex;
use zeroize::Zeroizing;

// ============================================================================
// Authenticator
// ============================================================================

/// Authenticator whose PRF output is `salt XOR secret`. Different secrets
/// model different passkeys.
pub struct FakeAuthenticator {
    secret: u8,
    cancel_next: Mutex<usize>,
    calls: AtomicUsize,
}

impl FakeAuthenticator {
    pub fn new(secret: u8) -> Arc<Self> {
        Arc::new(Self {
            secret,
            cancel_next: Mutex::new(0),
            calls: AtomicUsize::new(0),
        })
    }

    /// The next `n` ceremonies are dismissed by the user.
    pub fn cancel_next(&self, n: usize) {
        *self.cancel_next.lock() = n;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn outcome(&self, salt: &[u8]) -> Result<CeremonyOutcome, CeremonyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut cancel = self.cancel_next.lock();
        if *cancel > 0 {
            *cancel -= 1;
            return Err(CeremonyError::Cancelled);
        }
        Ok(CeremonyOutcome {
            credential_id: format!("cred-{}", self.secret),
            prf_output: Some(Zeroizing::new(
                salt.iter().map(|b| b ^ self.secret).collect(),
            )),
        })
    }
}

#[async_trait]
impl PasskeyCeremony for FakeAuthenticator {
    fn support_info(&self) -> PrfSupportInfo {
        PrfSupportInfo {
            webauthn: true,
            platform_authenticator: true,
            prf_extension: true,
        }
    }

    async fn register(&self, _user_id: &str, prf_salt: &[u8]) -> Result<CeremonyOutcome, CeremonyError> {
        self.outcome(prf_salt)
    }

    async fn authenticate(
        &self,
        prf_salt: &[u8],
        _credential_id: Option<&str>,
    ) -> Result<CeremonyOutcome, CeremonyError> {
        self.outcome(prf_salt)
    }
}

// ============================================================================
// Server
// ============================================================================

#[derive(Default)]
pub struct ScriptedServer {
    records: Mutex<HashMap<String, PrfParamRecord>>,
    failures: Mutex<VecDeque<TransportError>>,
    fetches: AtomicUsize,
}

impl ScriptedServer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fail the next fetches with these errors, in order.
    pub fn fail_next(&self, errors: impl IntoIterator<Item = TransportError>) {
        self.failures.lock().extend(errors);
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn record(&self, user_id: &str) -> Option<PrfParamRecord> {
        self.records.lock().get(user_id).cloned()
    }

    pub fn replace(&self, user_id: &str, record: PrfParamRecord) {
        self.records.lock().insert(user_id.to_string(), record);
    }
}

#[async_trait]
impl ParamsSource for ScriptedServer {
    async fn fetch_prf_params(&self, user_id: &str) -> Result<Option<PrfParamRecord>, TransportError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.failures.lock().pop_front() {
            return Err(err);
        }
        Ok(self.record(user_id))
    }

    async fn save_prf_params(&self, user_id: &str, record: &PrfParamRecord) -> Result<(), TransportError> {
        self.replace(user_id, record.clone());
        Ok(())
    }
}

// ============================================================================
// Session
// ============================================================================

/// Notes how many master keys were still cached when sign-out ran.
pub struct RecordingSession {
    store: Arc<dyn KeyStore>,
    user_id: String,
    pub key_present_at_sign_out: Mutex<Option<bool>>,
}

impl RecordingSession {
    pub fn new(store: Arc<dyn KeyStore>, user_id: &str) -> Self {
        Self {
            store,
            user_id: user_id.to_string(),
            key_present_at_sign_out: Mutex::new(None),
        }
    }
}

#[async_trait]
impl SessionTerminator for RecordingSession {
    async fn sign_out(&self) -> Result<(), TransportError> {
        let present = self
            .store
            .get_master_key(&self.user_id)
            .await
            .map(|entry| entry.is_some())
            .unwrap_or(true);
        *self.key_present_at_sign_out.lock() = Some(present);
        Ok(())
    }
}

// ============================================================================
// Gate harness
// ============================================================================

pub const USER: &str = "alice";

pub fn test_config() -> GateConfig {
    GateConfig {
        retry_delay_ms: 1,
        ..GateConfig::default()
    }
}

pub struct Harness {
    pub gate: EncryptionGate,
    pub transitions: Arc<Mutex<Vec<GateState>>>,
}

pub fn harness(
    server: Arc<ScriptedServer>,
    auth: Arc<FakeAuthenticator>,
    store: SelectedStore,
) -> Harness {
    let transitions = Arc::new(Mutex::new(Vec::new()));
    let sink = transitions.clone();
    let gate = EncryptionGate::new(GateOptions {
        user_id: USER.to_string(),
        params: server,
        ceremony: auth,
        store,
        config: test_config(),
        on_transition: Some(Arc::new(move |state: &GateState| sink.lock().push(state.clone()))),
    });
    Harness { gate, transitions }
}

impl Harness {
    pub fn transitions(&self) -> Vec<GateState> {
        self.transitions.lock().clone()
    }
}
