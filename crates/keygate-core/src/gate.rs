//! The encryption gate: decides whether protected content may render.
//!
//! ```text
//! Loading ──┬─> NeedsSetup
//!           ├─> NeedsUnlock ──unlock()──> Unlocked
//!           ├─> Unlocked
//!           └─> Error ──retry()──> Loading
//! ```
//!
//! The gate fails closed: children only run in `Unlocked` with a live key in
//! the context. Every other state renders a [`GateScreen`] instead.

use std::sync::Arc;

use chrono::Utc;
use keygate_crypto::{check_verifier, key_id_for, MasterKey, PrfKeyParams, PrfParamRecord};
use keygate_store::{KeyStore, Persistence, SelectedStore, StoredKeyEntry};
use tracing::{debug, warn};

use crate::ceremony::PasskeyCeremony;
use crate::config::GateConfig;
use crate::context::EncryptionContext;
use crate::error::{ErrorKind, GateError, Result};
use crate::flow::unlock_with_record;
use crate::retry::RetryBudget;
use crate::session;
use crate::transport::{ParamsSource, SessionTerminator, TransportError};

/// Why the gate is in `Error` (or why the last unlock attempt failed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&GateError> for GateFailure {
    fn from(e: &GateError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    Loading,
    NeedsSetup,
    NeedsUnlock,
    Unlocked,
    Error(GateFailure),
}

/// What to show instead of protected content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateScreen {
    Loading,
    /// Send the user to the external setup flow.
    Setup { setup_path: String },
    /// Offer the unlock prompt, with the previous attempt's error if any.
    Unlock { error: Option<GateFailure> },
    /// Offer a manual retry.
    Error(GateFailure),
}

#[derive(Debug, PartialEq, Eq)]
pub enum Gated<T> {
    Content(T),
    Screen(GateScreen),
}

pub type TransitionHook = Arc<dyn Fn(&GateState) + Send + Sync>;

pub struct GateOptions {
    pub user_id: String,
    pub params: Arc<dyn ParamsSource>,
    pub ceremony: Arc<dyn PasskeyCeremony>,
    pub store: SelectedStore,
    pub config: GateConfig,
    /// Called after every state change.
    pub on_transition: Option<TransitionHook>,
}

pub struct EncryptionGate {
    user_id: String,
    params: Arc<dyn ParamsSource>,
    ceremony: Arc<dyn PasskeyCeremony>,
    store: Arc<dyn KeyStore>,
    persistence: Persistence,
    config: GateConfig,
    on_transition: Option<TransitionHook>,
    state: GateState,
    record: Option<PrfParamRecord>,
    last_error: Option<GateFailure>,
    context: Arc<EncryptionContext>,
}

impl EncryptionGate {
    pub fn new(options: GateOptions) -> Self {
        Self {
            user_id: options.user_id,
            params: options.params,
            ceremony: options.ceremony,
            store: options.store.store,
            persistence: options.store.persistence,
            config: options.config,
            on_transition: options.on_transition,
            state: GateState::Loading,
            record: None,
            last_error: None,
            context: EncryptionContext::new(),
        }
    }

    pub fn state(&self) -> &GateState {
        &self.state
    }

    /// Shared handle for feature code. Stays valid across remounts.
    pub fn context(&self) -> Arc<EncryptionContext> {
        self.context.clone()
    }

    pub fn persistence(&self) -> Persistence {
        self.persistence
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Resolve the initial state: cached key and server parameters are looked
    /// up concurrently.
    pub async fn mount(&mut self) -> &GateState {
        self.context.init();
        self.record = None;
        self.last_error = None;
        self.transition(GateState::Loading);

        let (cached, fetched) = tokio::join!(self.load_live_entry(), self.fetch_params());
        let next = self.resolve(cached, fetched).await;
        self.transition(next);
        &self.state
    }

    /// Manual retry after an error. Starts over from `Loading`.
    pub async fn retry(&mut self) -> &GateState {
        self.mount().await
    }

    /// Run the unlock ceremony with the fetched parameters.
    ///
    /// A cancelled prompt or a mismatched passkey leaves the gate in
    /// `NeedsUnlock` so the user can try again; an unsupported platform moves
    /// it to `Error`.
    pub async fn unlock(&mut self) -> Result<()> {
        match self.state {
            GateState::Unlocked => return Ok(()),
            GateState::NeedsUnlock => {}
            GateState::NeedsSetup => return Err(GateError::NotSetUp),
            GateState::Loading | GateState::Error(_) => return Err(GateError::Locked),
        }
        let Some(record) = self.record.clone() else {
            return Err(GateError::NotSetUp);
        };

        let outcome = unlock_with_record(
            &self.user_id,
            &record,
            self.ceremony.as_ref(),
            self.store.as_ref(),
        )
        .await;

        match outcome {
            Ok(unlocked) => {
                let persistence = if unlocked.persisted {
                    self.persistence
                } else {
                    Persistence::SessionOnly
                };
                self.last_error = None;
                self.context.set_unlocked(unlocked.key, persistence);
                self.transition(GateState::Unlocked);
                Ok(())
            }
            Err(e) => {
                let failure = GateFailure::from(&e);
                if failure.kind == ErrorKind::NotSupported {
                    self.transition(GateState::Error(failure));
                } else {
                    self.last_error = Some(failure);
                    self.transition(GateState::NeedsUnlock);
                }
                Err(e)
            }
        }
    }

    /// Run `children` if unlocked, otherwise say what to show instead.
    pub fn render<T>(&self, children: impl FnOnce(&EncryptionContext) -> T) -> Gated<T> {
        if self.state == GateState::Unlocked && self.context.is_unlocked() {
            return Gated::Content(children(&self.context));
        }
        Gated::Screen(self.screen())
    }

    pub fn screen(&self) -> GateScreen {
        match &self.state {
            GateState::NeedsSetup => GateScreen::Setup {
                setup_path: self.config.setup_path.clone(),
            },
            GateState::NeedsUnlock => GateScreen::Unlock {
                error: self.last_error.clone(),
            },
            GateState::Error(failure) => GateScreen::Error(failure.clone()),
            // Unlocked without a live key only happens mid-teardown.
            GateState::Loading | GateState::Unlocked => GateScreen::Loading,
        }
    }

    /// Wipe every stored key, tear down the context, then end the session.
    pub async fn logout(&mut self, terminator: &dyn SessionTerminator) -> Result<()> {
        let result = session::logout(self.store.as_ref(), &self.context, terminator).await;
        self.record = None;
        self.last_error = None;
        self.transition(GateState::Loading);
        result
    }

    async fn load_live_entry(&self) -> Option<StoredKeyEntry> {
        let entry = match self.store.get_master_key(&self.user_id).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                warn!(user_id = %self.user_id, error = %e, "cached key unreadable, evicting");
                self.evict().await;
                return None;
            }
        };
        if let Some(window) = self.config.trust_window() {
            if entry.is_expired(window, Utc::now()) {
                warn!(user_id = %self.user_id, key_id = %entry.key_id, "cached key outside trust window, evicting");
                self.evict().await;
                return None;
            }
        }
        Some(entry)
    }

    async fn fetch_params(&self) -> std::result::Result<Option<PrfParamRecord>, TransportError> {
        let mut budget = RetryBudget::new(self.config.max_auto_retries);
        loop {
            match self.params.fetch_prf_params(&self.user_id).await {
                Ok(record) => return Ok(record),
                Err(e) if e.is_transient() && budget.try_consume() => {
                    warn!(
                        user_id = %self.user_id,
                        attempt = budget.used(),
                        error = %e,
                        "parameter fetch failed, retrying"
                    );
                    tokio::time::sleep(self.config.retry_delay()).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn resolve(
        &mut self,
        cached: Option<StoredKeyEntry>,
        fetched: std::result::Result<Option<PrfParamRecord>, TransportError>,
    ) -> GateState {
        match fetched {
            Ok(None) => {
                if cached.is_some() {
                    warn!(user_id = %self.user_id, "cached key without server parameters, evicting");
                    self.evict().await;
                }
                GateState::NeedsSetup
            }
            Ok(Some(record)) => {
                let current = match PrfKeyParams::from_record(&record) {
                    Ok(params) => key_id_for(&params, &record.credential_id),
                    Err(e) => return GateState::Error(GateFailure::from(&GateError::from(e))),
                };
                let verifier = record.verifier.clone();
                self.record = Some(record);
                match cached {
                    Some(entry) if entry.key_id == current => {
                        if !self.verifies(&entry.key, verifier.as_deref()) {
                            warn!(
                                user_id = %self.user_id,
                                key_id = %entry.key_id,
                                "cached key fails the verifier, evicting"
                            );
                            self.evict().await;
                            return GateState::NeedsUnlock;
                        }
                        self.context.set_unlocked(entry.key, self.persistence);
                        GateState::Unlocked
                    }
                    Some(entry) => {
                        warn!(
                            user_id = %self.user_id,
                            cached = %entry.key_id,
                            current = %current,
                            "cached key predates a parameter rotation, evicting"
                        );
                        self.evict().await;
                        GateState::NeedsUnlock
                    }
                    None => GateState::NeedsUnlock,
                }
            }
            Err(e) => match cached {
                Some(entry) => {
                    warn!(user_id = %self.user_id, error = %e, "parameters unreachable, trusting cached key");
                    self.context.set_unlocked(entry.key, self.persistence);
                    GateState::Unlocked
                }
                None => GateState::Error(GateFailure::from(&GateError::from(e))),
            },
        }
    }

    /// Records created before verifiers existed carry none; those keys are
    /// trusted on their `key_id` alone.
    fn verifies(&self, key: &MasterKey, verifier: Option<&str>) -> bool {
        match verifier {
            Some(verifier) => check_verifier(key, &self.user_id, verifier).unwrap_or(false),
            None => true,
        }
    }

    async fn evict(&self) {
        if let Err(e) = self.store.delete_master_key(&self.user_id).await {
            warn!(user_id = %self.user_id, error = %e, "could not evict cached key");
        }
    }

    fn transition(&mut self, next: GateState) {
        match &next {
            GateState::NeedsSetup | GateState::NeedsUnlock => self
                .context
                .set_locked(self.last_error.as_ref().map(|f| f.message.clone())),
            GateState::Error(failure) => self.context.set_locked(Some(failure.message.clone())),
            GateState::Loading | GateState::Unlocked => {}
        }
        debug!(user_id = %self.user_id, from = ?self.state, to = ?next, "gate transition");
        self.state = next;
        if let Some(hook) = &self.on_transition {
            hook(&self.state);
        }
    }
}
