//! Server-side collaborators: PRF parameter storage and session teardown.
//!
//! Both are implemented by the embedding application (HTTP, hosted table
//! client, ...). The gate only relies on the contracts below.

use async_trait::async_trait;
use keygate_crypto::PrfParamRecord;

/// Classification of server errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Network blips, timeouts, 5xx. Eligible for the gate's single auto-retry.
    Transient,
    /// Validation failures, 4xx other than auth.
    Permanent,
    /// Session expired or rejected.
    Auth,
}

/// Error from a server collaborator.
#[derive(Debug, Clone)]
pub struct TransportError {
    pub message: String,
    pub kind: TransportErrorKind,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: TransportErrorKind::Transient,
        }
    }

    pub fn with_kind(message: impl Into<String>, kind: TransportErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind == TransportErrorKind::Transient
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for TransportError {}

/// Where PRF parameters live.
#[async_trait]
pub trait ParamsSource: Send + Sync {
    /// The user's current parameter record, or `None` if encryption was never
    /// set up.
    async fn fetch_prf_params(
        &self,
        user_id: &str,
    ) -> std::result::Result<Option<PrfParamRecord>, TransportError>;

    /// Persist the record created during first-time setup.
    async fn save_prf_params(
        &self,
        user_id: &str,
        record: &PrfParamRecord,
    ) -> std::result::Result<(), TransportError>;
}

/// Invalidates the server session. Called by `logout` strictly after every
/// cached key has been wiped.
#[async_trait]
pub trait SessionTerminator: Send + Sync {
    async fn sign_out(&self) -> std::result::Result<(), TransportError>;
}
