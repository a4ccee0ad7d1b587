//! Passkey ceremony adapter contract.
//!
//! The WebAuthn transport itself (browser `navigator.credentials`, a native
//! platform authenticator, a test double) lives outside this crate. It must
//! request the PRF extension with the salt it is handed and return the first
//! PRF result, if the authenticator produced one.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::error::GateError;

/// What the current platform can do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrfSupportInfo {
    /// WebAuthn is exposed at all.
    pub webauthn: bool,
    /// A user-verifying platform authenticator is present.
    pub platform_authenticator: bool,
    /// The PRF extension is understood by the client.
    pub prf_extension: bool,
}

impl PrfSupportInfo {
    pub fn is_prf_supported(&self) -> bool {
        self.webauthn && self.prf_extension
    }

    fn describe_missing(&self) -> &'static str {
        if !self.webauthn {
            "WebAuthn is unavailable"
        } else {
            "the passkey provider does not support the PRF extension"
        }
    }
}

/// Result of a registration or authentication ceremony.
pub struct CeremonyOutcome {
    pub credential_id: String,
    /// `prf.results.first`, absent when the authenticator ignored the
    /// extension.
    pub prf_output: Option<Zeroizing<Vec<u8>>>,
}

impl std::fmt::Debug for CeremonyOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CeremonyOutcome")
            .field("credential_id", &self.credential_id)
            .field("prf_output", &self.prf_output.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CeremonyError {
    /// The user dismissed the prompt or it timed out.
    #[error("ceremony cancelled")]
    Cancelled,

    #[error("not supported: {0}")]
    NotSupported(String),

    #[error("{0}")]
    Failed(String),
}

#[async_trait]
pub trait PasskeyCeremony: Send + Sync {
    fn support_info(&self) -> PrfSupportInfo;

    /// Create a new passkey for `user_id`, evaluating PRF with `prf_salt`.
    async fn register(
        &self,
        user_id: &str,
        prf_salt: &[u8],
    ) -> std::result::Result<CeremonyOutcome, CeremonyError>;

    /// Assert an existing passkey, evaluating PRF with `prf_salt`.
    ///
    /// `credential_id` restricts the prompt to one credential when known.
    async fn authenticate(
        &self,
        prf_salt: &[u8],
        credential_id: Option<&str>,
    ) -> std::result::Result<CeremonyOutcome, CeremonyError>;
}

pub fn prf_support_info(ceremony: &dyn PasskeyCeremony) -> PrfSupportInfo {
    ceremony.support_info()
}

pub fn is_prf_supported(ceremony: &dyn PasskeyCeremony) -> bool {
    ceremony.support_info().is_prf_supported()
}

pub(crate) fn ensure_prf_supported(ceremony: &dyn PasskeyCeremony) -> Result<(), GateError> {
    let info = ceremony.support_info();
    if info.is_prf_supported() {
        Ok(())
    } else {
        Err(GateError::NotSupported(info.describe_missing().to_string()))
    }
}

/// Split an outcome into its credential id and a usable PRF output.
///
/// A missing or empty PRF result means the authenticator cannot back
/// encryption; it is never turned into key material.
pub fn prf_output_from(
    outcome: CeremonyOutcome,
) -> Result<(String, Zeroizing<Vec<u8>>), GateError> {
    match outcome.prf_output {
        Some(output) if !output.is_empty() => Ok((outcome.credential_id, output)),
        _ => Err(GateError::NotSupported(
            "the authenticator returned no PRF result".to_string(),
        )),
    }
}
