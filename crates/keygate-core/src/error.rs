use keygate_crypto::CryptoError;
use keygate_store::KeyStoreError;
use thiserror::Error;

use crate::ceremony::CeremonyError;
use crate::transport::TransportError;

/// Coarse classification the gate uses to pick a screen and decide on retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotSupported,
    CredentialMismatch,
    DecryptionFailed,
    StorageUnavailable,
    Transient,
    Cancelled,
    Permanent,
}

#[derive(Debug, Error)]
pub enum GateError {
    #[error("Passkey PRF is not supported: {0}")]
    NotSupported(String),

    #[error("This passkey is not the one encryption was set up with")]
    CredentialMismatch,

    #[error("Passkey ceremony was cancelled")]
    Cancelled,

    #[error("Passkey ceremony failed: {0}")]
    CeremonyFailed(String),

    #[error("Encryption is not set up for this account")]
    NotSetUp,

    #[error("Encryption is already set up for this account")]
    AlreadySetUp,

    #[error("Encryption is locked")]
    Locked,

    #[error("Server request failed: {0}")]
    Transport(#[from] TransportError),

    #[error("Key storage error: {0}")]
    Storage(#[from] KeyStoreError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

impl From<CeremonyError> for GateError {
    fn from(e: CeremonyError) -> Self {
        match e {
            CeremonyError::Cancelled => GateError::Cancelled,
            CeremonyError::NotSupported(msg) => GateError::NotSupported(msg),
            CeremonyError::Failed(msg) => GateError::CeremonyFailed(msg),
        }
    }
}

impl GateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GateError::NotSupported(_) => ErrorKind::NotSupported,
            GateError::CredentialMismatch => ErrorKind::CredentialMismatch,
            GateError::Cancelled => ErrorKind::Cancelled,
            GateError::Transport(e) if e.is_transient() => ErrorKind::Transient,
            GateError::Storage(_) => ErrorKind::StorageUnavailable,
            GateError::Crypto(CryptoError::EmptyPrfOutput) => ErrorKind::NotSupported,
            GateError::Crypto(e) if e.is_decryption_failure() => ErrorKind::DecryptionFailed,
            GateError::CeremonyFailed(_)
            | GateError::NotSetUp
            | GateError::AlreadySetUp
            | GateError::Locked
            | GateError::Transport(_)
            | GateError::Crypto(_) => ErrorKind::Permanent,
        }
    }

    /// Only transient server failures are worth retrying automatically.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

pub type Result<T> = std::result::Result<T, GateError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportErrorKind;

    #[test]
    fn transport_errors_split_on_kind() {
        let transient = GateError::from(TransportError::new("timeout"));
        assert_eq!(transient.kind(), ErrorKind::Transient);
        assert!(transient.is_retryable());

        let permanent =
            GateError::from(TransportError::with_kind("400", TransportErrorKind::Permanent));
        assert_eq!(permanent.kind(), ErrorKind::Permanent);
        assert!(!permanent.is_retryable());

        let auth = GateError::from(TransportError::with_kind("401", TransportErrorKind::Auth));
        assert_eq!(auth.kind(), ErrorKind::Permanent);
    }

    #[test]
    fn ceremony_errors_map() {
        assert_eq!(
            GateError::from(CeremonyError::Cancelled).kind(),
            ErrorKind::Cancelled
        );
        assert_eq!(
            GateError::from(CeremonyError::NotSupported("no prf".into())).kind(),
            ErrorKind::NotSupported
        );
        assert_eq!(
            GateError::from(CeremonyError::Failed("boom".into())).kind(),
            ErrorKind::Permanent
        );
    }

    #[test]
    fn crypto_errors_map() {
        assert_eq!(
            GateError::from(CryptoError::DecryptionFailed).kind(),
            ErrorKind::DecryptionFailed
        );
        assert_eq!(
            GateError::from(CryptoError::EmptyPrfOutput).kind(),
            ErrorKind::NotSupported
        );
        assert_eq!(
            GateError::from(CryptoError::InvalidAad("a:b".into())).kind(),
            ErrorKind::Permanent
        );
    }

    #[test]
    fn corrupted_payload_errors_are_decryption_failures() {
        for err in [
            CryptoError::UnsupportedVersion(9),
            CryptoError::InvalidIvLength { expected: 12, got: 8 },
            CryptoError::MalformedCiphertext("bad char".into()),
            CryptoError::UnwrapFailed,
        ] {
            assert_eq!(GateError::from(err).kind(), ErrorKind::DecryptionFailed);
        }
    }

    #[test]
    fn storage_errors_are_storage_unavailable() {
        let err = GateError::from(KeyStoreError::Unavailable("quota".into()));
        assert_eq!(err.kind(), ErrorKind::StorageUnavailable);
        assert!(!err.is_retryable());
    }
}
