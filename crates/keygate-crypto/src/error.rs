use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid key length: expected {expected} bytes, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    #[error("Invalid PRF salt length: expected {expected} bytes, got {got}")]
    InvalidSaltLength { expected: usize, got: usize },

    #[error("Invalid IV length: expected {expected} bytes, got {got}")]
    InvalidIvLength { expected: usize, got: usize },

    #[error("Invalid wrapped key length: expected {expected} bytes, got {got}")]
    InvalidWrappedKeyLength { expected: usize, got: usize },

    #[error("PRF output is empty")]
    EmptyPrfOutput,

    #[error("Unsupported encryption version: {0}")]
    UnsupportedVersion(u32),

    #[error("Unsupported PRF parameter version: {0}")]
    UnsupportedPrfVersion(u32),

    #[error("Invalid AAD component: {0}")]
    InvalidAad(String),

    #[error("Not an encrypted payload")]
    NotEncryptedData,

    #[error("Expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("Field \"{0}\" must be a string or null to be encrypted")]
    FieldNotText(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Wrong key, wrong AAD, or tampered ciphertext. Never says which.
    #[error("Decryption failed")]
    DecryptionFailed,

    #[error("Key derivation failed: {0}")]
    DerivationFailed(String),

    #[error("AES-KW wrap failed: {0}")]
    WrapFailed(String),

    #[error("AES-KW unwrap failed")]
    UnwrapFailed,

    #[error("Malformed ciphertext payload: {0}")]
    MalformedCiphertext(String),

    #[error("Base64 decode error: {0}")]
    Base64Decode(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Random number generation failed: {0}")]
    RngFailed(String),
}

impl CryptoError {
    /// True for authentication-tag failures and for payloads whose shape was
    /// corrupted in storage (unknown version, bad IV length, undecodable
    /// fields). All of them are reported to users as "could not decrypt".
    pub fn is_decryption_failure(&self) -> bool {
        matches!(
            self,
            CryptoError::DecryptionFailed
                | CryptoError::UnwrapFailed
                | CryptoError::UnsupportedVersion(_)
                | CryptoError::InvalidIvLength { .. }
                | CryptoError::MalformedCiphertext(_)
        )
    }
}
