use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyStoreError {
    #[error("Key storage unavailable: {0}")]
    Unavailable(String),

    #[error("Stored key for user {user_id} is corrupt: {reason}")]
    Corrupt { user_id: String, reason: String },

    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Crypto error: {0}")]
    Crypto(#[from] keygate_crypto::CryptoError),
}

pub type Result<T> = std::result::Result<T, KeyStoreError>;
