//! Key storage for keygate.
//!
//! Holds the passkey-derived master key per user (plus wrapped unit keys) so
//! a reload does not force a new passkey ceremony, and wipes everything on
//! logout.

pub mod error;
pub mod memory;
pub mod select;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod traits;
pub mod types;

pub use error::{KeyStoreError, Result};
pub use memory::MemoryKeyStore;
pub use select::{is_storage_available, select_key_store, SelectedStore};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteKeyStore;
pub use traits::KeyStore;
pub use types::{Persistence, StoredKeyEntry, WrappedUnitKey};
