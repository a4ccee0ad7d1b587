//! Passkey-backed unlock orchestration for keygate.
//!
//! - `ceremony` / `transport`: contracts for the WebAuthn adapter and the
//!   server that holds PRF parameters
//! - `flow`: first-time setup and unlock
//! - `gate`: the fail-closed state machine in front of protected content
//! - `context`: the handle feature code encrypts and decrypts through
//! - `session`: logout ordering (wipe keys, then end the session)

pub mod ceremony;
pub mod config;
pub mod context;
pub mod error;
pub mod flow;
pub mod gate;
pub mod retry;
pub mod session;
pub mod transport;
pub mod units;

pub use ceremony::{
    is_prf_supported, prf_output_from, prf_support_info, CeremonyError, CeremonyOutcome,
    PasskeyCeremony, PrfSupportInfo,
};
pub use config::GateConfig;
pub use context::{ContextSnapshot, EncryptionContext};
pub use error::{ErrorKind, GateError, Result};
pub use flow::{
    complete_setup, complete_unlock, initialize_prf_encryption, unlock_prf_encryption,
    unlock_with_record, DerivedKey, UnlockedKey,
};
pub use gate::{
    EncryptionGate, GateFailure, GateOptions, GateScreen, GateState, Gated, TransitionHook,
};
pub use retry::RetryBudget;
pub use session::logout;
pub use transport::{ParamsSource, SessionTerminator, TransportError, TransportErrorKind};
pub use units::{create_unit_key, load_unit_key};
