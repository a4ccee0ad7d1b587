//! WASM bindings for keygate.
//!
//! Exposes the crypto core and the Rust half of the passkey ceremony via
//! wasm-bindgen for consumption by TypeScript browser code.

pub mod ceremony;
pub mod crypto;
mod error;
