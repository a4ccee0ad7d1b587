use keygate_store::KeyStore;
use tracing::{info, warn};

use crate::context::EncryptionContext;
use crate::error::Result;
use crate::transport::SessionTerminator;

/// Log out: wipe stored keys, drop the in-memory key, then end the session.
///
/// The server session is only invalidated after the wipe was attempted. If the
/// wipe fails the session is still ended and the storage error is returned.
pub async fn logout(
    store: &dyn KeyStore,
    context: &EncryptionContext,
    terminator: &dyn SessionTerminator,
) -> Result<()> {
    let cleared = store.clear_all_keys().await;
    if let Err(e) = &cleared {
        warn!(error = %e, "could not clear stored keys on logout");
    }
    context.teardown();
    terminator.sign_out().await?;
    cleared?;
    info!("logged out, keys cleared");
    Ok(())
}
