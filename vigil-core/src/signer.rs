//! The Signer interface: opaque transaction signing keyed by an address.

use crate::error::SignerError;
use async_trait::async_trait;

/// Signs serialized transactions for one address.
///
/// Key material never crosses this boundary: a keystore, an HSM, or an
/// external CLI all look the same to callers.
#[async_trait]
pub trait Signer: Send + Sync {
    /// The address this signer signs for.
    fn address(&self) -> &str;

    /// Sign base64-encoded transaction bytes. Returns the serialized
    /// signature in the encoding the ledger expects.
    async fn sign(&self, tx_bytes: &str) -> Result<String, SignerError>;
}
