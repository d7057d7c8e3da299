//! StaticSigner: signs by echoing the payload.

use crate::error::SignerError;
use crate::signer::Signer;
use async_trait::async_trait;

/// A signer whose signature is `sig:<address>:<tx_bytes>`.
pub struct StaticSigner {
    address: String,
}

impl StaticSigner {
    /// Create a signer for `address`.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

#[async_trait]
impl Signer for StaticSigner {
    fn address(&self) -> &str {
        &self.address
    }

    async fn sign(&self, tx_bytes: &str) -> Result<String, SignerError> {
        Ok(format!("sig:{}:{tx_bytes}", self.address))
    }
}
