//! Signing through the `sui keytool` CLI.

use async_trait::async_trait;
use base64::Engine;
use serde_json::Value;
use std::path::PathBuf;
use vigil_core::{DurationMs, Signer, SignerError};

/// Default deadline for one keytool invocation.
pub const DEFAULT_SIGN_TIMEOUT: DurationMs = DurationMs::from_secs(10);

/// Signs with a key held in the local Sui keystore by running
/// `sui keytool sign --address <address> --data <tx_bytes> --json`.
///
/// Key material never enters this process.
pub struct KeytoolSigner {
    address: String,
    program: PathBuf,
    keystore: Option<PathBuf>,
    timeout: DurationMs,
}

impl KeytoolSigner {
    /// Sign for `address` with the `sui` binary on `PATH`.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            program: PathBuf::from("sui"),
            keystore: None,
            timeout: DEFAULT_SIGN_TIMEOUT,
        }
    }

    /// Use a specific `sui` binary.
    #[must_use]
    pub fn program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Use a keystore other than the CLI default.
    #[must_use]
    pub fn keystore(mut self, path: impl Into<PathBuf>) -> Self {
        self.keystore = Some(path.into());
        self
    }

    /// Override the per-signature deadline.
    #[must_use]
    pub fn timeout(mut self, timeout: DurationMs) -> Self {
        self.timeout = timeout;
        self
    }

    fn command(&self, tx_bytes: &str) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        if let Some(keystore) = &self.keystore {
            cmd.arg("--keystore-path").arg(keystore);
        }
        cmd.args([
            "keytool",
            "sign",
            "--address",
            self.address.as_str(),
            "--data",
            tx_bytes,
            "--json",
        ])
        .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Signer for KeytoolSigner {
    fn address(&self) -> &str {
        &self.address
    }

    async fn sign(&self, tx_bytes: &str) -> Result<String, SignerError> {
        base64::engine::general_purpose::STANDARD
            .decode(tx_bytes)
            .map_err(|e| SignerError::Failed(format!("transaction bytes are not base64: {e}")))?;

        let output = tokio::time::timeout(self.timeout.to_std(), self.command(tx_bytes).output())
            .await
            .map_err(|_| SignerError::Failed(format!("keytool timed out after {}", self.timeout)))?
            .map_err(|e| {
                SignerError::Unavailable(format!("cannot run {}: {e}", self.program.display()))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SignerError::Failed(format!(
                "keytool exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let signature = parse_keytool_output(&output.stdout)?;
        tracing::debug!(
            address = %self.address,
            scheme = signature_scheme(&signature).unwrap_or("unknown"),
            "signed transaction"
        );
        Ok(signature)
    }
}

/// Extract `suiSignature` from keytool JSON output.
pub fn parse_keytool_output(stdout: &[u8]) -> Result<String, SignerError> {
    let json: Value = serde_json::from_slice(stdout)
        .map_err(|e| SignerError::Failed(format!("keytool output is not JSON: {e}")))?;
    let signature = json
        .get("suiSignature")
        .and_then(Value::as_str)
        .ok_or_else(|| SignerError::Failed("keytool output has no suiSignature".into()))?;
    if signature_scheme(signature).is_none() {
        return Err(SignerError::Failed(
            "keytool produced an unrecognized signature".into(),
        ));
    }
    Ok(signature.to_owned())
}

/// Signature scheme named by the flag byte of a serialized signature.
pub fn signature_scheme(signature: &str) -> Option<&'static str> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(signature)
        .ok()?;
    if bytes.len() < 2 {
        return None;
    }
    match bytes[0] {
        0x00 => Some("ed25519"),
        0x01 => Some("secp256k1"),
        0x02 => Some("secp256r1"),
        0x03 => Some("multisig"),
        0x05 => Some("zklogin"),
        _ => None,
    }
}
