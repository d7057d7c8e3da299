//! Tracing subscriber setup for the binary.

use crate::error::VigilError;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `log_level` when set. With `json` every line is a
/// JSON object.
pub fn init_tracing(log_level: &str, json: bool) -> Result<(), VigilError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let installed = if json {
        tracing_subscriber::fmt()
            .with_target(false)
            .with_env_filter(filter)
            .json()
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_target(false)
            .with_env_filter(filter)
            .compact()
            .try_init()
    };
    installed.map_err(|e| VigilError::Config(format!("cannot install log subscriber: {e}")))
}
