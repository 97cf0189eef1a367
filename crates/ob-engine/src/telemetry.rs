//! Tracing subscriber setup.
//!
//! The filter comes from `RUST_LOG`, defaulting to `info`. Pipelines never
//! log key material or recipient plaintexts, so either output format is safe
//! to ship.

use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Install the global subscriber. Fails if one is already installed.
pub fn init_tracing(json: bool) -> Result<(), EngineError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let result = if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };
    result.map_err(|e| EngineError::Telemetry(e.to_string()))
}
