//! Shared application state.

use aerochain_chat::{ChatRelay, ProviderConfig};
use aerochain_core::AerochainConfig;

/// Shared application state accessible from all route handlers.
///
/// Immutable after startup; handlers only read it.
pub struct AppState {
    pub relay: ChatRelay,
}

impl AppState {
    pub fn new(config: &AerochainConfig, providers: ProviderConfig) -> Self {
        Self {
            relay: ChatRelay::new(providers, config.redact_errors),
        }
    }
}
