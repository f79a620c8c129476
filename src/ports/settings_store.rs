//! Organizer settings port.
//!
//! The host keeps per-organizer key/value settings. Keys are the host's names,
//! e.g. `payment_eupago_api_key`; see `SettingsResolver` for the fallback
//! rules layered on top.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::TenantKey;

#[derive(Debug, Clone, Error)]
pub enum SettingsError {
    #[error("Settings backend error: {0}")]
    Backend(String),
}

/// Read access to organizer settings.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Raw value of `key`, or `None` if unset.
    async fn get(&self, tenant: &TenantKey, key: &str) -> Result<Option<String>, SettingsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_store_is_object_safe() {
        fn _accepts_dyn(_store: &dyn SettingsStore) {}
    }
}
