//! EuPago gateway configuration
//!
//! Process-wide defaults. Per-organizer values (API key, webhook secret,
//! sandbox or live endpoint, debug mode) come from the settings store.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use super::error::ValidationError;

pub const SANDBOX_URL: &str = "https://sandbox.eupago.pt";
pub const LIVE_URL: &str = "https://clientes.eupago.pt";

/// Gateway configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Outbound request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// How many recent payments the fallback lookup scans
    #[serde(default = "default_scan_limit")]
    pub fallback_scan_limit: usize,

    /// Guarded-write attempts before reconciliation gives up
    #[serde(default = "default_reconcile_attempts")]
    pub reconcile_attempts: u32,

    /// Environment variable holding the process-wide webhook secret
    #[serde(default = "default_secret_env")]
    pub secret_env: String,

    /// File holding the process-wide webhook secret
    pub secret_file: Option<PathBuf>,

    /// Sandbox API base URL
    #[serde(default = "default_sandbox_url")]
    pub sandbox_url: String,

    /// Live API base URL
    #[serde(default = "default_live_url")]
    pub live_url: String,
}

impl GatewayConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate gateway configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.request_timeout_secs == 0 || self.request_timeout_secs > 300 {
            return Err(ValidationError::InvalidGatewayTimeout);
        }
        if self.fallback_scan_limit == 0 || self.fallback_scan_limit > 1000 {
            return Err(ValidationError::InvalidScanLimit);
        }
        if self.reconcile_attempts == 0 || self.reconcile_attempts > 10 {
            return Err(ValidationError::InvalidReconcileAttempts);
        }
        if self.secret_env.is_empty() {
            return Err(ValidationError::MissingRequired("EUPAGO__GATEWAY__SECRET_ENV"));
        }
        for url in [&self.sandbox_url, &self.live_url] {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(ValidationError::InvalidGatewayUrl(url.clone()));
            }
        }
        Ok(())
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
            fallback_scan_limit: default_scan_limit(),
            reconcile_attempts: default_reconcile_attempts(),
            secret_env: default_secret_env(),
            secret_file: None,
            sandbox_url: default_sandbox_url(),
            live_url: default_live_url(),
        }
    }
}

fn default_request_timeout() -> u64 {
    30
}

fn default_scan_limit() -> usize {
    50
}

fn default_reconcile_attempts() -> u32 {
    3
}

fn default_secret_env() -> String {
    "EUPAGO_WEBHOOK_SECRET".to_string()
}

fn default_sandbox_url() -> String {
    SANDBOX_URL.to_string()
}

fn default_live_url() -> String {
    LIVE_URL.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.fallback_scan_limit, 50);
        assert_eq!(config.secret_env, "EUPAGO_WEBHOOK_SECRET");
        assert_eq!(config.sandbox_url, "https://sandbox.eupago.pt");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_scan_limit_is_rejected() {
        let config = GatewayConfig {
            fallback_scan_limit: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ValidationError::InvalidScanLimit)));
    }

    #[test]
    fn test_non_http_base_url_is_rejected() {
        let config = GatewayConfig {
            live_url: "ftp://clientes.eupago.pt".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ValidationError::InvalidGatewayUrl(_))));
    }
}
