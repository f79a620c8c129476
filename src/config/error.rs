//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid bind address: {0}")]
    InvalidBindAddress(String),

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("Gateway timeout must be between 1 and 300 seconds")]
    InvalidGatewayTimeout,

    #[error("Gateway timeout ({gateway}s) must be shorter than the request timeout ({request}s)")]
    GatewayTimeoutExceedsRequestTimeout { gateway: u64, request: u64 },

    #[error("Fallback scan limit must be between 1 and 1000")]
    InvalidScanLimit,

    #[error("Reconcile attempts must be between 1 and 10")]
    InvalidReconcileAttempts,

    #[error("Gateway URL must be http(s): {0}")]
    InvalidGatewayUrl(String),
}
