//! PostgreSQL implementation of SettingsStore.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::TenantKey;
use crate::ports::{SettingsError, SettingsStore};

pub struct PostgresSettingsStore {
    pool: PgPool,
}

impl PostgresSettingsStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsStore for PostgresSettingsStore {
    async fn get(&self, tenant: &TenantKey, key: &str) -> Result<Option<String>, SettingsError> {
        sqlx::query_scalar::<_, String>(
            "SELECT value FROM organizer_settings WHERE tenant = $1 AND key = $2",
        )
        .bind(tenant.as_str())
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| SettingsError::Backend(format!("Failed to read setting {}: {}", key, e)))
    }
}
