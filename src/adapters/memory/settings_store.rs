//! In-memory organizer settings.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::TenantKey;
use crate::ports::{SettingsError, SettingsStore};

#[derive(Debug, Clone, Default)]
pub struct InMemorySettingsStore {
    values: Arc<RwLock<HashMap<(TenantKey, String), String>>>,
}

impl InMemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, tenant: &TenantKey, key: impl Into<String>, value: impl Into<String>) {
        self.values
            .write()
            .await
            .insert((tenant.clone(), key.into()), value.into());
    }

    pub async fn remove(&self, tenant: &TenantKey, key: &str) {
        self.values
            .write()
            .await
            .remove(&(tenant.clone(), key.to_string()));
    }
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn get(&self, tenant: &TenantKey, key: &str) -> Result<Option<String>, SettingsError> {
        let values = self.values.read().await;
        Ok(values.get(&(tenant.clone(), key.to_string())).cloned())
    }
}
