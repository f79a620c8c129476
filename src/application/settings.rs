//! SettingsResolver - Organizer settings with EuPago's fallback rules.
//!
//! Every gateway setting is stored under `payment_eupago_{name}` by the
//! current settings form and under `eupago_{name}` by older installs. The
//! webhook secret additionally falls back to generic organizer keys, then to
//! process-wide sources.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

use crate::config::GatewayConfig;
use crate::domain::foundation::TenantKey;
use crate::domain::payment::PaymentMethod;
use crate::ports::{SettingsError, SettingsStore};

/// Organizer keys consulted for the webhook secret, in order.
pub const ORGANIZER_SECRET_KEYS: [&str; 4] = [
    "payment_eupago_webhook_secret",
    "eupago_webhook_secret",
    "webhook_secret",
    "payment_webhook_secret",
];

const SETTING_PREFIXES: [&str; 2] = ["payment_eupago_", "eupago_"];

const DEBUG_TRUTHY: [&str; 4] = ["true", "1", "yes", "on"];

/// One place a webhook secret may come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretSource {
    /// Organizer setting with this exact key.
    OrganizerSetting(&'static str),
    /// Process environment variable.
    Environment(String),
    /// File whose trimmed contents are the secret.
    File(PathBuf),
}

impl fmt::Display for SecretSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretSource::OrganizerSetting(key) => write!(f, "setting:{}", key),
            SecretSource::Environment(var) => write!(f, "env:{}", var),
            SecretSource::File(path) => write!(f, "file:{}", path.display()),
        }
    }
}

/// A resolved webhook secret and where it was found.
pub struct WebhookSecret {
    value: SecretString,
    pub source: SecretSource,
}

impl WebhookSecret {
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }
}

impl fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookSecret")
            .field("value", &"[REDACTED]")
            .field("source", &self.source)
            .finish()
    }
}

/// Reads gateway settings for an organizer.
pub struct SettingsResolver {
    store: Arc<dyn SettingsStore>,
    secret_chain: Vec<SecretSource>,
    sandbox_url: String,
    live_url: String,
}

impl SettingsResolver {
    pub fn new(store: Arc<dyn SettingsStore>, config: &GatewayConfig) -> Self {
        let mut secret_chain: Vec<SecretSource> = ORGANIZER_SECRET_KEYS
            .into_iter()
            .map(SecretSource::OrganizerSetting)
            .collect();
        secret_chain.push(SecretSource::Environment(config.secret_env.clone()));
        if let Some(path) = &config.secret_file {
            secret_chain.push(SecretSource::File(path.clone()));
        }

        Self {
            store,
            secret_chain,
            sandbox_url: config.sandbox_url.clone(),
            live_url: config.live_url.clone(),
        }
    }

    /// Ordered secret sources.
    pub fn secret_chain(&self) -> &[SecretSource] {
        &self.secret_chain
    }

    /// Non-blank value of `payment_eupago_{name}`, else `eupago_{name}`.
    pub async fn setting(
        &self,
        tenant: &TenantKey,
        name: &str,
    ) -> Result<Option<String>, SettingsError> {
        for prefix in SETTING_PREFIXES {
            let key = format!("{}{}", prefix, name);
            if let Some(value) = self.non_blank(tenant, &key).await? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    pub async fn debug_mode(&self, tenant: &TenantKey) -> Result<bool, SettingsError> {
        Ok(self
            .setting(tenant, "debug_mode")
            .await?
            .map(|value| is_truthy(&value))
            .unwrap_or(false))
    }

    /// Base URL of the organizer's environment. Anything but `live` is sandbox.
    pub async fn base_url(&self, tenant: &TenantKey) -> Result<String, SettingsError> {
        let endpoint = self.setting(tenant, "endpoint").await?;
        Ok(match endpoint.as_deref() {
            Some("live") => self.live_url.clone(),
            _ => self.sandbox_url.clone(),
        })
    }

    pub async fn api_key(&self, tenant: &TenantKey) -> Result<Option<SecretString>, SettingsError> {
        Ok(self.setting(tenant, "api_key").await?.map(SecretString::new))
    }

    /// Customer-facing description of `method`, or its default.
    pub async fn method_description(
        &self,
        tenant: &TenantKey,
        method: PaymentMethod,
    ) -> Result<String, SettingsError> {
        Ok(self
            .setting(tenant, method.description_setting())
            .await?
            .unwrap_or_else(|| method.default_description().to_string()))
    }

    /// First non-empty secret along the chain. `None` disables signature
    /// checking and decryption for the organizer.
    pub async fn webhook_secret(
        &self,
        tenant: &TenantKey,
    ) -> Result<Option<WebhookSecret>, SettingsError> {
        for source in &self.secret_chain {
            let value = match source {
                SecretSource::OrganizerSetting(key) => self.non_blank(tenant, key).await?,
                SecretSource::Environment(var) => std::env::var(var)
                    .ok()
                    .filter(|v| !v.trim().is_empty()),
                SecretSource::File(path) => read_secret_file(path).await,
            };

            if let Some(value) = value {
                tracing::debug!(tenant = %tenant, source = %source, "Webhook secret resolved");
                return Ok(Some(WebhookSecret {
                    value: SecretString::new(value),
                    source: source.clone(),
                }));
            }
        }

        Ok(None)
    }

    async fn non_blank(
        &self,
        tenant: &TenantKey,
        key: &str,
    ) -> Result<Option<String>, SettingsError> {
        Ok(self
            .store
            .get(tenant, key)
            .await?
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()))
    }
}

async fn read_secret_file(path: &Path) -> Option<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => Some(contents.trim().to_string()).filter(|s| !s.is_empty()),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Secret file unreadable");
            None
        }
    }
}

fn is_truthy(value: &str) -> bool {
    DEBUG_TRUTHY
        .iter()
        .any(|truthy| value.eq_ignore_ascii_case(truthy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemorySettingsStore;
    use std::io::Write;

    fn tenant() -> TenantKey {
        TenantKey::new("festival").unwrap()
    }

    fn config(secret_env: &str) -> GatewayConfig {
        GatewayConfig {
            secret_env: secret_env.to_string(),
            ..Default::default()
        }
    }

    fn resolver(store: &InMemorySettingsStore, config: &GatewayConfig) -> SettingsResolver {
        SettingsResolver::new(Arc::new(store.clone()), config)
    }

    // ══════════════════════════════════════════════════════════════
    // Setting Lookup Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn current_key_wins_over_legacy_key() {
        let store = InMemorySettingsStore::new();
        store.set(&tenant(), "payment_eupago_api_key", "new-key").await;
        store.set(&tenant(), "eupago_api_key", "old-key").await;

        let value = resolver(&store, &config("EUPAGO_TEST_UNUSED_1"))
            .setting(&tenant(), "api_key")
            .await
            .unwrap();
        assert_eq!(value.as_deref(), Some("new-key"));
    }

    #[tokio::test]
    async fn blank_current_key_falls_back_to_legacy_key() {
        let store = InMemorySettingsStore::new();
        store.set(&tenant(), "payment_eupago_api_key", "  ").await;
        store.set(&tenant(), "eupago_api_key", "old-key").await;

        let value = resolver(&store, &config("EUPAGO_TEST_UNUSED_2"))
            .setting(&tenant(), "api_key")
            .await
            .unwrap();
        assert_eq!(value.as_deref(), Some("old-key"));
    }

    #[tokio::test]
    async fn debug_mode_accepts_common_truthy_values() {
        let store = InMemorySettingsStore::new();
        let resolver = resolver(&store, &config("EUPAGO_TEST_UNUSED_3"));

        assert!(!resolver.debug_mode(&tenant()).await.unwrap());

        for value in ["true", "1", "YES", "On"] {
            store.set(&tenant(), "payment_eupago_debug_mode", value).await;
            assert!(resolver.debug_mode(&tenant()).await.unwrap(), "{}", value);
        }

        store.set(&tenant(), "payment_eupago_debug_mode", "off").await;
        assert!(!resolver.debug_mode(&tenant()).await.unwrap());
    }

    #[tokio::test]
    async fn base_url_is_sandbox_unless_live() {
        let store = InMemorySettingsStore::new();
        let resolver = resolver(&store, &config("EUPAGO_TEST_UNUSED_4"));

        assert_eq!(resolver.base_url(&tenant()).await.unwrap(), "https://sandbox.eupago.pt");

        store.set(&tenant(), "eupago_endpoint", "live").await;
        assert_eq!(resolver.base_url(&tenant()).await.unwrap(), "https://clientes.eupago.pt");
    }

    #[tokio::test]
    async fn method_description_defaults_when_unset() {
        let store = InMemorySettingsStore::new();
        let resolver = resolver(&store, &config("EUPAGO_TEST_UNUSED_5"));

        let text = resolver
            .method_description(&tenant(), PaymentMethod::MbWay)
            .await
            .unwrap();
        assert_eq!(text, PaymentMethod::MbWay.default_description());

        store.set(&tenant(), "payment_eupago_mbway_description", "Pague com MB WAY").await;
        let text = resolver
            .method_description(&tenant(), PaymentMethod::MbWay)
            .await
            .unwrap();
        assert_eq!(text, "Pague com MB WAY");
    }

    // ══════════════════════════════════════════════════════════════
    // Secret Chain Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn secret_chain_follows_documented_order() {
        let mut config = config("EUPAGO_TEST_SECRET_ORDER");
        config.secret_file = Some(PathBuf::from("/run/secrets/eupago"));
        let store = InMemorySettingsStore::new();

        let chain = resolver(&store, &config).secret_chain().to_vec();
        assert_eq!(
            chain,
            vec![
                SecretSource::OrganizerSetting("payment_eupago_webhook_secret"),
                SecretSource::OrganizerSetting("eupago_webhook_secret"),
                SecretSource::OrganizerSetting("webhook_secret"),
                SecretSource::OrganizerSetting("payment_webhook_secret"),
                SecretSource::Environment("EUPAGO_TEST_SECRET_ORDER".to_string()),
                SecretSource::File(PathBuf::from("/run/secrets/eupago")),
            ]
        );
    }

    #[tokio::test]
    async fn generic_organizer_key_is_used_when_specific_keys_absent() {
        let store = InMemorySettingsStore::new();
        store.set(&tenant(), "payment_webhook_secret", "generic").await;

        let secret = resolver(&store, &config("EUPAGO_TEST_UNUSED_6"))
            .webhook_secret(&tenant())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(secret.expose(), "generic");
        assert_eq!(secret.source, SecretSource::OrganizerSetting("payment_webhook_secret"));
    }

    #[tokio::test]
    async fn environment_secret_is_used_after_organizer_keys() {
        let var = "EUPAGO_TEST_SECRET_FROM_ENV";
        std::env::set_var(var, "from-env");
        let store = InMemorySettingsStore::new();

        let secret = resolver(&store, &config(var)).webhook_secret(&tenant()).await;
        std::env::remove_var(var);

        let secret = secret.unwrap().unwrap();
        assert_eq!(secret.expose(), "from-env");
        assert_eq!(secret.source, SecretSource::Environment(var.to_string()));
    }

    #[tokio::test]
    async fn secret_file_is_trimmed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  file-secret  ").unwrap();

        let mut config = config("EUPAGO_TEST_UNUSED_7");
        config.secret_file = Some(file.path().to_path_buf());
        let store = InMemorySettingsStore::new();

        let secret = resolver(&store, &config)
            .webhook_secret(&tenant())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(secret.expose(), "file-secret");
    }

    #[tokio::test]
    async fn missing_everywhere_yields_none() {
        let mut config = config("EUPAGO_TEST_UNUSED_8");
        config.secret_file = Some(PathBuf::from("/nonexistent/eupago-secret"));
        let store = InMemorySettingsStore::new();

        let secret = resolver(&store, &config).webhook_secret(&tenant()).await.unwrap();
        assert!(secret.is_none());
    }

    #[test]
    fn debug_output_redacts_secret() {
        let secret = WebhookSecret {
            value: SecretString::new("hunter2".to_string()),
            source: SecretSource::OrganizerSetting("webhook_secret"),
        };
        assert!(!format!("{:?}", secret).contains("hunter2"));
    }
}
