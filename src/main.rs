use std::sync::Arc;

use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use eupago_webhooks::adapters::eupago::{EuPagoClient, EuPagoClientConfig};
use eupago_webhooks::adapters::http::{app, EuPagoAppState};
use eupago_webhooks::adapters::memory::{
    InMemoryPaymentRepository, InMemorySettingsStore, LoggingFulfillment,
};
use eupago_webhooks::adapters::postgres::{self, PostgresPaymentRepository, PostgresSettingsStore};
use eupago_webhooks::application::SettingsResolver;
use eupago_webhooks::config::AppConfig;
use eupago_webhooks::ports::{PaymentRepository, SettingsStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config);
    info!(
        environment = ?config.server.environment,
        "Starting EuPago webhook service"
    );

    let (payment_repository, settings_store): (Arc<dyn PaymentRepository>, Arc<dyn SettingsStore>) =
        match &config.database {
            Some(database) => {
                let pool = postgres::connect(database).await?;
                info!("PostgreSQL pool ready");
                (
                    Arc::new(PostgresPaymentRepository::new(pool.clone())),
                    Arc::new(PostgresSettingsStore::new(pool)),
                )
            }
            None => {
                info!("No database configured, using in-memory storage");
                (
                    Arc::new(InMemoryPaymentRepository::new()),
                    Arc::new(InMemorySettingsStore::new()),
                )
            }
        };

    let gateway = EuPagoClient::new(
        EuPagoClientConfig::default().with_timeout(config.gateway.request_timeout()),
    )?;

    let state = EuPagoAppState {
        payment_repository,
        settings: Arc::new(SettingsResolver::new(settings_store, &config.gateway)),
        fulfillment: Arc::new(LoggingFulfillment),
        gateway: Arc::new(gateway),
        scan_limit: config.gateway.fallback_scan_limit,
        reconcile_attempts: config.gateway.reconcile_attempts,
        public_url: config.server.public_base_url(),
        admin_token: config.server.admin_token.clone(),
    };

    let router = app(state, config.server.request_timeout());

    let addr = config.server.socket_addr()?;
    info!(%addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    if config.server.json_logs() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}
