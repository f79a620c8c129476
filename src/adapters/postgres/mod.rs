//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresPaymentRepository` - Payment rows with row-locked guarded writes
//! - `PostgresSettingsStore` - Organizer settings table

mod payment_repository;
mod settings_store;

pub use payment_repository::PostgresPaymentRepository;
pub use settings_store::PostgresSettingsStore;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::DatabaseConfig;

/// Embedded schema migrations.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Opens a pool per `config`, running migrations when enabled.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .idle_timeout(config.idle_timeout())
        .max_lifetime(config.max_lifetime())
        .connect(&config.url)
        .await?;

    if config.run_migrations {
        tracing::info!("Running database migrations");
        MIGRATOR.run(&pool).await?;
    }

    Ok(pool)
}
