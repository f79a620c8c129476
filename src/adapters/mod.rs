//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `eupago` - Outbound EuPago REST client
//! - `http` - Axum webhook, return-URL and admin endpoints
//! - `memory` - In-memory stores for tests and database-less runs
//! - `postgres` - PostgreSQL payment and settings stores

pub mod eupago;
pub mod http;
pub mod memory;
pub mod postgres;
