//! EuPago Webhooks - Payment notification ingestion and reconciliation
//!
//! This crate receives EuPago gateway notifications (legacy query-string and
//! structured JSON, optionally AES-encrypted and HMAC-signed), locates the
//! local payment they refer to and applies the reported outcome exactly once.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
