//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (ids, timestamps, errors)
//! - `payment` - Payment lifecycle, status vocabulary and reconciliation rules
//! - `webhook` - Inbound notification parsing, signatures and decryption

pub mod foundation;
pub mod payment;
pub mod webhook;
