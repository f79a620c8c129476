//! Application layer - Commands and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! `SettingsResolver` layers the gateway's setting fallbacks over the
//! organizer settings store.

pub mod handlers;
mod settings;

pub use handlers::*;
pub use settings::{SecretSource, SettingsResolver, WebhookSecret, ORGANIZER_SECRET_KEYS};
