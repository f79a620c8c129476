//! EuPago gateway adapter.

mod client;
mod wire;

pub use client::{
    EuPagoClient, EuPagoClientConfig, ACCESS_DENIED, AUTHENTICATION_FAILED, COMMUNICATION_FAILED,
};
