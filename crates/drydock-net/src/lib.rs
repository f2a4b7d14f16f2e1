//! Drydock Network Transport
//!
//! This crate provides the outbound HTTP client used to reach the
//! application origin and remote asset hosts. The controller treats any
//! transport-level failure as a single failure outcome; HTTP error statuses
//! are delivered as ordinary responses.

pub mod client;
pub mod error;

pub use client::{HttpTransport, NetworkTransport, TransportConfig};
pub use error::NetError;
