//! Drydock HTTP Gateway
//!
//! This crate provides the Axum-based HTTP surface for Drydock: the
//! intercepted-resource route, the control-message endpoint, and the
//! client notification event stream.

pub mod error;
pub mod routes;
pub mod state;

pub use error::GatewayError;
pub use routes::create_router;
pub use state::AppState;
