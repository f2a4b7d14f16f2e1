//! Gateway routes

mod control;
mod health;
mod serve;

use axum::Router;
use axum::routing::{any, get, post};

use crate::state::AppState;

/// Create the main router.
///
/// Reserved endpoints live under `/_drydock/` so they can never shadow an
/// application resource path; everything else flows through the
/// interception handler.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/_drydock/healthz", get(health::healthz))
        .route("/_drydock/control", post(control::post_control))
        .route("/_drydock/events", get(control::events))
        .route("/", any(serve::serve_resource))
        .route("/{*path}", any(serve::serve_resource))
        .with_state(state)
}
