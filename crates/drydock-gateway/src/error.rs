//! Gateway error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Core error: {0}")]
    Core(#[from] drydock_core::CoreError),

    #[error("Transport error: {0}")]
    Net(#[from] drydock_net::NetError),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            GatewayError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            GatewayError::Core(e) => match e {
                drydock_core::CoreError::NoFallback { .. } => {
                    (StatusCode::BAD_GATEWAY, "UNREACHABLE", e.to_string())
                }
                drydock_core::CoreError::Config(msg) => {
                    (StatusCode::BAD_REQUEST, "BAD_CONFIG", msg.clone())
                }
                _ => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    e.to_string(),
                ),
            },
            GatewayError::Net(e) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", e.to_string()),
        };

        let body = axum::Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
