//! Control-message endpoint and client notification stream

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use drydock_core::ControlMessage;
use futures::{Stream, StreamExt};
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tracing::info;

use crate::error::GatewayError;
use crate::state::AppState;

/// POST /_drydock/control
///
/// Accepts `{"action": "purge-subset"}` or `{"action": "purge-all"}`;
/// unrecognized actions are consumed without effect.
pub async fn post_control(
    State(state): State<AppState>,
    Json(message): Json<ControlMessage>,
) -> Result<StatusCode, GatewayError> {
    info!("Control message received: {:?}", message);
    state.controller.message(message).await?;
    Ok(StatusCode::ACCEPTED)
}

/// GET /_drydock/events
///
/// Server-sent stream of purge-completion notices. Every connected client
/// receives each notice broadcast after it subscribed.
pub async fn events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(state.hub.subscribe()).filter_map(|notice| async move {
        let notice = notice.ok()?;
        Event::default().json_data(&notice).ok().map(Ok)
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
