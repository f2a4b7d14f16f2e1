//! Application state

use drydock_core::{BroadcastHub, Controller};
use drydock_net::NetworkTransport;
use std::sync::Arc;
use url::Url;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<Controller>,
    pub transport: Arc<dyn NetworkTransport>,
    pub hub: Arc<BroadcastHub>,
    pub origin: Url,
}

impl AppState {
    pub fn new(
        controller: Arc<Controller>,
        transport: Arc<dyn NetworkTransport>,
        hub: Arc<BroadcastHub>,
        origin: Url,
    ) -> Self {
        Self {
            controller,
            transport,
            hub,
            origin,
        }
    }
}
