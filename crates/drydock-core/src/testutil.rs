//! Shared test fixtures

use async_trait::async_trait;
use drydock_net::{NetError, NetworkTransport};
use drydock_store::CachedResponse;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::broadcast;

use crate::control::ControlNotice;

/// Scriptable transport: serves canned responses per URL, can be taken
/// offline, and records every fetch it receives.
#[derive(Default)]
pub struct StubTransport {
    routes: Mutex<HashMap<String, CachedResponse>>,
    offline: Mutex<bool>,
    calls: Mutex<Vec<String>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, url: &str, response: CachedResponse) {
        self.routes.lock().insert(url.to_string(), response);
    }

    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock() = offline;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.calls.lock().iter().filter(|c| *c == url).count()
    }
}

#[async_trait]
impl NetworkTransport for StubTransport {
    async fn fetch(&self, _method: &http::Method, url: &str) -> Result<CachedResponse, NetError> {
        self.calls.lock().push(url.to_string());

        if *self.offline.lock() {
            return Err(NetError::Unreachable(url.to_string()));
        }

        match self.routes.lock().get(url) {
            Some(response) => Ok(response.clone()),
            None => Ok(CachedResponse::new(404, "not found")),
        }
    }
}

/// Pop an already-delivered notice off a hub subscription
pub fn recv_now(rx: &mut broadcast::Receiver<ControlNotice>) -> ControlNotice {
    rx.try_recv().expect("expected a broadcast notice")
}

/// Poll until a condition holds, for asserting on detached background work
pub async fn poll_until<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if condition().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("condition not reached within poll window");
}
