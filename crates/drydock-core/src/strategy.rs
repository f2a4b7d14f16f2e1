//! Serving strategies and the fetch interceptor
//!
//! Exactly one strategy runs per intercepted request, and every intercepted
//! operation completes with either a response or a propagated failure. Both
//! strategies write every cacheable response they observe back into the
//! current generation's store as a detached background task; concurrent
//! writers for the same identity race and the store is last-write-wins.

use drydock_net::{NetError, NetworkTransport};
use drydock_store::{CacheBackend, CachedResponse, ResourceKey};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::policy::{InterceptedRequest, RequestMode, Route, RoutingPolicy};

/// What the interceptor decided for a request
#[derive(Debug)]
pub enum FetchDecision {
    /// Serve this response to the caller
    Respond(CachedResponse),
    /// Not handled; the host's default network handling applies
    Bypass,
}

/// Dispatches each intercepted request to its serving strategy
pub struct FetchInterceptor {
    backend: Arc<dyn CacheBackend>,
    transport: Arc<dyn NetworkTransport>,
    policy: Arc<RoutingPolicy>,
    generation: String,
    offline_key: ResourceKey,
}

impl FetchInterceptor {
    pub fn new(
        backend: Arc<dyn CacheBackend>,
        transport: Arc<dyn NetworkTransport>,
        policy: Arc<RoutingPolicy>,
        generation: impl Into<String>,
        offline_key: ResourceKey,
    ) -> Self {
        Self {
            backend,
            transport,
            policy,
            generation: generation.into(),
            offline_key,
        }
    }

    /// Handle one intercepted request
    pub async fn handle(&self, req: &InterceptedRequest) -> Result<FetchDecision, CoreError> {
        match self.policy.route(req) {
            Route::Bypass => {
                debug!("Bypassing {} {}", req.method, req.url);
                Ok(FetchDecision::Bypass)
            }
            Route::NetworkFirst => self.network_first(req).await.map(FetchDecision::Respond),
            Route::CacheFirst => self.cache_first(req).await.map(FetchDecision::Respond),
        }
    }

    /// Network first; on transport failure fall back to the store, then to
    /// the offline document for navigations.
    async fn network_first(&self, req: &InterceptedRequest) -> Result<CachedResponse, CoreError> {
        let key = req.key();

        match self.transport.fetch(&req.method, req.url.as_str()).await {
            Ok(response) => {
                self.store_in_background(&key, &response);
                Ok(response)
            }
            Err(err) => {
                debug!("Network failed for {}, consulting store: {}", key, err);

                let store = self.backend.open(&self.generation).await?;
                if let Some(cached) = store.lookup(&key).await? {
                    debug!("Serving {} from store after network failure", key);
                    return Ok(cached);
                }

                self.offline_fallback(req, err).await
            }
        }
    }

    /// Store first; only on a miss go to the network.
    async fn cache_first(&self, req: &InterceptedRequest) -> Result<CachedResponse, CoreError> {
        let key = req.key();

        let store = self.backend.open(&self.generation).await?;
        if let Some(cached) = store.lookup(&key).await? {
            debug!("Cache hit for {}", key);
            return Ok(cached);
        }

        debug!("Cache miss for {}, going to network", key);
        match self.transport.fetch(&req.method, req.url.as_str()).await {
            Ok(response) => {
                self.store_in_background(&key, &response);
                Ok(response)
            }
            Err(err) => self.offline_fallback(req, err).await,
        }
    }

    /// Serve the offline document for failed navigations; everything else
    /// propagates the failure. A synthetic success is never fabricated for
    /// content the store does not hold.
    async fn offline_fallback(
        &self,
        req: &InterceptedRequest,
        err: NetError,
    ) -> Result<CachedResponse, CoreError> {
        if req.mode == RequestMode::Navigation && self.policy.allows_fallback(req.kind) {
            let store = self.backend.open(&self.generation).await?;
            if let Some(doc) = store.lookup(&self.offline_key).await? {
                info!("Serving offline document for {}", req.url);
                return Ok(doc);
            }
        }

        Err(CoreError::NoFallback {
            url: req.url.to_string(),
            source: err,
        })
    }

    /// Write a cacheable response into the current generation without
    /// blocking the serving path. Failures are logged and never propagate.
    fn store_in_background(&self, key: &ResourceKey, response: &CachedResponse) {
        if !response.is_cacheable() {
            return;
        }

        let backend = self.backend.clone();
        let generation = self.generation.clone();
        let key = key.clone();
        let response = response.clone();

        tokio::spawn(async move {
            let result = async {
                backend.open(&generation).await?.put(&key, response).await
            }
            .await;

            if let Err(e) = result {
                warn!("Background cache write failed for {}: {}", key, e);
            }
        });
    }
}
