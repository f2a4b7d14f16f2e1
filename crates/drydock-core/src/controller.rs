//! Controller facade: one entry point per host event
//!
//! The host invokes exactly one method per intercepted operation and awaits
//! its result. Calls for different requests interleave freely at await
//! points; the generation-scoped store is the only shared mutable state.

use drydock_net::NetworkTransport;
use drydock_store::{CacheBackend, ResourceKey};
use std::sync::Arc;

use crate::control::{ClientHub, ControlChannel, ControlMessage};
use crate::error::CoreError;
use crate::lifecycle::{ActivationReport, InstallReport, LifecycleManager};
use crate::manifest::Manifest;
use crate::policy::{InterceptedRequest, RoutingPolicy};
use crate::strategy::{FetchDecision, FetchInterceptor};

/// The assembled cache controller
pub struct Controller {
    lifecycle: LifecycleManager,
    interceptor: FetchInterceptor,
    control: ControlChannel,
    generation: String,
}

impl Controller {
    /// Assemble a controller for one generation.
    ///
    /// `offline_path` is the origin-relative location of the document served
    /// to navigations when both network and store come up empty.
    pub fn new(
        backend: Arc<dyn CacheBackend>,
        transport: Arc<dyn NetworkTransport>,
        hub: Arc<dyn ClientHub>,
        manifest: Manifest,
        policy: RoutingPolicy,
        precache_remote: bool,
        offline_path: &str,
    ) -> Result<Self, CoreError> {
        let generation = manifest.generation.clone();
        let policy = Arc::new(policy);

        let offline_url = policy
            .origin
            .join(offline_path)
            .map_err(|e| CoreError::Config(format!("offline path {}: {}", offline_path, e)))?;
        let offline_key = ResourceKey::get(offline_url.as_str());

        let lifecycle = LifecycleManager::new(
            backend.clone(),
            transport.clone(),
            hub.clone(),
            manifest,
            policy.origin.clone(),
            precache_remote,
        );
        let interceptor = FetchInterceptor::new(
            backend.clone(),
            transport,
            policy.clone(),
            generation.clone(),
            offline_key,
        );
        let control = ControlChannel::new(backend, hub, policy, generation.clone());

        Ok(Self {
            lifecycle,
            interceptor,
            control,
            generation,
        })
    }

    pub fn generation(&self) -> &str {
        &self.generation
    }

    /// Install hook: populate the current generation
    pub async fn install(&self) -> Result<InstallReport, CoreError> {
        self.lifecycle.install().await
    }

    /// Activate hook: prune stale generations and take control of clients
    pub async fn activate(&self) -> Result<ActivationReport, CoreError> {
        self.lifecycle.activate().await
    }

    /// Fetch hook: decide how one intercepted request is served
    pub async fn fetch(&self, req: &InterceptedRequest) -> Result<FetchDecision, CoreError> {
        self.interceptor.handle(req).await
    }

    /// Message hook: consume one control message
    pub async fn message(&self, msg: ControlMessage) -> Result<(), CoreError> {
        self.control.handle(msg).await
    }
}
