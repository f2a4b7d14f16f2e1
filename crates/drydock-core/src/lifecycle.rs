//! Generation lifecycle: install and activate
//!
//! Install populates the current generation's store from the manifest;
//! activate deletes every stale generation and takes control of open
//! clients. A partially populated cache is acceptable; an uninstalled
//! controller is not, so individual precache failures never abort install.

use drydock_net::NetworkTransport;
use drydock_store::{CacheBackend, GenerationStore, ResourceKey};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use crate::control::ClientHub;
use crate::error::CoreError;
use crate::manifest::Manifest;

/// Outcome of an install: which manifest entries made it into the store
#[derive(Debug, Default)]
pub struct InstallReport {
    pub stored: Vec<String>,
    pub failed: Vec<String>,
}

impl InstallReport {
    pub fn attempted(&self) -> usize {
        self.stored.len() + self.failed.len()
    }
}

/// Outcome of an activation: the stale generations that were deleted
#[derive(Debug, Default)]
pub struct ActivationReport {
    pub deleted: Vec<String>,
}

/// Drives install and activate for one generation
pub struct LifecycleManager {
    backend: Arc<dyn CacheBackend>,
    transport: Arc<dyn NetworkTransport>,
    hub: Arc<dyn ClientHub>,
    manifest: Manifest,
    origin: Url,
    precache_remote: bool,
}

impl LifecycleManager {
    pub fn new(
        backend: Arc<dyn CacheBackend>,
        transport: Arc<dyn NetworkTransport>,
        hub: Arc<dyn ClientHub>,
        manifest: Manifest,
        origin: Url,
        precache_remote: bool,
    ) -> Self {
        Self {
            backend,
            transport,
            hub,
            manifest,
            origin,
            precache_remote,
        }
    }

    pub fn generation(&self) -> &str {
        &self.manifest.generation
    }

    /// Populate the current generation's store from the manifest.
    ///
    /// Opening the store is fatal; everything after is best-effort per
    /// entry. Once population finishes the generation is marked ready so
    /// activation need not wait.
    pub async fn install(&self) -> Result<InstallReport, CoreError> {
        let store = self.backend.open(&self.manifest.generation).await?;
        let mut report = InstallReport::default();

        for entry in self.manifest.precache_targets(self.precache_remote) {
            let url = match entry.resolve(&self.origin) {
                Ok(url) => url,
                Err(e) => {
                    warn!("Skipping unresolvable manifest entry {}: {}", entry.location, e);
                    report.failed.push(entry.location.clone());
                    continue;
                }
            };

            match self.precache_one(store.as_ref(), &url).await {
                Ok(()) => report.stored.push(entry.location.clone()),
                Err(e) => {
                    warn!("Precache failed for {}: {}", entry.location, e);
                    report.failed.push(entry.location.clone());
                }
            }
        }

        info!(
            "Installed generation {}: {} stored, {} failed",
            self.manifest.generation,
            report.stored.len(),
            report.failed.len()
        );

        self.hub.mark_ready().await;
        Ok(report)
    }

    /// Fetch one manifest entry and store it under its GET identity
    async fn precache_one(
        &self,
        store: &dyn GenerationStore,
        url: &Url,
    ) -> Result<(), CoreError> {
        let response = self.transport.fetch(&http::Method::GET, url.as_str()).await?;

        if !response.is_cacheable() {
            return Err(CoreError::UncacheableStatus {
                status: response.status,
                url: url.to_string(),
            });
        }

        debug!("Precached {}", url);
        store.put(&ResourceKey::get(url.as_str()), response).await?;
        Ok(())
    }

    /// Delete every generation except the current one, then take control
    /// of open clients so the new generation serves them immediately.
    pub async fn activate(&self) -> Result<ActivationReport, CoreError> {
        let mut report = ActivationReport::default();

        for name in self.backend.list_generations().await? {
            if name != self.manifest.generation {
                debug!("Deleting stale generation {}", name);
                self.backend.delete_generation(&name).await?;
                report.deleted.push(name);
            }
        }

        info!(
            "Activated generation {} ({} stale generations deleted)",
            self.manifest.generation,
            report.deleted.len()
        );

        self.hub.take_control().await;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::BroadcastHub;
    use crate::testutil::StubTransport;
    use drydock_store::{CachedResponse, MemoryBackend};

    struct Fixture {
        backend: Arc<MemoryBackend>,
        transport: Arc<StubTransport>,
        hub: Arc<BroadcastHub>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                backend: Arc::new(MemoryBackend::new()),
                transport: Arc::new(StubTransport::new()),
                hub: Arc::new(BroadcastHub::default()),
            }
        }

        fn manager(&self, manifest: Manifest, precache_remote: bool) -> LifecycleManager {
            LifecycleManager::new(
                self.backend.clone(),
                self.transport.clone(),
                self.hub.clone(),
                manifest,
                Url::parse("https://app.example").unwrap(),
                precache_remote,
            )
        }
    }

    #[tokio::test]
    async fn test_install_populates_store() {
        let fx = Fixture::new();
        fx.transport.serve(
            "https://app.example/index.html",
            CachedResponse::new(200, "<html>"),
        );
        fx.transport.serve(
            "https://app.example/styles.css",
            CachedResponse::new(200, "body{}"),
        );

        let manager = fx.manager(Manifest::new("app-v1", ["/index.html", "/styles.css"]), false);
        let report = manager.install().await.unwrap();

        assert_eq!(report.stored.len(), 2);
        assert!(report.failed.is_empty());

        let store = fx.backend.open("app-v1").await.unwrap();
        assert!(
            store
                .lookup(&ResourceKey::get("https://app.example/index.html"))
                .await
                .unwrap()
                .is_some()
        );
        assert!(fx.hub.is_ready());
    }

    #[tokio::test]
    async fn test_install_tolerates_failing_entries() {
        let fx = Fixture::new();
        fx.transport.serve(
            "https://app.example/index.html",
            CachedResponse::new(200, "<html>"),
        );
        // The remote font host never responds successfully
        fx.transport.serve(
            "https://fonts.example/a.css",
            CachedResponse::new(503, "down"),
        );

        let manifest = Manifest::new("app-v1", ["/index.html", "https://fonts.example/a.css"]);
        let manager = fx.manager(manifest, true);
        let report = manager.install().await.unwrap();

        assert_eq!(report.stored, vec!["/index.html"]);
        assert_eq!(report.failed, vec!["https://fonts.example/a.css"]);

        let store = fx.backend.open("app-v1").await.unwrap();
        assert!(
            store
                .lookup(&ResourceKey::get("https://app.example/index.html"))
                .await
                .unwrap()
                .is_some()
        );
        assert!(
            store
                .lookup(&ResourceKey::get("https://fonts.example/a.css"))
                .await
                .unwrap()
                .is_none()
        );

        // Install still completed and signaled readiness
        assert!(fx.hub.is_ready());
    }

    #[tokio::test]
    async fn test_install_skips_remote_entries_when_disabled() {
        let fx = Fixture::new();
        fx.transport.serve(
            "https://app.example/index.html",
            CachedResponse::new(200, "<html>"),
        );

        let manifest = Manifest::new("app-v1", ["/index.html", "https://fonts.example/a.css"]);
        let manager = fx.manager(manifest, false);
        let report = manager.install().await.unwrap();

        assert_eq!(report.attempted(), 1);
        assert_eq!(fx.transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_install_survives_network_outage() {
        let fx = Fixture::new();
        fx.transport.set_offline(true);

        let manager = fx.manager(Manifest::new("app-v1", ["/index.html"]), false);
        let report = manager.install().await.unwrap();

        assert!(report.stored.is_empty());
        assert_eq!(report.failed, vec!["/index.html"]);
        assert!(fx.hub.is_ready());
    }

    #[tokio::test]
    async fn test_activate_prunes_stale_generations() {
        let fx = Fixture::new();
        fx.backend.open("app-v1").await.unwrap();
        fx.backend.open("app-v2").await.unwrap();
        fx.backend.open("app-v3").await.unwrap();

        let manager = fx.manager(Manifest::new("app-v3", Vec::<String>::new()), false);
        let report = manager.activate().await.unwrap();

        assert_eq!(report.deleted, vec!["app-v1", "app-v2"]);
        assert_eq!(
            fx.backend.list_generations().await.unwrap(),
            vec!["app-v3"]
        );
        assert!(fx.hub.has_control());
    }

    #[tokio::test]
    async fn test_activate_with_no_stale_generations() {
        let fx = Fixture::new();
        fx.backend.open("app-v1").await.unwrap();

        let manager = fx.manager(Manifest::new("app-v1", Vec::<String>::new()), false);
        let report = manager.activate().await.unwrap();

        assert!(report.deleted.is_empty());
        assert_eq!(
            fx.backend.list_generations().await.unwrap(),
            vec!["app-v1"]
        );
    }
}
