//! Control channel: purge messages and client notifications
//!
//! Client contexts post control messages at any time; the channel consumes
//! each exactly once, performs the requested purge, and broadcasts a
//! completion notice to every client, controlled or not.

use async_trait::async_trait;
use drydock_store::CacheBackend;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::error::CoreError;
use crate::policy::RoutingPolicy;

/// Which portion of the cache a purge covered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurgeScope {
    Subset,
    All,
}

/// Inbound control message. Unrecognized action tags deserialize to
/// `Unknown` and are ignored without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "action")]
pub enum ControlMessage {
    #[serde(rename = "purge-subset")]
    PurgeSubset,
    #[serde(rename = "purge-all")]
    PurgeAll,
    #[serde(other)]
    Unknown,
}

/// Outbound notification broadcast after a purge completes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ControlNotice {
    CacheCleared { scope: PurgeScope },
}

/// Host seam for client-facing effects.
///
/// The host owns the set of open client contexts; the controller only
/// signals through this trait.
#[async_trait]
pub trait ClientHub: Send + Sync {
    /// Make the freshly installed generation eligible for activation
    /// without any waiting period
    async fn mark_ready(&self);

    /// Take control of already-open clients so the new generation serves
    /// them without a reload
    async fn take_control(&self);

    /// Deliver a notice to every client, including clients not yet
    /// controlled by this instance
    async fn broadcast(&self, notice: ControlNotice);
}

/// [`ClientHub`] over a tokio broadcast channel.
///
/// Subscribers receive every notice sent after they subscribe; sending with
/// no subscribers is not an error.
pub struct BroadcastHub {
    sender: broadcast::Sender<ControlNotice>,
    ready: AtomicBool,
    controlling: AtomicBool,
}

impl BroadcastHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            ready: AtomicBool::new(false),
            controlling: AtomicBool::new(false),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ControlNotice> {
        self.sender.subscribe()
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    pub fn has_control(&self) -> bool {
        self.controlling.load(Ordering::SeqCst)
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(16)
    }
}

#[async_trait]
impl ClientHub for BroadcastHub {
    async fn mark_ready(&self) {
        info!("Generation ready, skipping waiting period");
        self.ready.store(true, Ordering::SeqCst);
    }

    async fn take_control(&self) {
        info!("Taking control of open clients");
        self.controlling.store(true, Ordering::SeqCst);
    }

    async fn broadcast(&self, notice: ControlNotice) {
        debug!("Broadcasting {:?}", notice);
        let _ = self.sender.send(notice);
    }
}

/// Processes inbound control messages against the cache backend
pub struct ControlChannel {
    backend: Arc<dyn CacheBackend>,
    hub: Arc<dyn ClientHub>,
    policy: Arc<RoutingPolicy>,
    generation: String,
}

impl ControlChannel {
    pub fn new(
        backend: Arc<dyn CacheBackend>,
        hub: Arc<dyn ClientHub>,
        policy: Arc<RoutingPolicy>,
        generation: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            hub,
            policy,
            generation: generation.into(),
        }
    }

    /// Consume one control message
    pub async fn handle(&self, message: ControlMessage) -> Result<(), CoreError> {
        match message {
            ControlMessage::PurgeSubset => self.purge_subset().await,
            ControlMessage::PurgeAll => self.purge_all().await,
            ControlMessage::Unknown => {
                debug!("Ignoring unrecognized control message");
                Ok(())
            }
        }
    }

    /// Delete document pages and remote-origin entries from the current
    /// generation, keeping same-origin static assets, then notify.
    async fn purge_subset(&self) -> Result<(), CoreError> {
        let store = self.backend.open(&self.generation).await?;
        let mut purged = 0usize;

        for key in store.keys().await? {
            if self.in_purge_subset(&key.url) {
                store.delete(&key).await?;
                purged += 1;
            }
        }

        info!(
            "Purged {} entries from generation {}",
            purged, self.generation
        );
        self.hub
            .broadcast(ControlNotice::CacheCleared {
                scope: PurgeScope::Subset,
            })
            .await;
        Ok(())
    }

    /// Delete every generation's store unconditionally, then notify
    async fn purge_all(&self) -> Result<(), CoreError> {
        let generations = self.backend.list_generations().await?;
        let count = generations.len();

        for name in generations {
            self.backend.delete_generation(&name).await?;
        }

        info!("Purged all caches ({} generations)", count);
        self.hub
            .broadcast(ControlNotice::CacheCleared {
                scope: PurgeScope::All,
            })
            .await;
        Ok(())
    }

    /// The purge subset: document pages and anything cached from a remote
    /// origin. Unparseable keys are left alone.
    fn in_purge_subset(&self, raw_url: &str) -> bool {
        let Ok(url) = url::Url::parse(raw_url) else {
            return false;
        };

        if !self.policy.is_same_origin(&url) {
            return true;
        }

        let path = url.path();
        path.ends_with('/') || path.ends_with(".html") || path.ends_with(".htm")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::recv_now;
    use drydock_store::{CachedResponse, GenerationStore, MemoryBackend, ResourceKey};
    use url::Url;

    fn channel() -> (
        Arc<MemoryBackend>,
        Arc<BroadcastHub>,
        ControlChannel,
    ) {
        let backend = Arc::new(MemoryBackend::new());
        let hub = Arc::new(BroadcastHub::default());
        let policy = Arc::new(RoutingPolicy::new(
            Url::parse("https://app.example").unwrap(),
        ));
        let control = ControlChannel::new(backend.clone(), hub.clone(), policy, "app-v2");
        (backend, hub, control)
    }

    async fn seed(store: &Arc<dyn GenerationStore>, url: &str) {
        store
            .put(&ResourceKey::get(url), CachedResponse::new(200, "x"))
            .await
            .unwrap();
    }

    #[test]
    fn test_message_wire_format() {
        let msg: ControlMessage = serde_json::from_str(r#"{"action":"purge-all"}"#).unwrap();
        assert_eq!(msg, ControlMessage::PurgeAll);

        let msg: ControlMessage = serde_json::from_str(r#"{"action":"purge-subset"}"#).unwrap();
        assert_eq!(msg, ControlMessage::PurgeSubset);

        let msg: ControlMessage = serde_json::from_str(r#"{"action":"make-coffee"}"#).unwrap();
        assert_eq!(msg, ControlMessage::Unknown);
    }

    #[test]
    fn test_notice_wire_format() {
        let notice = ControlNotice::CacheCleared {
            scope: PurgeScope::All,
        };
        assert_eq!(
            serde_json::to_string(&notice).unwrap(),
            r#"{"action":"cacheCleared","scope":"all"}"#
        );
    }

    #[tokio::test]
    async fn test_purge_all_deletes_every_generation() {
        let (backend, hub, control) = channel();
        let old = backend.open("app-v1").await.unwrap();
        let new = backend.open("app-v2").await.unwrap();
        seed(&old, "https://app.example/a.html").await;
        seed(&old, "https://app.example/b.css").await;
        seed(&new, "https://app.example/a.html").await;
        seed(&new, "https://app.example/c.js").await;
        seed(&new, "https://cdn.example/d.js").await;

        let mut rx = hub.subscribe();
        control.handle(ControlMessage::PurgeAll).await.unwrap();

        assert!(backend.list_generations().await.unwrap().is_empty());
        assert_eq!(
            recv_now(&mut rx),
            ControlNotice::CacheCleared {
                scope: PurgeScope::All
            }
        );
    }

    #[tokio::test]
    async fn test_purge_all_is_idempotent() {
        let (backend, hub, control) = channel();
        backend.open("app-v1").await.unwrap();

        let mut rx = hub.subscribe();
        control.handle(ControlMessage::PurgeAll).await.unwrap();
        control.handle(ControlMessage::PurgeAll).await.unwrap();

        assert!(backend.list_generations().await.unwrap().is_empty());
        // Both rounds notified
        recv_now(&mut rx);
        recv_now(&mut rx);
    }

    #[tokio::test]
    async fn test_purge_subset_keeps_static_assets() {
        let (backend, hub, control) = channel();
        let store = backend.open("app-v2").await.unwrap();
        seed(&store, "https://app.example/index.html").await;
        seed(&store, "https://app.example/library/").await;
        seed(&store, "https://app.example/styles.css").await;
        seed(&store, "https://app.example/favicon.png").await;
        seed(&store, "https://fonts.example/inter.woff2").await;

        let mut rx = hub.subscribe();
        control.handle(ControlMessage::PurgeSubset).await.unwrap();

        let mut remaining: Vec<String> = store
            .keys()
            .await
            .unwrap()
            .into_iter()
            .map(|k| k.url)
            .collect();
        remaining.sort();
        assert_eq!(
            remaining,
            vec![
                "https://app.example/favicon.png",
                "https://app.example/styles.css",
            ]
        );
        assert_eq!(
            recv_now(&mut rx),
            ControlNotice::CacheCleared {
                scope: PurgeScope::Subset
            }
        );
    }

    #[tokio::test]
    async fn test_purge_subset_on_empty_store_still_notifies() {
        let (_backend, hub, control) = channel();

        let mut rx = hub.subscribe();
        control.handle(ControlMessage::PurgeSubset).await.unwrap();

        assert_eq!(
            recv_now(&mut rx),
            ControlNotice::CacheCleared {
                scope: PurgeScope::Subset
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_message_is_ignored() {
        let (backend, hub, control) = channel();
        let store = backend.open("app-v2").await.unwrap();
        seed(&store, "https://app.example/index.html").await;

        let mut rx = hub.subscribe();
        control.handle(ControlMessage::Unknown).await.unwrap();

        assert_eq!(store.keys().await.unwrap().len(), 1);
        assert!(rx.try_recv().is_err());
    }
}
