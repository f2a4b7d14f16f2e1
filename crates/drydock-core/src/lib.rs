//! Drydock Core Controller Logic
//!
//! This crate decides, per intercepted retrieval request, whether to serve
//! from the generation-scoped cache store, the network, or the offline
//! fallback document. It owns the cache lifecycle (precache population on
//! install, stale-generation pruning on activation) and the control-message
//! protocol used to purge caches on demand.

pub mod control;
pub mod controller;
pub mod error;
pub mod lifecycle;
pub mod manifest;
pub mod policy;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testutil;

pub use control::{BroadcastHub, ClientHub, ControlChannel, ControlMessage, ControlNotice, PurgeScope};
pub use controller::Controller;
pub use error::CoreError;
pub use lifecycle::{ActivationReport, InstallReport, LifecycleManager};
pub use manifest::{EntryClass, Manifest, ManifestEntry};
pub use policy::{InterceptedRequest, RequestMode, ResourceKind, Route, RoutingPolicy, is_retrieval};
pub use strategy::{FetchDecision, FetchInterceptor};
