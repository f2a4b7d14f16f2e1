//! Drydock Cache Store Layer
//!
//! This crate provides the generation-scoped cache store abstraction for
//! Drydock, supporting in-memory and local disk backends.

pub mod backend;
pub mod error;
pub mod local;
pub mod memory;
pub mod response;

pub use backend::{CacheBackend, GenerationStore, ResourceKey};
pub use error::StoreError;
pub use local::LocalBackend;
pub use memory::MemoryBackend;
pub use response::CachedResponse;
