//! Core error types

use drydock_net::NetError;
use drydock_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Cache store error: {0}")]
    Store(#[from] StoreError),

    #[error("Network failure: {0}")]
    Network(#[from] NetError),

    #[error("Uncacheable status {status} for {url}")]
    UncacheableStatus { status: u16, url: String },

    #[error("No fallback available for {url}")]
    NoFallback {
        url: String,
        #[source]
        source: NetError,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}
