//! Outbound HTTP transport

use async_trait::async_trait;
use drydock_store::CachedResponse;
use reqwest::Client;
use tracing::debug;

use crate::error::NetError;

/// Transport configuration
#[derive(Debug, Clone, Default)]
pub struct TransportConfig {
    /// Skip TLS certificate verification
    pub skip_tls_verify: bool,
}

/// Network transport seam.
///
/// An `Err` means the transport itself failed (connect, DNS, the underlying
/// client's own timeout); an HTTP response of any status is `Ok`. The
/// controller imposes no timeouts of its own.
#[async_trait]
pub trait NetworkTransport: Send + Sync {
    async fn fetch(&self, method: &http::Method, url: &str) -> Result<CachedResponse, NetError>;

    /// Forward a request that carries headers and a body, for traffic the
    /// controller does not intercept. Transports that cannot carry a body
    /// may fall back to a plain fetch.
    async fn forward(
        &self,
        method: &http::Method,
        url: &str,
        headers: &[(String, String)],
        body: bytes::Bytes,
    ) -> Result<CachedResponse, NetError> {
        let _ = (headers, body);
        self.fetch(method, url).await
    }
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a new transport
    pub fn new(config: TransportConfig) -> Result<Self, NetError> {
        let mut builder = Client::builder();

        if config.skip_tls_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl NetworkTransport for HttpTransport {
    async fn fetch(&self, method: &http::Method, url: &str) -> Result<CachedResponse, NetError> {
        debug!("Fetching {} {}", method, url);

        let url = reqwest::Url::parse(url).map_err(|e| NetError::InvalidUrl(e.to_string()))?;
        let response = self.client.request(method.clone(), url).send().await?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?;

        Ok(CachedResponse {
            status,
            headers,
            body,
        })
    }

    async fn forward(
        &self,
        method: &http::Method,
        url: &str,
        headers: &[(String, String)],
        body: bytes::Bytes,
    ) -> Result<CachedResponse, NetError> {
        debug!("Forwarding {} {} ({} byte body)", method, url, body.len());

        let url = reqwest::Url::parse(url).map_err(|e| NetError::InvalidUrl(e.to_string()))?;
        let mut request = self.client.request(method.clone(), url).body(body);

        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?;

        Ok(CachedResponse {
            status,
            headers,
            body,
        })
    }
}
