//! Request classification and routing policy
//!
//! Every intercepted request is partitioned by scheme, navigation mode, and
//! origin into exactly one route: bypass, network-first, or cache-first.
//! The policy is explicit configuration injected at construction, not
//! ambient state, so multiple policies can coexist in one process.

use drydock_store::ResourceKey;
use serde::{Deserialize, Serialize};
use url::Url;

/// Whether a request loads a full document or a subresource of one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    Navigation,
    Subresource,
}

/// The resource class a request targets, as reported by the host's
/// interception hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Document,
    Script,
    Style,
    Image,
    Font,
    Media,
    Other,
}

impl ResourceKind {
    /// Map a fetch-destination token (the `Sec-Fetch-Dest` vocabulary) to a
    /// resource kind
    pub fn from_destination(dest: &str) -> Self {
        match dest {
            "document" | "iframe" | "frame" => ResourceKind::Document,
            "script" | "worker" | "sharedworker" => ResourceKind::Script,
            "style" => ResourceKind::Style,
            "image" => ResourceKind::Image,
            "font" => ResourceKind::Font,
            "audio" | "video" | "track" => ResourceKind::Media,
            _ => ResourceKind::Other,
        }
    }
}

/// A single intercepted request. Transient; never persisted.
#[derive(Debug, Clone)]
pub struct InterceptedRequest {
    pub method: http::Method,
    pub url: Url,
    pub mode: RequestMode,
    pub kind: ResourceKind,
}

impl InterceptedRequest {
    pub fn new(method: http::Method, url: Url, mode: RequestMode, kind: ResourceKind) -> Self {
        Self {
            method,
            url,
            mode,
            kind,
        }
    }

    /// A GET navigation toward a document
    pub fn navigation(url: Url) -> Self {
        Self::new(
            http::Method::GET,
            url,
            RequestMode::Navigation,
            ResourceKind::Document,
        )
    }

    /// A GET subresource request of the given kind
    pub fn subresource(url: Url, kind: ResourceKind) -> Self {
        Self::new(http::Method::GET, url, RequestMode::Subresource, kind)
    }

    /// The store identity of this request
    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(&self.method, self.url.as_str())
    }
}

/// The serving strategy chosen for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Not intercepted; deferred to default network handling
    Bypass,
    /// Network first, cache fallback, offline document for navigations
    NetworkFirst,
    /// Cache first, network on miss
    CacheFirst,
}

/// Routing policy: the application origin, the trusted static-asset host
/// allowlist, the schemes never intercepted, and the resource kinds exempt
/// from offline-document substitution.
#[derive(Debug, Clone)]
pub struct RoutingPolicy {
    pub origin: Url,
    pub static_hosts: Vec<String>,
    pub bypass_schemes: Vec<String>,
    pub fallback_exempt: Vec<ResourceKind>,
}

impl RoutingPolicy {
    /// Policy with default scheme exclusions and the media exemption
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            static_hosts: Vec::new(),
            bypass_schemes: vec![
                "data".to_string(),
                "blob".to_string(),
                "chrome-extension".to_string(),
                "moz-extension".to_string(),
            ],
            fallback_exempt: vec![ResourceKind::Media],
        }
    }

    pub fn with_static_hosts(mut self, hosts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.static_hosts = hosts.into_iter().map(Into::into).collect();
        self
    }

    /// Choose the serving strategy for a request
    pub fn route(&self, req: &InterceptedRequest) -> Route {
        if !is_retrieval(&req.method) {
            return Route::Bypass;
        }

        if self
            .bypass_schemes
            .iter()
            .any(|s| s == req.url.scheme())
        {
            return Route::Bypass;
        }

        if req.mode == RequestMode::Navigation {
            return Route::NetworkFirst;
        }

        if self.is_trusted_static(&req.url) {
            return Route::CacheFirst;
        }

        Route::NetworkFirst
    }

    /// Whether a URL targets the application's own origin
    pub fn is_same_origin(&self, url: &Url) -> bool {
        url.origin() == self.origin.origin()
    }

    /// Whether a URL targets the origin or an allowlisted static-asset host
    pub fn is_trusted_static(&self, url: &Url) -> bool {
        if self.is_same_origin(url) {
            return true;
        }
        url.host_str()
            .map(|host| self.static_hosts.iter().any(|h| h == host))
            .unwrap_or(false)
    }

    /// Whether the offline document may be substituted for this kind
    pub fn allows_fallback(&self, kind: ResourceKind) -> bool {
        !self.fallback_exempt.contains(&kind)
    }
}

/// Only non-mutating retrieval methods are ever intercepted or stored
pub fn is_retrieval(method: &http::Method) -> bool {
    *method == http::Method::GET || *method == http::Method::HEAD
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RoutingPolicy {
        RoutingPolicy::new(Url::parse("https://app.example").unwrap())
            .with_static_hosts(["fonts.example", "cdn.example"])
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_mutating_methods_bypass() {
        let p = policy();
        let req = InterceptedRequest::new(
            http::Method::POST,
            url("https://app.example/api/save"),
            RequestMode::Subresource,
            ResourceKind::Other,
        );
        assert_eq!(p.route(&req), Route::Bypass);
    }

    #[test]
    fn test_non_network_schemes_bypass() {
        let p = policy();
        let req = InterceptedRequest::subresource(
            url("data:text/plain,hello"),
            ResourceKind::Other,
        );
        assert_eq!(p.route(&req), Route::Bypass);

        let req = InterceptedRequest::subresource(
            url("chrome-extension://abcdef/script.js"),
            ResourceKind::Script,
        );
        assert_eq!(p.route(&req), Route::Bypass);
    }

    #[test]
    fn test_navigations_are_network_first() {
        let p = policy();
        let req = InterceptedRequest::navigation(url("https://app.example/anime.html"));
        assert_eq!(p.route(&req), Route::NetworkFirst);

        // Even on an allowlisted host, a navigation stays network-first
        let req = InterceptedRequest::navigation(url("https://cdn.example/page.html"));
        assert_eq!(p.route(&req), Route::NetworkFirst);
    }

    #[test]
    fn test_same_origin_subresources_are_cache_first() {
        let p = policy();
        let req = InterceptedRequest::subresource(
            url("https://app.example/styles.css"),
            ResourceKind::Style,
        );
        assert_eq!(p.route(&req), Route::CacheFirst);
    }

    #[test]
    fn test_allowlisted_hosts_are_cache_first() {
        let p = policy();
        let req = InterceptedRequest::subresource(
            url("https://fonts.example/inter.woff2"),
            ResourceKind::Font,
        );
        assert_eq!(p.route(&req), Route::CacheFirst);
    }

    #[test]
    fn test_external_hosts_are_network_first() {
        let p = policy();
        let req = InterceptedRequest::subresource(
            url("https://images.thirdparty.example/cover.jpg"),
            ResourceKind::Image,
        );
        assert_eq!(p.route(&req), Route::NetworkFirst);
    }

    #[test]
    fn test_media_is_fallback_exempt_by_default() {
        let p = policy();
        assert!(p.allows_fallback(ResourceKind::Document));
        assert!(p.allows_fallback(ResourceKind::Image));
        assert!(!p.allows_fallback(ResourceKind::Media));
    }

    #[test]
    fn test_destination_mapping() {
        assert_eq!(
            ResourceKind::from_destination("document"),
            ResourceKind::Document
        );
        assert_eq!(ResourceKind::from_destination("video"), ResourceKind::Media);
        assert_eq!(ResourceKind::from_destination("empty"), ResourceKind::Other);
    }

    #[test]
    fn test_same_origin_requires_scheme_and_port_match() {
        let p = policy();
        assert!(p.is_same_origin(&url("https://app.example/x")));
        assert!(!p.is_same_origin(&url("http://app.example/x")));
        assert!(!p.is_same_origin(&url("https://app.example:8443/x")));
    }
}
