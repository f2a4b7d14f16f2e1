//! Resource interception route
//!
//! Every request that is not a reserved gateway endpoint lands here. The
//! path is resolved against the application origin, classified from the
//! fetch-metadata headers the client sends, and dispatched through the
//! controller; traffic the controller declines is forwarded uncached.

use axum::body::{Body, to_bytes};
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use drydock_core::{FetchDecision, InterceptedRequest, RequestMode, ResourceKind, is_retrieval};
use drydock_store::CachedResponse;
use tracing::debug;
use url::Url;

use crate::error::GatewayError;
use crate::state::AppState;

/// Cap on buffered pass-through request bodies
const MAX_FORWARD_BODY: usize = 32 * 1024 * 1024;

pub async fn serve_resource(
    State(state): State<AppState>,
    req: Request,
) -> Result<Response, GatewayError> {
    let (parts, body) = req.into_parts();
    let target = resolve_target(&state.origin, &parts.uri)?;

    if !is_retrieval(&parts.method) {
        // Mutating traffic is never intercepted or stored
        debug!("Forwarding {} {} uncached", parts.method, target);
        let body = to_bytes(body, MAX_FORWARD_BODY)
            .await
            .map_err(|e| GatewayError::BadRequest(e.to_string()))?;
        let headers = forwardable_headers(&parts.headers);
        let response = state
            .transport
            .forward(&parts.method, target.as_str(), &headers, body)
            .await?;
        return Ok(to_response(response));
    }

    let mode = request_mode(&parts.headers);
    let kind = resource_kind(&parts.headers, mode);
    let intercepted = InterceptedRequest::new(parts.method, target, mode, kind);

    match state.controller.fetch(&intercepted).await? {
        FetchDecision::Respond(response) => Ok(to_response(response)),
        FetchDecision::Bypass => {
            let response = state
                .transport
                .fetch(&intercepted.method, intercepted.url.as_str())
                .await?;
            Ok(to_response(response))
        }
    }
}

/// Resolve the incoming path and query against the application origin
fn resolve_target(origin: &Url, uri: &Uri) -> Result<Url, GatewayError> {
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    origin
        .join(path_and_query)
        .map_err(|e| GatewayError::BadRequest(format!("{}: {}", path_and_query, e)))
}

/// Navigation detection from the fetch-metadata the client sends
fn request_mode(headers: &HeaderMap) -> RequestMode {
    match headers.get("sec-fetch-mode").and_then(|v| v.to_str().ok()) {
        Some("navigate") => RequestMode::Navigation,
        _ => RequestMode::Subresource,
    }
}

/// Resource kind from `Sec-Fetch-Dest`, defaulting by mode when absent
fn resource_kind(headers: &HeaderMap, mode: RequestMode) -> ResourceKind {
    match headers.get("sec-fetch-dest").and_then(|v| v.to_str().ok()) {
        Some(dest) => ResourceKind::from_destination(dest),
        None if mode == RequestMode::Navigation => ResourceKind::Document,
        None => ResourceKind::Other,
    }
}

/// Headers safe to replay toward the origin
fn forwardable_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter(|(name, _)| {
            let name = name.as_str();
            name != "host" && !is_hop_by_hop(name)
        })
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

fn is_hop_by_hop(name: &str) -> bool {
    matches!(
        name,
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailer"
            | "transfer-encoding"
            | "upgrade"
            | "content-length"
    )
}

/// Materialize a stored response as an HTTP response
fn to_response(cached: CachedResponse) -> Response {
    let status = StatusCode::from_u16(cached.status).unwrap_or(StatusCode::BAD_GATEWAY);

    let mut builder = Response::builder().status(status);
    for (name, value) in &cached.headers {
        if is_hop_by_hop(name) {
            continue;
        }
        builder = builder.header(name.as_str(), value.as_str());
    }

    builder
        .body(Body::from(cached.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_resolve_target_keeps_query() {
        let origin = Url::parse("https://app.example").unwrap();
        let uri: Uri = "/search.html?q=naruto".parse().unwrap();

        let target = resolve_target(&origin, &uri).unwrap();
        assert_eq!(target.as_str(), "https://app.example/search.html?q=naruto");
    }

    #[test]
    fn test_request_classification_from_fetch_metadata() {
        let mut headers = HeaderMap::new();
        headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
        headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));

        let mode = request_mode(&headers);
        assert_eq!(mode, RequestMode::Navigation);
        assert_eq!(resource_kind(&headers, mode), ResourceKind::Document);

        let headers = HeaderMap::new();
        let mode = request_mode(&headers);
        assert_eq!(mode, RequestMode::Subresource);
        assert_eq!(resource_kind(&headers, mode), ResourceKind::Other);
    }

    #[test]
    fn test_to_response_strips_hop_by_hop_headers() {
        let cached = CachedResponse {
            status: 200,
            headers: vec![
                ("content-type".to_string(), "text/html".to_string()),
                ("transfer-encoding".to_string(), "chunked".to_string()),
            ],
            body: "ok".into(),
        };

        let response = to_response(cached);
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("content-type"));
        assert!(!response.headers().contains_key("transfer-encoding"));
    }
}
