//! Per-request proxy session.
//!
//! # Responsibilities
//! - Extract host signals (query, override headers, path, Host)
//! - Resolve the effective host and the target base URL
//! - Build the outbound URI and sanitized headers
//!
//! A session is created when a request arrives and consumed by the
//! forwarder; it is never shared between tasks.

use axum::body::Body;
use axum::http::header::{CONTENT_LENGTH, HOST};
use axum::http::{HeaderMap, Method, Request, Uri};
use url::form_urlencoded;

use crate::error::ProxyError;
use crate::routing::host::{
    override_header, query_host, resolve_host, HostSignals, HostSource, HOST_QUERY_PARAM,
    RDP_HOST_HEADER, X_HOST_HEADER,
};
use crate::routing::Router;

/// Everything needed to forward one request.
#[derive(Debug)]
pub struct ProxySession {
    pub method: Method,
    pub headers: HeaderMap,
    /// Raw query string as received, `_host` included.
    pub query: Option<String>,
    pub body: Body,
    pub effective_host: String,
    pub host_source: HostSource,
    /// Path to forward, without a leading `/`.
    pub stripped_path: String,
    /// Target base URL.
    pub target: String,
}

impl ProxySession {
    /// Resolve a request against the router.
    pub fn resolve(request: Request<Body>, router: &Router) -> Result<Self, ProxyError> {
        let (parts, body) = request.into_parts();

        let host_header = parts
            .headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| parts.uri.authority().map(|a| a.as_str()))
            .unwrap_or_default();
        let decoded_query_host = query_host(parts.uri.query());

        let resolved = resolve_host(&HostSignals {
            host_header,
            query_host: decoded_query_host.as_deref(),
            override_header: override_header(&parts.headers),
            path: parts.uri.path(),
        });

        let target = router
            .resolve(&resolved.effective_host)
            .ok_or(ProxyError::RouteNotFound)?
            .to_string();

        Ok(Self {
            method: parts.method,
            headers: parts.headers,
            query: parts.uri.query().map(str::to_string),
            body,
            effective_host: resolved.effective_host,
            host_source: resolved.source,
            stripped_path: resolved.stripped_path,
            target,
        })
    }

    /// Outbound URI: target + `/` + stripped path, plus the filtered query.
    pub fn target_uri(&self) -> Result<Uri, ProxyError> {
        outbound_uri(&self.target, &self.stripped_path, self.query.as_deref())
    }
}

/// Join target, path and query into the upstream URI.
pub fn outbound_uri(target: &str, stripped_path: &str, query: Option<&str>) -> Result<Uri, ProxyError> {
    let mut url = format!("{}/{}", target.trim_end_matches('/'), stripped_path);
    if let Some(query) = query.and_then(strip_host_query) {
        url.push('?');
        url.push_str(&query);
    }
    url.parse::<Uri>().map_err(|e| {
        tracing::error!(url = %url, error = %e, "Failed to build upstream URI");
        ProxyError::UpstreamProtocol
    })
}

/// Drop every `_host` pair from a raw query string.
///
/// Remaining pairs keep their original encoding. Returns `None` when
/// nothing is left.
pub fn strip_host_query(query: &str) -> Option<String> {
    let kept: Vec<&str> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| {
            form_urlencoded::parse(pair.as_bytes())
                .next()
                .map_or(true, |(key, _)| key != HOST_QUERY_PARAM)
        })
        .collect();
    if kept.is_empty() {
        None
    } else {
        Some(kept.join("&"))
    }
}

/// Remove headers that must not reach the backend, then apply the
/// configured auth headers, overwriting on collision.
pub fn sanitize_request_headers(headers: &mut HeaderMap, auth_headers: &HeaderMap) {
    headers.remove(HOST);
    headers.remove(CONTENT_LENGTH);
    headers.remove(RDP_HOST_HEADER);
    headers.remove(X_HOST_HEADER);
    for (name, value) in auth_headers {
        headers.insert(name.clone(), value.clone());
    }
}
