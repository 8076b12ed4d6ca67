//! Upstream forwarding.
//!
//! # Responsibilities
//! - Build the outbound request from a resolved session
//! - Send it without following redirects, bounded by the upstream timeout
//! - Relay the response, or classify the failure
//!
//! # Failure mapping
//! ```text
//! connect error (refused, unreachable, DNS)  → 502 UpstreamUnreachable
//! no response headers within timeout         → 504 UpstreamTimeout
//! anything else                              → 500 UpstreamProtocol
//! ```
//! No retries; every failure is final.

use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, Request};
use axum::response::Response;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::error::ProxyError;
use crate::http::request::{sanitize_request_headers, ProxySession};
use crate::http::response::relay_response;

/// Per-request forwarding settings, taken from the live config.
#[derive(Debug, Clone)]
pub struct ForwardSettings {
    pub timeout: Duration,
    pub auth_headers: HeaderMap,
}

/// Sends sessions upstream over a shared pooled client.
///
/// The client never follows redirects, so 3xx responses reach the caller
/// untouched. Only plain HTTP targets are dialed.
#[derive(Clone)]
pub struct Forwarder {
    client: Client<HttpConnector, Body>,
}

impl Forwarder {
    pub fn new() -> Self {
        let mut connector = HttpConnector::new();
        connector.set_nodelay(true);
        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self { client }
    }

    /// Forward a session and return the streaming response.
    pub async fn forward(
        &self,
        session: ProxySession,
        settings: &ForwardSettings,
    ) -> Result<Response, ProxyError> {
        let uri = session.target_uri()?;
        let target = session.target;

        let mut headers = session.headers;
        sanitize_request_headers(&mut headers, &settings.auth_headers);

        let mut request = Request::builder()
            .method(session.method)
            .uri(uri.clone())
            .body(session.body)
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to build upstream request");
                ProxyError::UpstreamProtocol
            })?;
        *request.headers_mut() = headers;

        tracing::debug!(upstream = %uri, "Forwarding request");

        let response = match tokio::time::timeout(settings.timeout, self.client.request(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(classify_client_error(&target, &e)),
            Err(_) => {
                tracing::error!(backend = %target, timeout = ?settings.timeout, "Timeout error to backend");
                return Err(ProxyError::UpstreamTimeout);
            }
        };

        Ok(relay_response(response, settings.timeout))
    }
}

impl Default for Forwarder {
    fn default() -> Self {
        Self::new()
    }
}

fn classify_client_error(target: &str, error: &hyper_util::client::legacy::Error) -> ProxyError {
    if error.is_connect() {
        tracing::error!(backend = %target, error = %error, "Connection error to backend");
        ProxyError::UpstreamUnreachable
    } else {
        tracing::error!(backend = %target, error = ?error, "Proxy error");
        ProxyError::UpstreamProtocol
    }
}
