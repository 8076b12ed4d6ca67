//! Forwarding failures and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// A failure on the forwarding path.
///
/// The display text is the plain-text body returned to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProxyError {
    #[error("No route found for host")]
    RouteNotFound,

    #[error("Backend service unavailable")]
    UpstreamUnreachable,

    #[error("Backend service timeout")]
    UpstreamTimeout,

    #[error("Internal proxy error")]
    UpstreamProtocol,
}

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::RouteNotFound => StatusCode::NOT_FOUND,
            ProxyError::UpstreamUnreachable => StatusCode::BAD_GATEWAY,
            ProxyError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::UpstreamProtocol => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::CONTENT_TYPE;

    #[test]
    fn maps_to_plain_text_status() {
        let cases = [
            (ProxyError::RouteNotFound, 404, "No route found for host"),
            (ProxyError::UpstreamUnreachable, 502, "Backend service unavailable"),
            (ProxyError::UpstreamTimeout, 504, "Backend service timeout"),
            (ProxyError::UpstreamProtocol, 500, "Internal proxy error"),
        ];
        for (err, status, text) in cases {
            assert_eq!(err.to_string(), text);
            let response = err.into_response();
            assert_eq!(response.status().as_u16(), status);
            let content_type = response.headers()[CONTENT_TYPE].to_str().unwrap();
            assert!(content_type.starts_with("text/plain"));
        }
    }
}
