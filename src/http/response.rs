//! Upstream response relay.
//!
//! # Responsibilities
//! - Copy upstream status and headers, minus `Content-Length`
//! - Stream the body to the caller chunk by chunk, in order
//! - Bound every wait for the next chunk by the upstream timeout
//!
//! Dropping the returned body (client went away) drops the upstream body,
//! which closes the upstream connection instead of returning it to the pool.
//! The same drop releases anything attached with [`hold_until_done`].

use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::header::CONTENT_LENGTH;
use axum::http::HeaderMap;
use axum::response::Response;
use axum::BoxError;
use futures_util::{stream, StreamExt};

/// Turn an upstream response into a streaming downstream response.
pub fn relay_response<B>(upstream: axum::http::Response<B>, idle_timeout: Duration) -> Response
where
    B: hyper::body::Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let (mut parts, body) = upstream.into_parts();
    sanitize_response_headers(&mut parts.headers);
    Response::from_parts(parts, relay_body(Body::new(body), idle_timeout))
}

/// Length is recomputed by the transport since the body is streamed.
pub fn sanitize_response_headers(headers: &mut HeaderMap) {
    headers.remove(CONTENT_LENGTH);
}

/// Re-emit `body` chunk by chunk, aborting if a chunk takes longer than
/// `idle_timeout` to arrive.
pub fn relay_body(body: Body, idle_timeout: Duration) -> Body {
    let chunks = stream::unfold(Some(body.into_data_stream()), move |state| async move {
        let mut upstream = state?;
        match tokio::time::timeout(idle_timeout, upstream.next()).await {
            Ok(Some(Ok(chunk))) => Some((Ok::<_, BoxError>(chunk), Some(upstream))),
            Ok(Some(Err(e))) => {
                tracing::warn!(error = %e, "Upstream body failed mid-stream");
                Some((Err(e.into()), None))
            }
            Ok(None) => None,
            Err(_) => {
                tracing::warn!(timeout = ?idle_timeout, "Upstream body stalled, aborting stream");
                Some((Err("upstream body timed out".into()), None))
            }
        }
    });
    Body::from_stream(chunks)
}

/// Keep `guard` alive until `body` has been fully sent or dropped.
pub fn hold_until_done<G>(body: Body, guard: G) -> Body
where
    G: Send + 'static,
{
    let chunks = body.into_data_stream().map(move |chunk| {
        let _held = &guard;
        chunk
    });
    Body::from_stream(chunks)
}
