//! Effective host selection.
//!
//! A request can name the virtual host it wants in several ways. The first
//! non-empty signal wins, in this order:
//!
//! 1. `_host` query parameter
//! 2. `x-rdp-host` header, then `x-host`
//! 3. a path prefix: `__host/<domain>/<rest>` or `@<domain>/<rest>`
//! 4. the `Host` header (possibly empty)
//!
//! Only a path override rewrites the forwarded path.

use axum::http::HeaderMap;
use url::form_urlencoded;

pub const HOST_QUERY_PARAM: &str = "_host";
pub const RDP_HOST_HEADER: &str = "x-rdp-host";
pub const X_HOST_HEADER: &str = "x-host";

const PATH_HOST_MARKER: &str = "__host/";
const PATH_AT_MARKER: &str = "@";

/// Where the effective host came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostSource {
    Query,
    Header,
    Path,
    HostHeader,
}

/// Raw host signals extracted from a request.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostSignals<'a> {
    /// Value of the `Host` header, empty if absent.
    pub host_header: &'a str,
    /// Decoded `_host` query value.
    pub query_host: Option<&'a str>,
    /// `x-rdp-host` or `x-host` header value.
    pub override_header: Option<&'a str>,
    /// Request path, with or without its leading `/`.
    pub path: &'a str,
}

/// Outcome of host selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedHost {
    pub effective_host: String,
    /// Path to forward, without a leading `/`.
    pub stripped_path: String,
    pub source: HostSource,
}

/// Pick the effective host and the path to forward.
pub fn resolve_host(signals: &HostSignals<'_>) -> ResolvedHost {
    let path = signals.path.strip_prefix('/').unwrap_or(signals.path);

    if let Some(host) = non_empty(signals.query_host) {
        return ResolvedHost {
            effective_host: host.to_string(),
            stripped_path: path.to_string(),
            source: HostSource::Query,
        };
    }

    if let Some(host) = non_empty(signals.override_header) {
        return ResolvedHost {
            effective_host: host.to_string(),
            stripped_path: path.to_string(),
            source: HostSource::Header,
        };
    }

    if let Some((host, rest)) = split_path_host(path) {
        return ResolvedHost {
            effective_host: host.to_string(),
            stripped_path: rest.to_string(),
            source: HostSource::Path,
        };
    }

    ResolvedHost {
        effective_host: signals.host_header.to_string(),
        stripped_path: path.to_string(),
        source: HostSource::HostHeader,
    }
}

/// Split `__host/<domain>/<rest>` or `@<domain>/<rest>` into `(domain, rest)`.
///
/// `path` must not start with `/`. Returns `None` when there is no marker or
/// the domain segment is empty.
pub fn split_path_host(path: &str) -> Option<(&str, &str)> {
    let after = path
        .strip_prefix(PATH_HOST_MARKER)
        .or_else(|| path.strip_prefix(PATH_AT_MARKER))?;
    let (host, rest) = after.split_once('/').unwrap_or((after, ""));
    if host.is_empty() {
        return None;
    }
    Some((host, rest))
}

/// First `_host` value in a raw query string, percent-decoded.
pub fn query_host(query: Option<&str>) -> Option<String> {
    form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == HOST_QUERY_PARAM)
        .map(|(_, value)| value.into_owned())
}

/// First non-empty override header: `x-rdp-host`, then `x-host`.
pub fn override_header(headers: &HeaderMap) -> Option<&str> {
    [RDP_HOST_HEADER, X_HOST_HEADER]
        .into_iter()
        .filter_map(|name| headers.get(name))
        .filter_map(|value| value.to_str().ok())
        .find(|value| !value.trim().is_empty())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
