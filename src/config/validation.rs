//! Configuration validation.
//!
//! Serde handles the syntactic side; this module checks the values:
//! bind port and limits, target URLs, alias patterns and injected headers.
//! Every problem is reported, not just the first one.

use axum::http::{HeaderName, HeaderValue};
use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("proxy.port must be between 1 and 65535")]
    InvalidPort,

    #[error("proxy.timeout must be a positive number of seconds, got {0}")]
    InvalidTimeout(String),

    #[error("proxy.max_connections must be greater than zero")]
    InvalidMaxConnections,

    #[error("at least one route must be defined")]
    NoRoutes,

    #[error("route domain must not be empty")]
    EmptyDomain,

    #[error("target for {owner} must be a valid HTTP/HTTPS URL, got {target:?}")]
    InvalidTarget { owner: String, target: String },

    #[error("alias {alias:?} on route {domain} must be a hostname or a `*.suffix` wildcard")]
    InvalidAlias { domain: String, alias: String },

    #[error("auth header {name:?} is not a valid HTTP header")]
    InvalidAuthHeader { name: String },

    #[error("error page key {0:?} is not an HTTP status code")]
    InvalidErrorPage(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.proxy.port == 0 {
        errors.push(ValidationError::InvalidPort);
    }
    if !(config.proxy.timeout.is_finite() && config.proxy.timeout > 0.0) {
        errors.push(ValidationError::InvalidTimeout(config.proxy.timeout.to_string()));
    }
    if config.proxy.max_connections == 0 {
        errors.push(ValidationError::InvalidMaxConnections);
    }

    if config.routes.is_empty() {
        errors.push(ValidationError::NoRoutes);
    }
    for (domain, route) in config.routes.iter() {
        if domain.trim().is_empty() {
            errors.push(ValidationError::EmptyDomain);
        } else if !is_valid_pattern(domain) {
            errors.push(ValidationError::InvalidAlias {
                domain: domain.to_string(),
                alias: domain.to_string(),
            });
        }
        if !is_http_url(&route.target) {
            errors.push(ValidationError::InvalidTarget {
                owner: format!("route {domain}"),
                target: route.target.clone(),
            });
        }
        for alias in &route.aliases {
            if !is_valid_pattern(alias) {
                errors.push(ValidationError::InvalidAlias {
                    domain: domain.to_string(),
                    alias: alias.clone(),
                });
            }
        }
    }

    if !is_http_url(&config.default.target) {
        errors.push(ValidationError::InvalidTarget {
            owner: "default".to_string(),
            target: config.default.target.clone(),
        });
    }
    for code in config.default.error_pages.keys() {
        let valid = code.parse::<u16>().is_ok_and(|c| (100..=599).contains(&c));
        if !valid {
            errors.push(ValidationError::InvalidErrorPage(code.clone()));
        }
    }

    for (name, value) in &config.security.auth_headers {
        let valid = HeaderName::from_bytes(name.as_bytes()).is_ok()
            && HeaderValue::from_str(value).is_ok();
        if !valid {
            errors.push(ValidationError::InvalidAuthHeader { name: name.clone() });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Route owners (domain, or `default`) whose target uses `https`.
///
/// Such targets pass validation, but the forwarder only dials plain HTTP,
/// so every request to them ends in a 502.
pub fn tls_targets(config: &ProxyConfig) -> Vec<(&str, &str)> {
    config
        .routes
        .iter()
        .map(|(domain, route)| (domain, route.target.as_str()))
        .chain(std::iter::once(("default", config.default.target.as_str())))
        .filter(|(_, target)| {
            Url::parse(target).is_ok_and(|url| url.scheme() == "https")
        })
        .collect()
}

fn is_http_url(target: &str) -> bool {
    match Url::parse(target) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.has_host(),
        Err(_) => false,
    }
}

// `*` is only meaningful as a leading `*.` wildcard label.
fn is_valid_pattern(pattern: &str) -> bool {
    let pattern = pattern.trim();
    if pattern.is_empty() {
        return false;
    }
    match pattern.strip_prefix("*.") {
        Some(suffix) => !suffix.is_empty() && !suffix.contains('*'),
        None => !pattern.contains('*'),
    }
}
