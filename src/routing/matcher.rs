//! Host normalization and pattern matching.
//!
//! # Responsibilities
//! - Normalize an effective host (port, whitespace, case, `.localhost`)
//! - Match a normalized host against an exact or `*.suffix` pattern
//!
//! # Design Decisions
//! - Byte-wise, case-insensitive comparison; no IDN normalization
//! - A pattern is a wildcard only when it starts with `*.`, so the suffix
//!   always keeps its leading dot and `*.example.com` never matches
//!   `example.com` or `badexample.com`
//! - No regex

/// Suffix that maps `<name>.localhost` onto `<name>`.
pub const LOCALHOST_SUFFIX: &str = ".localhost";

/// Normalize a raw host value for lookup.
///
/// Drops a trailing `:<port>`, trims whitespace, lowercases and strips a
/// trailing `.localhost`. Bracketed IPv6 literals keep their colons.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let host = match host.rsplit_once(':') {
        Some((name, port)) if port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    };
    let mut host = host.trim().to_ascii_lowercase();
    if host.ends_with(LOCALHOST_SUFFIX) {
        host.truncate(host.len() - LOCALHOST_SUFFIX.len());
    }
    host
}

/// An exact hostname or a `*.suffix` wildcard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostPattern {
    Exact(String),
    /// Holds the suffix including its leading dot.
    Wildcard(String),
}

impl HostPattern {
    /// Parse a pattern. Case and surrounding whitespace are ignored.
    pub fn parse(pattern: &str) -> Self {
        let pattern = pattern.trim().to_ascii_lowercase();
        if pattern.starts_with("*.") {
            HostPattern::Wildcard(pattern[1..].to_string())
        } else {
            HostPattern::Exact(pattern)
        }
    }

    /// Returns true if the already-normalized `host` matches.
    pub fn matches(&self, host: &str) -> bool {
        match self {
            HostPattern::Exact(name) => name == host,
            HostPattern::Wildcard(suffix) => host.ends_with(suffix.as_str()),
        }
    }

    /// True for `*.suffix` patterns.
    pub fn is_wildcard(&self) -> bool {
        matches!(self, HostPattern::Wildcard(_))
    }
}
