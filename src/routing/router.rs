//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled routes in table order
//! - Resolve an effective host to a target base URL
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(1) exact lookup via HashMap, O(n) alias and wildcard scans
//! - First match wins within each scan
//! - Falls back to the default target; `None` only when even that is empty

use std::collections::HashMap;

use crate::config::{DefaultRoute, RouteTable};
use crate::routing::matcher::{normalize_host, HostPattern};

/// A route compiled from config.
#[derive(Debug, Clone)]
struct CompiledRoute {
    target: String,
    key: HostPattern,
    aliases: Vec<HostPattern>,
}

/// Which rule selected a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Alias,
    Wildcard,
    Default,
}

/// Resolved target for a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    pub target: &'a str,
    pub kind: MatchKind,
}

/// Host-based router.
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<CompiledRoute>,
    exact: HashMap<String, usize>,
    default_target: String,
}

impl Router {
    /// Compile the routing table. Domains are normalized the same way hosts are.
    pub fn from_config(routes: &RouteTable, default: &DefaultRoute) -> Self {
        let mut compiled = Vec::with_capacity(routes.len());
        let mut exact = HashMap::with_capacity(routes.len());

        for (domain, route) in routes.iter() {
            let key = HostPattern::parse(domain);
            if let HostPattern::Exact(name) = &key {
                exact.entry(name.clone()).or_insert(compiled.len());
            }
            compiled.push(CompiledRoute {
                target: route.target.clone(),
                key,
                aliases: route.aliases.iter().map(|a| HostPattern::parse(a)).collect(),
            });
        }

        Self {
            routes: compiled,
            exact,
            default_target: default.target.clone(),
        }
    }

    /// Resolve an effective host to a target base URL.
    pub fn resolve(&self, effective_host: &str) -> Option<&str> {
        self.resolve_match(effective_host).map(|m| m.target)
    }

    /// Like [`Router::resolve`], also reporting which rule matched.
    pub fn resolve_match(&self, effective_host: &str) -> Option<RouteMatch<'_>> {
        let host = normalize_host(effective_host);

        if let Some(&idx) = self.exact.get(&host) {
            return Some(RouteMatch {
                target: &self.routes[idx].target,
                kind: MatchKind::Exact,
            });
        }

        if let Some(route) = self
            .routes
            .iter()
            .find(|r| r.aliases.iter().any(|a| a.matches(&host)))
        {
            return Some(RouteMatch {
                target: &route.target,
                kind: MatchKind::Alias,
            });
        }

        if let Some(route) = self
            .routes
            .iter()
            .find(|r| r.key.is_wildcard() && r.key.matches(&host))
        {
            return Some(RouteMatch {
                target: &route.target,
                kind: MatchKind::Wildcard,
            });
        }

        if self.default_target.is_empty() {
            return None;
        }
        Some(RouteMatch {
            target: &self.default_target,
            kind: MatchKind::Default,
        })
    }

    /// Fallback target; empty when none is configured.
    pub fn default_target(&self) -> &str {
        &self.default_target
    }

    /// Number of compiled routes, not counting the default.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// True when the table has no routes.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteConfig;

    const DEFAULT: &str = "http://127.0.0.1:9000";

    fn router(entries: Vec<(&str, RouteConfig)>) -> Router {
        let mut table = RouteTable::new();
        for (domain, route) in entries {
            table.insert(domain, route);
        }
        Router::from_config(&table, &DefaultRoute::new(DEFAULT))
    }

    #[test]
    fn test_exact_match() {
        let r = router(vec![("api.local", RouteConfig::new("http://127.0.0.1:3000"))]);
        assert_eq!(r.resolve("api.local"), Some("http://127.0.0.1:3000"));
        assert_eq!(r.resolve("API.LOCAL:8080"), Some("http://127.0.0.1:3000"));
        assert_eq!(r.resolve_match("api.local").unwrap().kind, MatchKind::Exact);
    }

    #[test]
    fn test_unknown_host_falls_back_to_default() {
        let r = router(vec![("api.local", RouteConfig::new("http://127.0.0.1:3000"))]);
        assert_eq!(r.resolve("unknown.local"), Some(DEFAULT));
        assert_eq!(r.resolve(""), Some(DEFAULT));
        assert_eq!(r.resolve_match("unknown.local").unwrap().kind, MatchKind::Default);
    }

    #[test]
    fn test_localhost_suffix_is_equivalent() {
        let r = router(vec![
            ("api", RouteConfig::new("http://127.0.0.1:3000")),
            ("web.local", RouteConfig::new("http://127.0.0.1:4000")),
        ]);
        for host in ["api", "web.local", "nothing", "a.b"] {
            assert_eq!(r.resolve(&format!("{host}.localhost")), r.resolve(host));
        }
        assert_eq!(r.resolve("api.localhost:8080"), Some("http://127.0.0.1:3000"));
    }

    #[test]
    fn test_exact_alias() {
        let r = router(vec![(
            "app.local",
            RouteConfig::new("http://127.0.0.1:8080").with_alias("Frontend.Test"),
        )]);
        assert_eq!(r.resolve("frontend.test"), Some("http://127.0.0.1:8080"));
        assert_eq!(r.resolve_match("frontend.test").unwrap().kind, MatchKind::Alias);
    }

    #[test]
    fn test_wildcard_alias() {
        let r = router(vec![(
            "app.local",
            RouteConfig::new("http://127.0.0.1:8080").with_alias("*.example.com"),
        )]);
        assert_eq!(r.resolve("a.example.com"), Some("http://127.0.0.1:8080"));
        assert_eq!(r.resolve("a.b.example.com"), Some("http://127.0.0.1:8080"));
        assert_eq!(r.resolve("example.com"), Some(DEFAULT));
    }

    #[test]
    fn test_first_matching_alias_wins() {
        let r = router(vec![
            (
                "first.local",
                RouteConfig::new("http://127.0.0.1:1").with_alias("*.shared.test"),
            ),
            (
                "second.local",
                RouteConfig::new("http://127.0.0.1:2").with_alias("*.shared.test"),
            ),
        ]);
        assert_eq!(r.resolve("x.shared.test"), Some("http://127.0.0.1:1"));
    }

    #[test]
    fn test_exact_key_beats_alias_of_earlier_route() {
        let r = router(vec![
            (
                "catchall.local",
                RouteConfig::new("http://127.0.0.1:1").with_alias("*.local"),
            ),
            ("api.local", RouteConfig::new("http://127.0.0.1:2")),
        ]);
        assert_eq!(r.resolve("api.local"), Some("http://127.0.0.1:2"));
        assert_eq!(r.resolve("other.local"), Some("http://127.0.0.1:1"));
    }

    #[test]
    fn test_alias_beats_wildcard_key() {
        let r = router(vec![
            ("*.dev.test", RouteConfig::new("http://127.0.0.1:1")),
            (
                "special.local",
                RouteConfig::new("http://127.0.0.1:2").with_alias("special.dev.test"),
            ),
        ]);
        assert_eq!(r.resolve("special.dev.test"), Some("http://127.0.0.1:2"));
        assert_eq!(r.resolve("other.dev.test"), Some("http://127.0.0.1:1"));
        assert_eq!(r.resolve_match("other.dev.test").unwrap().kind, MatchKind::Wildcard);
        assert_eq!(r.resolve("dev.test"), Some(DEFAULT));
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let r = router(vec![
            (
                "api.local",
                RouteConfig::new("http://127.0.0.1:3000").with_alias("*.api.test"),
            ),
            ("*.preview.local", RouteConfig::new("http://127.0.0.1:5000")),
        ]);
        for host in ["api.local", "x.api.test", "pr-1.preview.local", "nope", ""] {
            let first = r.resolve(host).map(str::to_string);
            for _ in 0..3 {
                assert_eq!(r.resolve(host).map(str::to_string), first);
            }
        }
    }

    #[test]
    fn test_empty_default_yields_no_route() {
        let r = Router::from_config(&RouteTable::new(), &DefaultRoute::new(""));
        assert_eq!(r.resolve("anything"), None);
        assert!(r.is_empty());
    }
}
