//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits so the same schema loads from JSON, YAML or TOML.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Root configuration for the proxy.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProxyConfig {
    /// Listener and upstream settings.
    #[serde(default)]
    pub proxy: ProxySettings,

    /// Domain to route mappings, kept in file order.
    pub routes: RouteTable,

    /// Fallback route used when nothing in `routes` matches.
    pub default: DefaultRoute,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// CORS and header injection settings.
    #[serde(default)]
    pub security: SecurityConfig,
}

impl ProxyConfig {
    /// A config with no routes and the given fallback target.
    pub fn with_default_target(target: impl Into<String>) -> Self {
        Self {
            proxy: ProxySettings::default(),
            routes: RouteTable::new(),
            default: DefaultRoute::new(target),
            logging: LoggingConfig::default(),
            security: SecurityConfig::default(),
        }
    }

    /// The starter configuration written by `init`.
    pub fn sample() -> Self {
        let mut config = Self::with_default_target("http://127.0.0.1:3000");
        config.routes.insert(
            "api.local",
            RouteConfig::new("http://127.0.0.1:3000").with_description("API Server"),
        );
        config.routes.insert(
            "app.local",
            RouteConfig::new("http://127.0.0.1:8080").with_description("Frontend App"),
        );
        config.routes.insert(
            "admin.local",
            RouteConfig::new("http://127.0.0.1:9000").with_description("Admin Panel"),
        );
        config.default.error_pages.insert("404".to_string(), "Not Found".to_string());
        config.default.error_pages.insert("502".to_string(), "Bad Gateway".to_string());
        config
    }

    /// Socket address string the listener binds to.
    pub fn bind_address(&self) -> String {
        if self.proxy.host.contains(':') && !self.proxy.host.starts_with('[') {
            format!("[{}]:{}", self.proxy.host, self.proxy.port)
        } else {
            format!("{}:{}", self.proxy.host, self.proxy.port)
        }
    }
}

/// Listener and upstream settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxySettings {
    /// Host to bind to.
    pub host: String,

    /// Port to bind to.
    pub port: u16,

    /// Upstream timeout in seconds.
    pub timeout: f64,

    /// Maximum concurrent in-flight requests.
    pub max_connections: usize,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            timeout: 30.0,
            max_connections: 100,
        }
    }
}

/// A single backend route.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Target base URL (e.g. `http://127.0.0.1:3000`).
    pub target: String,

    /// Alternate hostnames (exact or `*.suffix`) that map to this route.
    #[serde(default)]
    pub aliases: Vec<String>,

    /// Opaque key/value metadata, e.g. a `description`.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl RouteConfig {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            aliases: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.metadata
            .insert("description".to_string(), description.into());
        self
    }

    /// The `description` metadata entry, or an empty string.
    pub fn description(&self) -> &str {
        self.metadata
            .get("description")
            .map(String::as_str)
            .unwrap_or_default()
    }
}

/// Fallback route.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DefaultRoute {
    /// Default target URL.
    pub target: String,

    /// Custom error page text keyed by status code.
    #[serde(default)]
    pub error_pages: BTreeMap<String, String>,
}

impl DefaultRoute {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            error_pages: BTreeMap::new(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (DEBUG, INFO, WARNING, ERROR, CRITICAL; case-insensitive).
    pub level: String,

    /// Output format. `compact` selects the compact formatter, anything else the full one.
    pub format: String,

    /// Log destination. Only `console` is supported.
    pub destination: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            format: "full".to_string(),
            destination: "console".to_string(),
        }
    }
}

/// CORS and header injection settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Answer CORS preflights and add CORS headers to every response.
    pub cors_enabled: bool,

    /// Accepted for compatibility; rate limiting is not implemented.
    pub rate_limit_enabled: bool,

    /// Headers injected into every forwarded request.
    pub auth_headers: BTreeMap<String, String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            cors_enabled: true,
            rate_limit_enabled: false,
            auth_headers: BTreeMap::new(),
        }
    }
}

/// Ordered domain → route mapping.
///
/// Serialized as a plain map, but unlike a `HashMap` it keeps the order the
/// domains appear in the file, since alias and wildcard scans are first-match.
/// A repeated domain replaces the earlier entry in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteTable {
    entries: Vec<(String, RouteConfig)>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a route, replacing any existing entry for the same domain.
    pub fn insert(&mut self, domain: impl Into<String>, route: RouteConfig) {
        let domain = domain.into();
        match self.entries.iter_mut().find(|(d, _)| *d == domain) {
            Some((_, existing)) => *existing = route,
            None => self.entries.push((domain, route)),
        }
    }

    pub fn get(&self, domain: &str) -> Option<&RouteConfig> {
        self.entries
            .iter()
            .find(|(d, _)| d == domain)
            .map(|(_, route)| route)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RouteConfig)> {
        self.entries.iter().map(|(d, r)| (d.as_str(), r))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for RouteTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (domain, route) in &self.entries {
            map.serialize_entry(domain, route)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RouteTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RouteTableVisitor;

        impl<'de> Visitor<'de> for RouteTableVisitor {
            type Value = RouteTable;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of domain names to routes")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<RouteTable, A::Error> {
                let mut table = RouteTable::new();
                while let Some((domain, route)) = access.next_entry::<String, RouteConfig>()? {
                    table.insert(domain, route);
                }
                Ok(table)
            }
        }

        deserializer.deserialize_map(RouteTableVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_table_keeps_file_order() {
        let json = r#"{
            "zeta.local": { "target": "http://127.0.0.1:1" },
            "alpha.local": { "target": "http://127.0.0.1:2" },
            "mid.local": { "target": "http://127.0.0.1:3" }
        }"#;
        let table: RouteTable = serde_json::from_str(json).unwrap();
        let domains: Vec<_> = table.iter().map(|(d, _)| d).collect();
        assert_eq!(domains, vec!["zeta.local", "alpha.local", "mid.local"]);

        let back = serde_json::to_string(&table).unwrap();
        assert!(back.find("zeta.local").unwrap() < back.find("alpha.local").unwrap());
    }

    #[test]
    fn repeated_domain_replaces_in_place() {
        let mut table = RouteTable::new();
        table.insert("a.local", RouteConfig::new("http://127.0.0.1:1"));
        table.insert("b.local", RouteConfig::new("http://127.0.0.1:2"));
        table.insert("a.local", RouteConfig::new("http://127.0.0.1:3"));

        assert_eq!(table.len(), 2);
        assert_eq!(table.get("a.local").unwrap().target, "http://127.0.0.1:3");
        assert_eq!(table.iter().next().unwrap().0, "a.local");
    }

    #[test]
    fn minimal_config_fills_defaults() {
        let json = r#"{
            "routes": { "api.local": { "target": "http://127.0.0.1:3000" } },
            "default": { "target": "http://127.0.0.1:3000" }
        }"#;
        let config: ProxyConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.proxy, ProxySettings::default());
        assert!(config.security.cors_enabled);
        assert!(config.routes.get("api.local").unwrap().aliases.is_empty());
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn ipv6_bind_address_is_bracketed() {
        let mut config = ProxyConfig::with_default_target("http://127.0.0.1:3000");
        config.proxy.host = "::1".to_string();
        config.proxy.port = 9000;
        assert_eq!(config.bind_address(), "[::1]:9000");
    }

    #[test]
    fn sample_describes_routes() {
        let sample = ProxyConfig::sample();
        assert_eq!(sample.routes.len(), 3);
        assert_eq!(sample.routes.get("api.local").unwrap().description(), "API Server");
    }
}
