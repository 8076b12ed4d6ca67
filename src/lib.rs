//! Local development reverse proxy.
//!
//! Maps virtual hostnames (`api.local`, `*.app.local`, ...) onto local
//! backends so several services can share one port during development.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::schema::ProxyConfig;
pub use error::ProxyError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use observability::ProxyStats;
