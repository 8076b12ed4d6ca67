//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (query, headers, path, Host)
//!     → host.rs (pick effective host by precedence, strip path marker)
//!     → router.rs (exact → alias → wildcard key → default)
//!     → matcher.rs (normalize host, evaluate patterns)
//!     → Return: target base URL
//!
//! Route Compilation (at startup and on reload):
//!     RouteTable (file order)
//!     → Compile patterns, index exact keys
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled once, immutable at runtime
//! - Pure functions over plain data, no request types in the matcher
//! - Deterministic: same input always matches same route

pub mod host;
pub mod matcher;
pub mod router;

pub use host::{resolve_host, HostSignals, HostSource, ResolvedHost};
pub use matcher::{normalize_host, HostPattern};
pub use router::{MatchKind, RouteMatch, Router};
