//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events, one access line per request)
//!     → metrics.rs (request/error counters)
//!
//! Consumers:
//!     → stdout
//!     → GET /health
//! ```

pub mod logging;
pub mod metrics;

pub use metrics::{HealthSnapshot, ProxyStats};
