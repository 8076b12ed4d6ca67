//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, /health, /routes)
//!     → request.rs (host signals → ProxySession with target)
//!     → forward.rs (outbound request, timeout, failure classification)
//!     → response.rs (strip Content-Length, stream body back)
//!     → Send to client
//! ```
//!
//! # Session states
//! ```text
//! received → resolved → forwarding → streaming → closed
//!                 ↘          ↘
//!                  errored ───→ closed
//! ```

pub mod forward;
pub mod request;
pub mod response;
pub mod server;

pub use forward::{ForwardSettings, Forwarder};
pub use request::ProxySession;
pub use server::{AppState, HttpServer};
