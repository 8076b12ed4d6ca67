//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     Ctrl+C / SIGTERM → wait_for_signal returns
//!
//! Shutdown (shutdown.rs):
//!     trigger → every subscriber (server, watcher) sees it
//!     → server stops accepting, drains in-flight requests → exit
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
