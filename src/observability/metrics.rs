//! Process-wide request counters.
//!
//! # Metrics
//! - `request_count`: every inbound request, counted on arrival
//! - `error_count`: every request answered with a synthesized error
//!
//! Both are plain atomics read by `GET /health`; they live for the process
//! and are only reset by a restart.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Shared counters. Wrap in an `Arc` to share between handlers.
#[derive(Debug)]
pub struct ProxyStats {
    request_count: AtomicU64,
    error_count: AtomicU64,
    started_at: Instant,
}

/// Point-in-time view used by the health endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthSnapshot {
    pub status: &'static str,
    pub request_count: u64,
    pub error_count: u64,
    /// Seconds since the proxy started.
    pub uptime: f64,
}

impl ProxyStats {
    /// Start counting from zero, with uptime measured from now.
    pub fn new() -> Self {
        Self {
            request_count: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    /// Count one inbound request.
    pub fn record_request(&self) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one proxy-generated error response.
    pub fn record_error(&self) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Requests seen since start.
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Error responses produced since start.
    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Time since the counters were created.
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Current values for `GET /health`.
    pub fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            status: "healthy",
            request_count: self.request_count(),
            error_count: self.error_count(),
            uptime: self.uptime().as_secs_f64(),
        }
    }
}

impl Default for ProxyStats {
    fn default() -> Self {
        Self::new()
    }
}
