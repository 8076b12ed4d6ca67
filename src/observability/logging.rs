//! Structured logging setup.
//!
//! `RUST_LOG` always wins. Otherwise the level comes from the config's
//! `logging.level`, which accepts the usual level names plus `WARNING` and
//! `CRITICAL`.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Map a config level name onto a tracing filter directive.
pub fn level_directive(level: &str) -> &'static str {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" | "warning" => "warn",
        "error" | "critical" | "fatal" => "error",
        _ => "info",
    }
}

/// Default filter when `RUST_LOG` is unset.
pub fn default_filter(level: &str) -> String {
    let level = level_directive(level);
    format!("rapid_dev_proxy={level},tower_http={level}")
}

/// Install the global subscriber. Call once at startup.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter(&config.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.format.eq_ignore_ascii_case("compact") {
        registry.with(tracing_subscriber::fmt::layer().compact()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    if !config.destination.eq_ignore_ascii_case("console") {
        tracing::warn!(
            destination = %config.destination,
            "Only console logging is supported, writing to stdout"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extended_level_names_map() {
        assert_eq!(level_directive("INFO"), "info");
        assert_eq!(level_directive("WARNING"), "warn");
        assert_eq!(level_directive("CRITICAL"), "error");
        assert_eq!(level_directive(" debug "), "debug");
        assert_eq!(level_directive("bogus"), "info");
    }

    #[test]
    fn default_filter_covers_http_layer() {
        assert_eq!(
            default_filter("DEBUG"),
            "rapid_dev_proxy=debug,tower_http=debug"
        );
    }
}
