//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (JSON/YAML/TOML)
//!     → loader.rs (parse & deserialize by extension)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → compiled into routing state shared via Arc
//!
//! With `start --reload`:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → server swaps routing state atomically
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - Every section except `routes` and `default` has defaults
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, write_sample_config, ConfigError, ConfigFormat};
pub use schema::{
    DefaultRoute, LoggingConfig, ProxyConfig, ProxySettings, RouteConfig, RouteTable,
    SecurityConfig,
};
pub use validation::ValidationError;
