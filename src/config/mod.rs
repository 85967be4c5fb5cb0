//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (budget nesting, endpoints, addresses)
//!     → ServerConfig (validated, immutable)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → HttpServer swaps the pipeline settings atomically
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Budgets are milliseconds in the file, `Duration` everywhere else

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    ClientConfig, ListenerConfig, LogFormat, ObservabilityConfig, PersistenceConfig, RaceConfig,
    ServerConfig, SourceConfig, TimeoutConfig, UpstreamConfig,
};
pub use watcher::ConfigWatcher;
