//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! race / pipeline / http
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Every source loss is logged and counted; none is raised to the caller
//! - The request ID doubles as the pipeline invocation ID in log spans

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
