//! Cascading pipeline: race for a quote, then persist it.
//!
//! # Budget Cascade
//! ```text
//! request budget (TimeoutLayer + request Deadline)
//!     ├─ race outer budget   (Deadline::child of the request, checked)
//!     │     └─ per-task budget (clamped to the race's remaining time)
//!     └─ persistence budget  (fixed, starts after the race is won)
//! ```
//!
//! # Design Decisions
//! - The response is fixed the moment the race is won
//! - Persistence failures are logged and reported in `PersistStatus` only
//! - A lost race persists nothing

pub mod cascade;
pub mod types;

pub use cascade::{PipelineSettings, QuotePipeline};
pub use types::{PersistStatus, PersistenceError, PipelineError, PipelineResponse, PipelineState};
