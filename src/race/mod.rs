//! Race-select fetching under cascading time budgets.
//!
//! # Data Flow
//! ```text
//! caller
//!     → selector.rs (one bounded task per source, shared outer deadline)
//!         → task.rs (operation + cancellation token, hard deadline)
//!             → source.rs (Fetcher::fetch, then the source's decoder)
//!     ← first success, or AllSourcesFailed / DeadlineExceeded
//! ```
//!
//! # Design Decisions
//! - Deadlines are computed top-down and passed as values (deadline.rs)
//! - Timeouts are a distinct outcome, never wrapped as an error
//! - Cancellation flows parent → child only and is never awaited
//! - No retries: a lost task is simply counted

pub mod deadline;
pub mod selector;
pub mod source;
pub mod task;
pub mod types;

pub use deadline::{BudgetError, Deadline};
pub use selector::RaceSelector;
pub use source::{Decoder, Fetcher, SourceDescriptor};
pub use task::BoundedTask;
pub use types::{Loss, Outcome, RaceError, RaceWin, SourceLoss, TaskError};
