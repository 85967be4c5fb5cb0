//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, graceful shutdown)
//!     → request.rs (request ID = pipeline invocation ID)
//!     → handlers.rs (run the quote pipeline, map race failures to 502/504)
//!     → JSON string body with the winning bid
//! ```

pub mod handlers;
pub mod request;
pub mod server;

pub use request::{invocation_id, MakeInvocationId, X_REQUEST_ID};
pub use server::{apply_reload, AppState, HttpServer, ReloadError, ServerError};
