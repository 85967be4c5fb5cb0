//! Quote client subsystem.
//!
//! # Data Flow
//! ```text
//! QuoteClient::fetch_quote (outer bounded task, client budget)
//!     → GET server /cotacao
//!     → JSON string bid
//!     → ledger.rs (append "Dólar: {bid}")
//! ```
//!
//! The client budget is larger than the server's request budget, so a
//! server-side timeout arrives as a 504 and is reported differently from
//! the client giving up on its own.

pub mod fetch;
pub mod ledger;

pub use fetch::{ClientError, QuoteClient};
pub use ledger::append_quote;
