//! Concrete race contenders.
//!
//! # Data Flow
//! ```text
//! config / CLI args
//!     → quote.rs, address.rs (SourceDescriptor per upstream + decoder)
//!     → http.rs (HttpFetcher, the transport the selector drives)
//! ```

pub mod address;
pub mod http;
pub mod quote;

pub use address::{cep_sources, Address};
pub use http::HttpFetcher;
pub use quote::{awesomeapi_source, Quote};
