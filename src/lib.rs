//! Race-select quote service with cascading timeout budgets.

pub mod client;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pipeline;
pub mod race;
pub mod sources;
pub mod storage;

pub use config::schema::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use pipeline::QuotePipeline;
pub use race::{BoundedTask, Deadline, RaceSelector};
