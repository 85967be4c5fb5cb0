//! Configuration schema definitions.
//!
//! Every section has defaults so a minimal (or empty) TOML file is valid.
//! The defaults reproduce the reference budgets: 200ms race, 10ms
//! persistence, 250ms per inbound request, 300ms for the client.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Inbound request budget.
    pub timeouts: TimeoutConfig,

    /// Race budgets.
    pub race: RaceConfig,

    /// Quote sources raced on every request.
    pub sources: Vec<SourceConfig>,

    /// Outbound HTTP client settings.
    pub upstream: UpstreamConfig,

    /// Quote persistence.
    pub persistence: PersistenceConfig,

    /// Settings for the `quote-client` binary.
    pub client: ClientConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            timeouts: TimeoutConfig::default(),
            race: RaceConfig::default(),
            sources: vec![SourceConfig::default()],
            upstream: UpstreamConfig::default(),
            persistence: PersistenceConfig::default(),
            client: ClientConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total budget for one inbound request (race + persistence), in milliseconds.
    pub request_ms: u64,
}

impl TimeoutConfig {
    pub fn request_budget(&self) -> Duration {
        Duration::from_millis(self.request_ms)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_ms: 250 }
    }
}

/// Race budget configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RaceConfig {
    /// Budget of each individual fetch, in milliseconds.
    pub per_task_ms: u64,

    /// Budget of the whole race, in milliseconds.
    pub outer_ms: u64,
}

impl RaceConfig {
    pub fn per_task_budget(&self) -> Duration {
        Duration::from_millis(self.per_task_ms)
    }

    pub fn outer_budget(&self) -> Duration {
        Duration::from_millis(self.outer_ms)
    }
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            per_task_ms: 200,
            outer_ms: 200,
        }
    }
}

/// One AwesomeAPI-compatible quote source.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    /// Source identifier for logging/metrics.
    pub name: String,

    /// Full URL fetched with GET.
    pub endpoint: String,

    /// Key of the pair in the response body.
    #[serde(default = "default_pair")]
    pub pair: String,
}

fn default_pair() -> String {
    "USDBRL".to_string()
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            name: "awesomeapi".to_string(),
            endpoint: "https://economia.awesomeapi.com.br/json/last/USD-BRL".to_string(),
            pair: default_pair(),
        }
    }
}

/// Outbound HTTP client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// User-Agent header sent to sources.
    pub user_agent: String,

    /// TCP connect timeout in milliseconds. Task budgets still apply on top.
    pub connect_ms: u64,

    /// Honour HTTP(S)_PROXY environment variables.
    pub system_proxy: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("quote-race/", env!("CARGO_PKG_VERSION")).to_string(),
            connect_ms: 1000,
            system_proxy: true,
        }
    }
}

/// Persistence configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Store race winners.
    pub enabled: bool,

    /// SQLite database file.
    pub database_path: String,

    /// Budget of one write, in milliseconds.
    pub budget_ms: u64,
}

impl PersistenceConfig {
    pub fn budget(&self) -> Duration {
        Duration::from_millis(self.budget_ms)
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            database_path: "cotacoes.db".to_string(),
            budget_ms: 10,
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Full URL of the quote endpoint.
    pub server_url: String,

    /// Round-trip budget in milliseconds; must exceed the server's request budget.
    pub budget_ms: u64,

    /// File the received quote is appended to.
    pub output_path: String,
}

impl ClientConfig {
    pub fn budget(&self) -> Duration {
        Duration::from_millis(self.budget_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080/cotacao".to_string(),
            budget_ms: 300,
            output_path: "cotacao.txt".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Pretty for development, JSON for production.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
