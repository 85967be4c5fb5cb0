//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router (`/cotacao`, `/health`)
//! - Wire up middleware (request ID, tracing, request timeout)
//! - Open the quote store and the outbound HTTP client once
//! - Hot-swap pipeline settings on config reload
//! - Drain in-flight requests on shutdown

use arc_swap::ArcSwap;
use axum::{routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::http::handlers::{health, quote_handler};
use crate::http::request::MakeInvocationId;
use crate::lifecycle::shutdown;
use crate::pipeline::PipelineSettings;
use crate::race::BudgetError;
use crate::sources::HttpFetcher;
use crate::storage::{SqliteQuoteStore, StorageError};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<ArcSwap<PipelineSettings>>,
    pub fetcher: HttpFetcher,
    pub store: Option<SqliteQuoteStore>,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to open quote store: {0}")]
    Storage(#[from] StorageError),

    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid budget: {0}")]
    Budget(#[from] BudgetError),
}

/// Why a configuration revision was not applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReloadError {
    #[error("request budget change from {current:?} to {requested:?} requires a restart")]
    RequestBudgetChanged {
        current: Duration,
        requested: Duration,
    },

    #[error("invalid budget: {0}")]
    Budget(#[from] BudgetError),
}

/// HTTP server for the quote service.
pub struct HttpServer {
    router: Router,
    settings: Arc<ArcSwap<PipelineSettings>>,
    request_budget: Duration,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: &ServerConfig) -> Result<Self, ServerError> {
        let settings = Arc::new(ArcSwap::from_pointee(PipelineSettings::from_config(config)?));
        let fetcher = HttpFetcher::new(&config.upstream)?;
        let store = if config.persistence.enabled {
            Some(SqliteQuoteStore::open(&config.persistence.database_path)?)
        } else {
            tracing::info!("Persistence disabled");
            None
        };

        let state = AppState {
            settings: settings.clone(),
            fetcher,
            store,
        };
        let request_budget = config.timeouts.request_budget();
        let router = Self::build_router(request_budget, state);

        Ok(Self {
            router,
            settings,
            request_budget,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(request_budget: Duration, state: AppState) -> Router {
        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeInvocationId))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TimeoutLayer::new(request_budget));

        Router::new()
            .route("/cotacao", get(quote_handler))
            .route("/health", get(health))
            .with_state(state)
            .layer(middleware)
    }

    /// Run the server until `shutdown` fires, applying config revisions
    /// received on `config_updates` in the meantime.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ServerConfig>,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            request_budget_ms = self.request_budget.as_millis() as u64,
            "HTTP server starting"
        );

        let settings = self.settings.clone();
        let request_budget = self.request_budget;
        let reloader = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                match apply_reload(&settings, request_budget, &config) {
                    Ok(()) => tracing::info!(
                        sources = config.sources.len(),
                        "Configuration reloaded"
                    ),
                    Err(e) => tracing::warn!(error = %e, "Configuration reload rejected"),
                }
            }
        });

        let result = axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown::wait(shutdown_rx))
            .await;
        reloader.abort();

        tracing::info!("HTTP server stopped");
        result
    }
}

/// Swap in settings built from `config`, keeping the request budget fixed.
pub fn apply_reload(
    settings: &ArcSwap<PipelineSettings>,
    request_budget: Duration,
    config: &ServerConfig,
) -> Result<(), ReloadError> {
    let requested = config.timeouts.request_budget();
    if requested != request_budget {
        return Err(ReloadError::RequestBudgetChanged {
            current: request_budget,
            requested,
        });
    }
    settings.store(Arc::new(PipelineSettings::from_config(config)?));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceConfig;

    fn settings_for(config: &ServerConfig) -> ArcSwap<PipelineSettings> {
        ArcSwap::from_pointee(PipelineSettings::from_config(config).unwrap())
    }

    #[test]
    fn test_reload_swaps_sources_and_race_budgets() {
        let config = ServerConfig::default();
        let settings = settings_for(&config);

        let mut updated = config.clone();
        updated.race.outer_ms = 150;
        updated.sources.push(SourceConfig {
            name: "mirror".to_string(),
            endpoint: "http://127.0.0.1:9/json/last/USD-BRL".to_string(),
            pair: "USDBRL".to_string(),
        });

        apply_reload(&settings, config.timeouts.request_budget(), &updated).unwrap();
        let current = settings.load();
        assert_eq!(current.sources.len(), 2);
        assert_eq!(current.race.outer_budget(), Duration::from_millis(150));
    }

    #[test]
    fn test_reload_rejects_request_budget_change() {
        let config = ServerConfig::default();
        let settings = settings_for(&config);

        let mut updated = config.clone();
        updated.timeouts.request_ms = 500;
        updated.race.outer_ms = 400;

        let err = apply_reload(&settings, config.timeouts.request_budget(), &updated).unwrap_err();
        assert_eq!(
            err,
            ReloadError::RequestBudgetChanged {
                current: Duration::from_millis(250),
                requested: Duration::from_millis(500),
            }
        );
        assert_eq!(settings.load().race.outer_budget(), Duration::from_millis(200));
    }

    #[test]
    fn test_reload_rejects_zero_race_budget() {
        let config = ServerConfig::default();
        let settings = settings_for(&config);

        let mut updated = config.clone();
        updated.race.per_task_ms = 0;

        let err = apply_reload(&settings, config.timeouts.request_budget(), &updated).unwrap_err();
        assert_eq!(err, ReloadError::Budget(BudgetError::Zero));
        assert_eq!(settings.load().race.per_task_budget(), Duration::from_millis(200));
    }
}
