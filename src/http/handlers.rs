//! Route handlers.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tokio::time::Instant;
use tracing::Instrument;

use crate::http::request::invocation_id;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::pipeline::{PipelineError, QuotePipeline};
use crate::race::RaceError;

/// `GET /cotacao`: race the configured sources and answer with the winning bid.
pub async fn quote_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let started = Instant::now();
    let span = tracing::info_span!("pipeline", invocation_id = %invocation_id(&headers));

    let pipeline = QuotePipeline::new(
        state.settings.load_full(),
        state.fetcher.clone(),
        state.store.clone(),
    );

    let response = match pipeline.handle().instrument(span.clone()).await {
        Ok(result) => {
            span.in_scope(|| {
                tracing::info!(
                    source = %result.source,
                    bid = %result.quote.bid,
                    persisted = result.persisted.label(),
                    "Quote served"
                );
            });
            (StatusCode::OK, Json(result.quote.bid)).into_response()
        }
        Err(PipelineError::Race(e)) => {
            let status = race_status(&e);
            span.in_scope(|| tracing::warn!(status = status.as_u16(), error = %e, "Quote unavailable"));
            (status, e.to_string()).into_response()
        }
    };

    metrics::record_request(response.status().as_u16(), started.elapsed());
    response
}

/// `GET /health`: liveness only; upstream sources are not probed and no
/// request metrics are recorded.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// HTTP status for a failed race.
pub fn race_status(error: &RaceError) -> StatusCode {
    match error {
        RaceError::AllSourcesFailed { .. } | RaceError::NoSources => StatusCode::BAD_GATEWAY,
        RaceError::DeadlineExceeded(_) => StatusCode::GATEWAY_TIMEOUT,
        RaceError::Budget(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
