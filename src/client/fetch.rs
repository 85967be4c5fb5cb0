//! Quote client with its own outer budget.

use std::time::Duration;
use thiserror::Error;

use crate::config::{ClientConfig, UpstreamConfig};
use crate::race::{BoundedTask, BudgetError, Fetcher, Outcome, TaskError};
use crate::sources::HttpFetcher;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server did not answer within the client's budget.
    #[error("no response within the client's own budget of {}ms", .0.as_millis())]
    BudgetExceeded(Duration),

    /// The server answered with an error status, e.g. its own 504.
    #[error("server responded with status {status}")]
    Server { status: u16 },

    #[error("request failed: {0}")]
    Request(TaskError),

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("invalid budget: {0}")]
    Budget(#[from] BudgetError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fetches the current bid from a quote server.
#[derive(Debug, Clone)]
pub struct QuoteClient<F = HttpFetcher> {
    fetcher: F,
    url: String,
    budget: Duration,
}

impl QuoteClient<HttpFetcher> {
    pub fn from_config(client: &ClientConfig, upstream: &UpstreamConfig) -> Result<Self, ClientError> {
        let fetcher =
            HttpFetcher::new(upstream).map_err(|e| ClientError::Request(TaskError::from(e)))?;
        Ok(Self::new(fetcher, client.server_url.clone(), client.budget()))
    }
}

impl<F: Fetcher> QuoteClient<F> {
    pub fn new(fetcher: F, url: impl Into<String>, budget: Duration) -> Self {
        Self {
            fetcher,
            url: url.into(),
            budget,
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Request the bid, giving up once the client budget elapses.
    pub async fn fetch_quote(&self) -> Result<String, ClientError> {
        let task = BoundedTask::new(self.budget)?;
        let body = match task.run(|cancel| self.fetcher.fetch(&self.url, cancel)).await {
            Outcome::Success(body) => body,
            Outcome::Failure(TaskError::Status(status)) => {
                return Err(ClientError::Server { status });
            }
            Outcome::Failure(e) => return Err(ClientError::Request(e)),
            Outcome::TimedOut => return Err(ClientError::BudgetExceeded(self.budget)),
        };

        let bid: String =
            serde_json::from_slice(&body).map_err(|e| ClientError::Decode(e.to_string()))?;
        tracing::debug!(url = %self.url, bid = %bid, "Quote received");
        Ok(bid)
    }
}
