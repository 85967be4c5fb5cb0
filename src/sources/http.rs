//! reqwest-backed fetcher.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::UpstreamConfig;
use crate::race::{Fetcher, TaskError};

/// Issues GET requests with a shared reqwest client.
///
/// Only the bounded task decides when to give up; the client itself carries
/// no request timeout.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(Duration::from_millis(config.connect_ms));
        if !config.system_proxy {
            builder = builder.no_proxy();
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    async fn get(&self, endpoint: &str) -> Result<Vec<u8>, TaskError> {
        let response = self.client.get(endpoint).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TaskError::Status(status.as_u16()));
        }
        let body = response.bytes().await?;
        Ok(body.to_vec())
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, endpoint: &str, cancel: CancellationToken) -> Result<Vec<u8>, TaskError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TaskError::Cancelled),
            result = self.get(endpoint) => result,
        }
    }
}
