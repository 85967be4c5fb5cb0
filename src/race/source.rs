//! Race contenders and the transport seam they are fetched through.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::race::types::TaskError;

/// Turns a raw response body into a typed value.
pub type Decoder<T> = Arc<dyn Fn(&[u8]) -> Result<T, TaskError> + Send + Sync>;

/// One candidate in a race: where to fetch and how to decode.
pub struct SourceDescriptor<T> {
    /// Name used in logs and metrics; should be unique within a race.
    pub name: String,
    /// Endpoint handed to the fetcher.
    pub endpoint: String,
    decode: Decoder<T>,
}

impl<T> SourceDescriptor<T> {
    pub fn new<F>(name: impl Into<String>, endpoint: impl Into<String>, decode: F) -> Self
    where
        F: Fn(&[u8]) -> Result<T, TaskError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            decode: Arc::new(decode),
        }
    }

    /// Decode a response body fetched from this source.
    pub fn decode(&self, body: &[u8]) -> Result<T, TaskError> {
        (self.decode)(body)
    }
}

impl<T> Clone for SourceDescriptor<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            endpoint: self.endpoint.clone(),
            decode: Arc::clone(&self.decode),
        }
    }
}

impl<T> fmt::Debug for SourceDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceDescriptor")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Outbound transport used by the race selector.
///
/// Implementations must return [`TaskError::Cancelled`] promptly once `cancel`
/// fires instead of running the request to completion.
pub trait Fetcher: Clone + Send + Sync + 'static {
    fn fetch(
        &self,
        endpoint: &str,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<Vec<u8>, TaskError>> + Send;
}
