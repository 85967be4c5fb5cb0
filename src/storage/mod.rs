//! Persistence of race winners.
//!
//! # Design Decisions
//! - Insert-only: records are never read back by the pipeline
//! - Writes take a cancellation token and must stop when it fires
//! - The creation timestamp is assigned by the store, not the caller

pub mod sqlite;

use std::future::Future;
use tokio_util::sync::CancellationToken;

use crate::race::TaskError;
use crate::sources::Quote;

pub use sqlite::{SqliteQuoteStore, StorageError};

/// Flattened projection of a quote as persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRecord {
    pub bid: String,
    pub code: String,
    pub codein: String,
    pub name: String,
}

impl From<&Quote> for QuoteRecord {
    fn from(quote: &Quote) -> Self {
        Self {
            bid: quote.bid.clone(),
            code: quote.code.clone(),
            codein: quote.codein.clone(),
            name: quote.name.clone(),
        }
    }
}

/// Durable sink for winning quotes.
pub trait RecordStore: Clone + Send + Sync + 'static {
    fn write(
        &self,
        record: &QuoteRecord,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<(), TaskError>> + Send;
}
