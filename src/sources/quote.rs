//! Exchange-rate quotes in the AwesomeAPI layout.
//!
//! ```json
//! {"USDBRL": {"code": "USD", "codein": "BRL", "name": "Dólar Americano/Real Brasileiro", "bid": "5.2341", ...}}
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::race::{SourceDescriptor, TaskError};

/// One currency quote. Extra upstream fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Bid price, kept as the upstream's decimal string.
    pub bid: String,
    /// Base currency code, e.g. `USD`.
    pub code: String,
    /// Counter currency code, e.g. `BRL`.
    pub codein: String,
    /// Display name of the pair.
    pub name: String,
}

/// Decode the entry for `pair` (e.g. `USDBRL`) from an AwesomeAPI body.
pub fn decode_awesomeapi(pair: &str, body: &[u8]) -> Result<Quote, TaskError> {
    let mut entries: HashMap<String, serde_json::Value> = serde_json::from_slice(body)?;
    let entry = entries
        .remove(pair)
        .ok_or_else(|| TaskError::Decode(format!("missing pair {}", pair)))?;
    let quote: Quote = serde_json::from_value(entry)?;

    if quote.bid.trim().parse::<f64>().is_err() {
        return Err(TaskError::Decode(format!("non-numeric bid {:?}", quote.bid)));
    }
    Ok(quote)
}

/// Build a race contender for an AwesomeAPI-compatible endpoint.
pub fn awesomeapi_source(
    name: impl Into<String>,
    endpoint: impl Into<String>,
    pair: impl Into<String>,
) -> SourceDescriptor<Quote> {
    let pair = pair.into();
    SourceDescriptor::new(name, endpoint, move |body: &[u8]| decode_awesomeapi(&pair, body))
}
