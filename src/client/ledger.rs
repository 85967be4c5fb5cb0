//! Append-only quote ledger.

use std::path::Path;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::client::fetch::ClientError;

/// Append `Dólar: {bid}` to `path`, creating the file if needed.
pub async fn append_quote(path: impl AsRef<Path>, bid: &str) -> Result<(), ClientError> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path.as_ref())
        .await?;
    file.write_all(format!("Dólar: {}\n", bid).as_bytes()).await?;
    file.flush().await?;
    Ok(())
}
