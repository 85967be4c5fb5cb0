//! SQLite-backed quote store.
//!
//! Every write opens its own connection so that cancelling one write can
//! interrupt exactly that statement and nothing else. A write whose future
//! is dropped (deadline or cancellation) is abandoned: its statement is
//! interrupted and its transaction rolls back instead of committing.

use rusqlite::{params, Connection, InterruptHandle};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::race::TaskError;
use crate::storage::{QuoteRecord, RecordStore};

const SCHEMA: &str = r"
    CREATE TABLE IF NOT EXISTS cotacoes (
        id INTEGER PRIMARY KEY,
        bid NUMERIC NOT NULL,
        code TEXT NOT NULL,
        codein TEXT NOT NULL,
        name TEXT NOT NULL,
        created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
    );
";

const INSERT: &str = "INSERT INTO cotacoes (bid, code, codein, name) VALUES (?1, ?2, ?3, ?4)";

/// Lock waits are kept short; the caller's budget is usually tens of ms.
const BUSY_TIMEOUT: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to open database {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to create schema: {0}")]
    Schema(#[source] rusqlite::Error),
}

/// Appends one row per winning quote to the `cotacoes` table.
#[derive(Debug, Clone)]
pub struct SqliteQuoteStore {
    path: PathBuf,
}

impl SqliteQuoteStore {
    /// Open (creating if needed) the database and its schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let conn = Self::connect(&path).map_err(|source| StorageError::Open {
            path: path.clone(),
            source,
        })?;
        conn.execute_batch(SCHEMA).map_err(StorageError::Schema)?;
        tracing::info!(path = %path.display(), "Quote store ready");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(path: &Path) -> rusqlite::Result<Connection> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }
}

/// Marks the insert abandoned and interrupts it unless disarmed first.
struct AbandonOnDrop {
    abandoned: Arc<AtomicBool>,
    interrupt: Option<InterruptHandle>,
}

impl AbandonOnDrop {
    fn disarm(mut self) {
        self.interrupt = None;
    }
}

impl Drop for AbandonOnDrop {
    fn drop(&mut self) {
        if let Some(interrupt) = self.interrupt.take() {
            self.abandoned.store(true, Ordering::SeqCst);
            interrupt.interrupt();
        }
    }
}

/// Runs on the blocking pool. Commits only if the caller is still waiting.
fn insert_record(
    conn: &mut Connection,
    record: &QuoteRecord,
    abandoned: &AtomicBool,
) -> Result<(), TaskError> {
    let storage = |e: rusqlite::Error| TaskError::Storage(e.to_string());

    if abandoned.load(Ordering::SeqCst) {
        return Err(TaskError::Cancelled);
    }
    let tx = conn.transaction().map_err(storage)?;
    tx.execute(
        INSERT,
        params![record.bid, record.code, record.codein, record.name],
    )
    .map_err(storage)?;

    // Dropping `tx` rolls the insert back.
    if abandoned.load(Ordering::SeqCst) {
        return Err(TaskError::Cancelled);
    }
    tx.commit().map_err(storage)
}

impl RecordStore for SqliteQuoteStore {
    async fn write(&self, record: &QuoteRecord, cancel: CancellationToken) -> Result<(), TaskError> {
        if cancel.is_cancelled() {
            return Err(TaskError::Cancelled);
        }

        let mut conn = Self::connect(&self.path).map_err(|e| TaskError::Storage(e.to_string()))?;
        let abandoned = Arc::new(AtomicBool::new(false));
        let guard = AbandonOnDrop {
            abandoned: abandoned.clone(),
            interrupt: Some(conn.get_interrupt_handle()),
        };
        let record = record.clone();

        let mut insert =
            tokio::task::spawn_blocking(move || insert_record(&mut conn, &record, &abandoned));

        tokio::select! {
            biased;
            joined = &mut insert => {
                guard.disarm();
                joined.map_err(|e| TaskError::Storage(e.to_string()))?
            }
            _ = cancel.cancelled() => {
                drop(guard);
                tracing::debug!(path = %self.path.display(), "Quote insert interrupted");
                Err(TaskError::Cancelled)
            }
        }
    }
}
