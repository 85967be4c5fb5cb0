//! Race, then persist under an independent sub-budget.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::ServerConfig;
use crate::observability::metrics;
use crate::pipeline::types::{
    PersistStatus, PersistenceError, PipelineError, PipelineResponse, PipelineState,
};
use crate::race::{BoundedTask, BudgetError, Deadline, Fetcher, Outcome, RaceSelector, SourceDescriptor};
use crate::sources::{awesomeapi_source, Quote};
use crate::storage::{QuoteRecord, RecordStore};

/// Budgets and contenders for one pipeline, rebuilt on config reload.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Enclosing budget of the whole invocation.
    pub request_budget: Duration,
    pub race: RaceSelector,
    /// Fixed persistence budget, independent of the race budgets.
    pub persist_budget: Duration,
    pub sources: Vec<SourceDescriptor<Quote>>,
}

impl PipelineSettings {
    pub fn from_config(config: &ServerConfig) -> Result<Self, BudgetError> {
        let request_budget = config.timeouts.request_budget();
        if request_budget.is_zero() {
            return Err(BudgetError::Zero);
        }
        let race = RaceSelector::new(config.race.per_task_budget(), config.race.outer_budget())?;
        let persist_budget = config.persistence.budget();
        if persist_budget.is_zero() {
            return Err(BudgetError::Zero);
        }

        let sources = config
            .sources
            .iter()
            .map(|s| awesomeapi_source(s.name.clone(), s.endpoint.clone(), s.pair.clone()))
            .collect();

        Ok(Self {
            request_budget,
            race,
            persist_budget,
            sources,
        })
    }
}

/// One composition of race + optional persistence.
pub struct QuotePipeline<F, S> {
    settings: Arc<PipelineSettings>,
    fetcher: F,
    store: Option<S>,
}

impl<F, S> QuotePipeline<F, S>
where
    F: Fetcher,
    S: RecordStore,
{
    pub fn new(settings: Arc<PipelineSettings>, fetcher: F, store: Option<S>) -> Self {
        Self {
            settings,
            fetcher,
            store,
        }
    }

    /// Run under a fresh request deadline.
    pub async fn handle(&self) -> Result<PipelineResponse, PipelineError> {
        let request = Deadline::after(self.settings.request_budget);
        self.handle_within(&request).await
    }

    /// Run under an enclosing deadline supplied by the caller.
    pub async fn handle_within(&self, request: &Deadline) -> Result<PipelineResponse, PipelineError> {
        let mut state = Transitions::new();
        state.advance(PipelineState::Racing);

        let win = match self
            .settings
            .race
            .select_under(request, &self.settings.sources, &self.fetcher)
            .await
        {
            Ok(win) => {
                state.advance(PipelineState::RaceWon);
                win
            }
            Err(e) => {
                state.advance(PipelineState::RaceLost);
                state.advance(PipelineState::Done);
                return Err(e.into());
            }
        };

        let persisted = match &self.store {
            Some(store) => {
                state.advance(PipelineState::Persisting);
                self.persist(store, &win.value).await
            }
            None => PersistStatus::Skipped,
        };
        state.advance(PipelineState::Done);

        Ok(PipelineResponse {
            quote: win.value,
            source: win.winner.name,
            persisted,
        })
    }

    async fn persist(&self, store: &S, quote: &Quote) -> PersistStatus {
        let budget = self.settings.persist_budget;
        let task = match BoundedTask::new(budget) {
            Ok(task) => task,
            Err(e) => {
                tracing::error!(error = %e, "Persistence skipped");
                return PersistStatus::Failed(PersistenceError::DeadlineExceeded(budget));
            }
        };

        let record = QuoteRecord::from(quote);
        let started = Instant::now();
        let status = match task.run(|cancel| store.write(&record, cancel)).await {
            Outcome::Success(()) => PersistStatus::Stored,
            Outcome::Failure(e) => {
                tracing::warn!(error = %e, "Failed to persist quote");
                PersistStatus::Failed(PersistenceError::Store(e))
            }
            Outcome::TimedOut => {
                tracing::warn!(budget_ms = budget.as_millis() as u64, "Persisting quote exceeded its budget");
                PersistStatus::Failed(PersistenceError::DeadlineExceeded(budget))
            }
        };
        metrics::record_persistence(status.label(), started.elapsed());
        status
    }
}

/// Checked walk through [`PipelineState`].
struct Transitions {
    current: PipelineState,
}

impl Transitions {
    fn new() -> Self {
        Self {
            current: PipelineState::Started,
        }
    }

    fn advance(&mut self, next: PipelineState) {
        debug_assert!(
            self.current.can_transition_to(next),
            "invalid pipeline transition {} -> {}",
            self.current,
            next
        );
        tracing::trace!(from = %self.current, to = %next, "Pipeline transition");
        self.current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::race::{RaceError, TaskError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_util::sync::CancellationToken;

    const QUOTE_A: &str = r#"{"USDBRL":{"code":"USD","codein":"BRL","name":"Dólar Americano/Real Brasileiro","bid":"5.23"}}"#;
    const QUOTE_B: &str = r#"{"USDBRL":{"code":"USD","codein":"BRL","name":"Dólar Americano/Real Brasileiro","bid":"5.25"}}"#;

    /// Each endpoint answers its body after a delay, or fails immediately.
    #[derive(Clone)]
    struct StubFetcher {
        routes: Arc<Vec<(&'static str, u64, Option<&'static str>)>>,
    }

    impl Fetcher for StubFetcher {
        async fn fetch(&self, endpoint: &str, cancel: CancellationToken) -> Result<Vec<u8>, TaskError> {
            let (_, delay, body) = *self
                .routes
                .iter()
                .find(|(e, _, _)| *e == endpoint)
                .expect("unknown endpoint");
            tokio::select! {
                _ = cancel.cancelled() => Err(TaskError::Cancelled),
                _ = tokio::time::sleep(Duration::from_millis(delay)) => match body {
                    Some(body) => Ok(body.as_bytes().to_vec()),
                    None => Err(TaskError::Transport("connection refused".into())),
                },
            }
        }
    }

    /// Store that takes `delay_ms` per write and counts completed writes.
    #[derive(Clone, Default)]
    struct SlowStore {
        delay_ms: u64,
        fail: bool,
        writes: Arc<AtomicUsize>,
        attempts: Arc<AtomicUsize>,
    }

    impl RecordStore for SlowStore {
        async fn write(&self, _record: &QuoteRecord, cancel: CancellationToken) -> Result<(), TaskError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            tokio::select! {
                _ = cancel.cancelled() => Err(TaskError::Cancelled),
                _ = tokio::time::sleep(Duration::from_millis(self.delay_ms)) => {
                    if self.fail {
                        return Err(TaskError::Storage("disk full".into()));
                    }
                    self.writes.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }
        }
    }

    fn settings(routes: &[(&'static str, u64, Option<&'static str>)], race_ms: u64, persist_ms: u64) -> (Arc<PipelineSettings>, StubFetcher) {
        let sources = routes
            .iter()
            .map(|(endpoint, _, _)| awesomeapi_source(*endpoint, *endpoint, "USDBRL"))
            .collect();
        let settings = PipelineSettings {
            request_budget: Duration::from_millis(race_ms + persist_ms + 50),
            race: RaceSelector::new(Duration::from_millis(race_ms), Duration::from_millis(race_ms)).unwrap(),
            persist_budget: Duration::from_millis(persist_ms),
            sources,
        };
        let fetcher = StubFetcher {
            routes: Arc::new(routes.to_vec()),
        };
        (Arc::new(settings), fetcher)
    }

    #[tokio::test(start_paused = true)]
    async fn test_race_won_and_persisted() {
        let (settings, fetcher) = settings(&[("a", 50, Some(QUOTE_A)), ("b", 90, Some(QUOTE_B))], 1000, 10);
        let store = SlowStore::default();

        let response = QuotePipeline::new(settings, fetcher, Some(store.clone()))
            .handle()
            .await
            .unwrap();

        assert_eq!(response.quote.bid, "5.23");
        assert_eq!(response.source, "a");
        assert_eq!(response.persisted, PersistStatus::Stored);
        assert_eq!(store.writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_persistence_keeps_value() {
        let (settings, fetcher) = settings(&[("a", 50, Some(QUOTE_A))], 200, 10);
        let store = SlowStore {
            delay_ms: 50,
            ..SlowStore::default()
        };

        let response = QuotePipeline::new(settings, fetcher, Some(store.clone()))
            .handle()
            .await
            .unwrap();

        assert_eq!(response.quote.bid, "5.23");
        assert_eq!(
            response.persisted,
            PersistStatus::Failed(PersistenceError::DeadlineExceeded(Duration::from_millis(10)))
        );
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_error_keeps_value() {
        let (settings, fetcher) = settings(&[("a", 5, Some(QUOTE_A))], 200, 10);
        let store = SlowStore {
            fail: true,
            ..SlowStore::default()
        };

        let response = QuotePipeline::new(settings, fetcher, Some(store))
            .handle()
            .await
            .unwrap();
        assert_eq!(response.quote.bid, "5.23");
        assert_eq!(
            response.persisted,
            PersistStatus::Failed(PersistenceError::Store(TaskError::Storage("disk full".into())))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_race_lost_persists_nothing() {
        let (settings, fetcher) = settings(&[("a", 0, None), ("b", 0, None)], 1000, 10);
        let store = SlowStore::default();

        let err = QuotePipeline::new(settings, fetcher, Some(store.clone()))
            .handle()
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Race(RaceError::AllSourcesFailed { .. })));
        assert_eq!(store.attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_without_store() {
        let (settings, fetcher) = settings(&[("a", 5, Some(QUOTE_A))], 200, 10);
        let response = QuotePipeline::new(settings, fetcher, None::<SlowStore>)
            .handle()
            .await
            .unwrap();
        assert_eq!(response.persisted, PersistStatus::Skipped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_race_budget_must_fit_request() {
        let (settings, fetcher) = settings(&[("a", 5, Some(QUOTE_A))], 200, 10);
        let request = Deadline::after(Duration::from_millis(100));

        let err = QuotePipeline::new(settings, fetcher, None::<SlowStore>)
            .handle_within(&request)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Race(RaceError::Budget(BudgetError::ExceedsParent { .. }))
        ));
    }

    #[test]
    fn test_settings_from_default_config() {
        let settings = PipelineSettings::from_config(&ServerConfig::default()).unwrap();
        assert_eq!(settings.request_budget, Duration::from_millis(250));
        assert_eq!(settings.race.outer_budget(), Duration::from_millis(200));
        assert_eq!(settings.persist_budget, Duration::from_millis(10));
        assert_eq!(settings.sources.len(), 1);
    }
}
