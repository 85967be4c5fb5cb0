//! Race selector: first success wins, everything else is cancelled.
//!
//! # Commit rule
//! Completions are consumed by the selector alone, so exactly one winner is
//! ever committed. When several successes are already complete by the time
//! the first one is observed, the lowest source index wins. Losers that
//! finish after the commit are detached and their outcomes dropped.
//!
//! # Termination
//! ```text
//! first Success              → RaceWin (siblings cancelled)
//! every task lost            → AllSourcesFailed (no waiting for the deadline)
//! outer deadline, no winner  → DeadlineExceeded (siblings cancelled)
//! ```

use std::collections::HashMap;
use std::time::Duration;
use tokio::task::{Id, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::observability::metrics;
use crate::race::deadline::{BudgetError, Deadline};
use crate::race::source::{Fetcher, SourceDescriptor};
use crate::race::task::BoundedTask;
use crate::race::types::{Loss, Outcome, RaceError, RaceWin, SourceLoss, TaskError};

/// Runs one bounded fetch per source against a shared outer deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaceSelector {
    per_task_budget: Duration,
    outer_budget: Duration,
}

impl RaceSelector {
    /// Both budgets must be non-zero. A per-task budget larger than the outer
    /// budget is allowed; it is clamped to the time left when tasks launch.
    pub fn new(per_task_budget: Duration, outer_budget: Duration) -> Result<Self, BudgetError> {
        if per_task_budget.is_zero() || outer_budget.is_zero() {
            return Err(BudgetError::Zero);
        }
        Ok(Self {
            per_task_budget,
            outer_budget,
        })
    }

    pub fn per_task_budget(&self) -> Duration {
        self.per_task_budget
    }

    pub fn outer_budget(&self) -> Duration {
        self.outer_budget
    }

    /// Race `sources` with a fresh outer deadline.
    pub async fn select<T, F>(
        &self,
        sources: &[SourceDescriptor<T>],
        fetcher: &F,
    ) -> Result<RaceWin<T>, RaceError>
    where
        T: Send + 'static,
        F: Fetcher,
    {
        self.select_until(Deadline::after(self.outer_budget), sources, fetcher)
            .await
    }

    /// Race `sources` under an enclosing deadline; the outer budget must fit
    /// in whatever `parent` has left.
    pub async fn select_under<T, F>(
        &self,
        parent: &Deadline,
        sources: &[SourceDescriptor<T>],
        fetcher: &F,
    ) -> Result<RaceWin<T>, RaceError>
    where
        T: Send + 'static,
        F: Fetcher,
    {
        let outer = parent.child(self.outer_budget)?;
        self.select_until(outer, sources, fetcher).await
    }

    async fn select_until<T, F>(
        &self,
        outer: Deadline,
        sources: &[SourceDescriptor<T>],
        fetcher: &F,
    ) -> Result<RaceWin<T>, RaceError>
    where
        T: Send + 'static,
        F: Fetcher,
    {
        if sources.is_empty() {
            return Err(RaceError::NoSources);
        }

        let started = Instant::now();
        let cancel = CancellationToken::new();
        let mut tasks = JoinSet::new();
        let mut indices: HashMap<Id, usize> = HashMap::with_capacity(sources.len());

        for (index, source) in sources.iter().enumerate() {
            let task = match BoundedTask::new(outer.clamp(self.per_task_budget)) {
                Ok(task) => task.with_parent(&cancel),
                Err(_) => break,
            };
            let source = source.clone();
            let fetcher = fetcher.clone();
            let handle = tasks.spawn(async move {
                task.run(move |token| async move {
                    let body = fetcher.fetch(&source.endpoint, token).await?;
                    source.decode(&body)
                })
                .await
            });
            indices.insert(handle.id(), index);
        }

        let result = self
            .collect(&mut tasks, &indices, sources, outer, started)
            .await;

        // Fire-and-forget: losers observe the token and finish on their own.
        cancel.cancel();
        tasks.detach_all();

        match &result {
            Ok(win) => {
                tracing::info!(
                    source = %win.winner.name,
                    index = win.index,
                    elapsed_ms = win.elapsed.as_millis() as u64,
                    "Race won"
                );
                metrics::record_race("won", win.elapsed);
            }
            Err(e) => {
                tracing::warn!(error = %e, elapsed_ms = started.elapsed().as_millis() as u64, "Race lost");
                metrics::record_race(e.label(), started.elapsed());
            }
        }
        result
    }

    /// Consume completions until one wins, all lose, or the deadline passes.
    async fn collect<T>(
        &self,
        tasks: &mut JoinSet<Outcome<T>>,
        indices: &HashMap<Id, usize>,
        sources: &[SourceDescriptor<T>],
        outer: Deadline,
        started: Instant,
    ) -> Result<RaceWin<T>, RaceError>
    where
        T: Send + 'static,
    {
        let mut losses = Vec::new();

        loop {
            let joined = tokio::select! {
                biased;
                _ = tokio::time::sleep_until(outer.instant()) => {
                    return Err(RaceError::DeadlineExceeded(outer.budget()));
                }
                joined = tasks.join_next_with_id() => joined,
            };

            let Some(joined) = joined else {
                // Every contender has reported and none succeeded. A task
                // whose budget was clamped to the outer deadline times out
                // together with it; report that as the race deadline.
                if outer.is_expired() {
                    return Err(RaceError::DeadlineExceeded(outer.budget()));
                }
                return Err(RaceError::AllSourcesFailed { losses });
            };

            let Some((index, outcome)) = resolve(joined, indices, sources, &mut losses) else {
                continue;
            };

            match outcome {
                Outcome::Success(value) => {
                    let (index, value) = self.break_tie(tasks, indices, sources, index, value, &mut losses);
                    return Ok(RaceWin {
                        winner: sources[index].clone(),
                        index,
                        value,
                        elapsed: started.elapsed(),
                    });
                }
                Outcome::Failure(e) => record_loss(&mut losses, index, sources, Loss::Failed(e)),
                Outcome::TimedOut => record_loss(&mut losses, index, sources, Loss::TimedOut),
            }
        }
    }

    /// Among successes that are already complete, keep the lowest index.
    fn break_tie<T>(
        &self,
        tasks: &mut JoinSet<Outcome<T>>,
        indices: &HashMap<Id, usize>,
        sources: &[SourceDescriptor<T>],
        mut index: usize,
        mut value: T,
        losses: &mut Vec<SourceLoss>,
    ) -> (usize, T)
    where
        T: Send + 'static,
    {
        while let Some(joined) = tasks.try_join_next_with_id() {
            let Some((other, outcome)) = resolve(joined, indices, sources, losses) else {
                continue;
            };
            match outcome {
                Outcome::Success(other_value) if other < index => {
                    tracing::debug!(
                        kept = %sources[other].name,
                        dropped = %sources[index].name,
                        "Simultaneous successes, lower index wins"
                    );
                    index = other;
                    value = other_value;
                }
                Outcome::Success(_) => {}
                Outcome::Failure(e) => record_loss(losses, other, sources, Loss::Failed(e)),
                Outcome::TimedOut => record_loss(losses, other, sources, Loss::TimedOut),
            }
        }
        (index, value)
    }
}

type Joined<T> = Result<(Id, Outcome<T>), tokio::task::JoinError>;

/// Map a join result back to its source index. Panicked tasks count as losses.
fn resolve<T>(
    joined: Joined<T>,
    indices: &HashMap<Id, usize>,
    sources: &[SourceDescriptor<T>],
    losses: &mut Vec<SourceLoss>,
) -> Option<(usize, Outcome<T>)> {
    match joined {
        Ok((id, outcome)) => indices.get(&id).map(|&index| (index, outcome)),
        Err(e) => {
            if let Some(&index) = indices.get(&e.id()) {
                let cause = TaskError::Transport(format!("task aborted: {}", e));
                record_loss(losses, index, sources, Loss::Failed(cause));
            }
            None
        }
    }
}

fn record_loss<T>(
    losses: &mut Vec<SourceLoss>,
    index: usize,
    sources: &[SourceDescriptor<T>],
    loss: Loss,
) {
    let source = &sources[index];
    tracing::debug!(source = %source.name, index, cause = %loss, "Source lost");
    metrics::record_source_loss(&source.name, loss.kind());
    losses.push(SourceLoss {
        index,
        source: source.name.clone(),
        loss,
    });
}
