//! Bounded task: one operation under a hard, cancellable deadline.
//!
//! The deadline is fixed before the operation starts. The operation receives
//! a [`CancellationToken`] that fires when the deadline passes or when the
//! parent token is cancelled; on timeout the operation future is also
//! dropped, releasing whatever connection or write it held.

use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::race::deadline::{BudgetError, Deadline};
use crate::race::types::{Outcome, TaskError};

/// A unit of work bounded by a time budget.
#[derive(Debug, Clone)]
pub struct BoundedTask {
    budget: Duration,
    parent: Option<CancellationToken>,
}

impl BoundedTask {
    /// Create a task with a non-zero budget.
    pub fn new(budget: Duration) -> Result<Self, BudgetError> {
        if budget.is_zero() {
            return Err(BudgetError::Zero);
        }
        Ok(Self {
            budget,
            parent: None,
        })
    }

    /// Tie this task's cancellation to `parent`.
    pub fn with_parent(mut self, parent: &CancellationToken) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Run `operation` and report exactly one outcome.
    pub async fn run<T, F, Fut>(self, operation: F) -> Outcome<T>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, TaskError>>,
    {
        let deadline = Deadline::after(self.budget);
        let token = match &self.parent {
            Some(parent) => parent.child_token(),
            None => CancellationToken::new(),
        };

        let work = operation(token.clone());
        let outcome = tokio::select! {
            biased;
            result = work => match result {
                Ok(value) => Outcome::Success(value),
                Err(e) => Outcome::Failure(e),
            },
            _ = tokio::time::sleep_until(deadline.instant()) => Outcome::TimedOut,
        };

        // Anything the operation handed off (blocking writes, spawned I/O)
        // observes this and stops.
        token.cancel();
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    #[test]
    fn test_zero_budget_rejected() {
        assert_eq!(BoundedTask::new(Duration::ZERO).unwrap_err(), BudgetError::Zero);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_before_deadline() {
        let task = BoundedTask::new(Duration::from_millis(100)).unwrap();
        let outcome = task
            .run(|_| async {
                tokio::time::sleep(Duration::from_millis(40)).await;
                Ok::<_, TaskError>("5.23")
            })
            .await;
        assert_eq!(outcome, Outcome::Success("5.23"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_cause_preserved() {
        let task = BoundedTask::new(Duration::from_millis(100)).unwrap();
        let outcome: Outcome<()> = task
            .run(|_| async { Err(TaskError::Transport("connection refused".into())) })
            .await;
        assert_eq!(
            outcome,
            Outcome::Failure(TaskError::Transport("connection refused".into()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_cancels_operation() {
        let observed = Arc::new(AtomicBool::new(false));
        let seen = observed.clone();
        let task = BoundedTask::new(Duration::from_millis(200)).unwrap();
        let start = Instant::now();

        let outcome: Outcome<()> = task
            .run(|token| async move {
                let inner = token.clone();
                tokio::spawn(async move {
                    inner.cancelled().await;
                    seen.store(true, Ordering::SeqCst);
                });
                tokio::time::sleep(Duration::from_millis(250)).await;
                Ok(())
            })
            .await;

        assert_eq!(outcome, Outcome::TimedOut);
        assert_eq!(start.elapsed(), Duration::from_millis(200));

        tokio::task::yield_now().await;
        assert!(observed.load(Ordering::SeqCst), "operation should see cancellation");
    }

    #[tokio::test(start_paused = true)]
    async fn test_parent_cancellation_propagates() {
        let parent = CancellationToken::new();
        let task = BoundedTask::new(Duration::from_secs(1))
            .unwrap()
            .with_parent(&parent);

        let trigger = parent.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let outcome: Outcome<()> = task
            .run(|token| async move {
                token.cancelled().await;
                Err(TaskError::Cancelled)
            })
            .await;
        assert_eq!(outcome, Outcome::Failure(TaskError::Cancelled));
    }
}
