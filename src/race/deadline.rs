//! Absolute deadlines derived from time budgets.
//!
//! A [`Deadline`] is computed once, top-down, at every boundary and handed to
//! the layer below as plain data. A nested budget is derived with
//! [`Deadline::child`], which refuses to outlive its parent.

use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// Errors raised while deriving a deadline from a budget.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BudgetError {
    /// A budget of zero can never be met.
    #[error("budget must be greater than zero")]
    Zero,

    /// The requested child budget does not fit in the parent's remaining time.
    #[error("budget of {requested:?} exceeds the {remaining:?} left on the enclosing deadline")]
    ExceedsParent {
        requested: Duration,
        remaining: Duration,
    },
}

/// An absolute point in time a unit of work must finish by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
    budget: Duration,
}

impl Deadline {
    /// Deadline `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
            budget,
        }
    }

    /// Derive a nested deadline that must expire no later than `self`.
    ///
    /// Fails if the budget is zero or larger than the time left on `self`.
    pub fn child(&self, budget: Duration) -> Result<Deadline, BudgetError> {
        if budget.is_zero() {
            return Err(BudgetError::Zero);
        }
        let now = Instant::now();
        let remaining = self.at.saturating_duration_since(now);
        if budget > remaining {
            return Err(BudgetError::ExceedsParent {
                requested: budget,
                remaining,
            });
        }
        Ok(Deadline {
            at: now + budget,
            budget,
        })
    }

    /// `budget` cut down to whatever is left on this deadline.
    pub fn clamp(&self, budget: Duration) -> Duration {
        budget.min(self.remaining())
    }

    /// Time left before expiry, zero once expired.
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.at
    }

    /// The instant this deadline expires.
    pub fn instant(&self) -> Instant {
        self.at
    }

    /// The budget this deadline was created with.
    pub fn budget(&self) -> Duration {
        self.budget
    }
}
