//! Wall-clock budget shared by every stage of one analysis run.

use crate::AnalysisError;
use std::time::{Duration, Instant};

/// A start instant plus an optional allowance.
///
/// Long loops call [`Deadline::check`] periodically and bail out with
/// [`AnalysisError::BudgetExceeded`] once the allowance is spent.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: Instant,
    budget: Option<Duration>,
}

impl Deadline {
    pub fn new(budget: Option<Duration>) -> Self {
        Self {
            start: Instant::now(),
            budget,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn is_exceeded(&self) -> bool {
        match self.budget {
            Some(budget) => self.start.elapsed() >= budget,
            None => false,
        }
    }

    pub fn check(&self) -> Result<(), AnalysisError> {
        match self.budget {
            Some(budget) if self.start.elapsed() >= budget => Err(AnalysisError::BudgetExceeded(budget)),
            _ => Ok(()),
        }
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::unbounded()
    }
}
