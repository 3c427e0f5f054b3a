//! Framework registration decorators (routes, CLI commands, tasks, signal
//! receivers, validators).

use super::{Candidate, Heuristic};
use common::wisdom::FRAMEWORK_DECORATORS;
use common::EntryPoint;

pub struct FrameworkDecoratorHeuristic;

impl Heuristic for FrameworkDecoratorHeuristic {
    fn apply(&self, candidate: &Candidate<'_>) -> Option<EntryPoint> {
        candidate
            .decorators
            .iter()
            .any(|d| FRAMEWORK_DECORATORS.matches(d))
            .then_some(EntryPoint::FrameworkDecorator)
    }
}
