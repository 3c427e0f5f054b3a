use crate::DetectorKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cap on enumerated cycles; dense call graphs have exponentially many.
pub const DEFAULT_MAX_CYCLES: usize = 1000;

/// Knobs of one analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub detectors: Vec<DetectorKind>,
    /// Wall-clock budget; `None` runs to completion.
    pub time_budget_ms: Option<u64>,
    pub max_cycles: usize,
    /// Fan parsing and dependency analysis out over the rayon pool.
    pub parallel: bool,
    /// Match call names against classes as well as functions.
    pub resolve_constructor_calls: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            detectors: DetectorKind::ALL.to_vec(),
            time_budget_ms: None,
            max_cycles: DEFAULT_MAX_CYCLES,
            parallel: true,
            resolve_constructor_calls: true,
        }
    }
}

impl AnalysisConfig {
    pub fn time_budget(&self) -> Option<Duration> {
        self.time_budget_ms.map(Duration::from_millis)
    }
}
