//! # The Oracle: anomaly detection over the logic graph
//!
//! Four detectors, each a pure function of the assembled [`LogicGraph`]:
//!
//! | Detector | Issue kind | Severity |
//! |---|---|---|
//! | [`cycles::CycleDetector`] | `circular_dependency` | critical |
//! | [`orphans::OrphanDetector`] | `orphaned_code` | medium |
//! | [`missing_imports::MissingImportDetector`] | `missing_import` | high |
//! | [`inconsistent_api::InconsistentApiDetector`] | `inconsistent_api` | high |
//!
//! [`pipeline::run`] drives collection, assembly and detection end to end.

pub mod config;
pub mod cycles;
pub mod fixes;
pub mod inconsistent_api;
pub mod missing_imports;
pub mod orphans;
pub mod pipeline;

#[cfg(test)]
mod test_support;

pub use config::AnalysisConfig;
pub use pipeline::{analyze, analyze_paths, run, Analysis};

use anatomist::LogicGraph;
use common::{AnalysisError, Deadline, Issue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Selects a detector from the fixed registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    Cycle,
    Orphan,
    MissingImport,
    InconsistentApi,
}

impl DetectorKind {
    pub const ALL: [DetectorKind; 4] = [
        DetectorKind::Cycle,
        DetectorKind::Orphan,
        DetectorKind::MissingImport,
        DetectorKind::InconsistentApi,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DetectorKind::Cycle => "cycle",
            DetectorKind::Orphan => "orphan",
            DetectorKind::MissingImport => "missing_import",
            DetectorKind::InconsistentApi => "inconsistent_api",
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetectorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DetectorKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.trim())
            .ok_or_else(|| format!("unknown detector `{s}`"))
    }
}

/// Output of one detector run.
#[derive(Debug, Default)]
pub struct Detection {
    pub issues: Vec<Issue>,
    /// The detector stopped early (budget or enumeration cap).
    pub truncated: bool,
}

impl Detection {
    pub fn complete(issues: Vec<Issue>) -> Self {
        Self {
            issues,
            truncated: false,
        }
    }
}

/// A read-only pass over the logic graph.
pub trait Detector: Send + Sync {
    fn kind(&self) -> DetectorKind;

    fn detect(&self, graph: &LogicGraph, deadline: &Deadline) -> Result<Detection, AnalysisError>;
}

/// Instantiates the requested detectors in registry order, without duplicates.
pub fn registry(kinds: &[DetectorKind], config: &AnalysisConfig) -> Vec<Box<dyn Detector>> {
    DetectorKind::ALL
        .into_iter()
        .filter(|kind| kinds.contains(kind))
        .map(|kind| -> Box<dyn Detector> {
            match kind {
                DetectorKind::Cycle => Box::new(cycles::CycleDetector::new(config.max_cycles)),
                DetectorKind::Orphan => Box::new(orphans::OrphanDetector),
                DetectorKind::MissingImport => Box::new(missing_imports::MissingImportDetector),
                DetectorKind::InconsistentApi => Box::new(inconsistent_api::InconsistentApiDetector),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detector_kind_parsing() {
        assert_eq!("cycle".parse::<DetectorKind>(), Ok(DetectorKind::Cycle));
        assert_eq!(" missing_import".parse::<DetectorKind>(), Ok(DetectorKind::MissingImport));
        assert!("cycles".parse::<DetectorKind>().is_err());
    }

    #[test]
    fn test_registry_order_and_dedup() {
        let config = AnalysisConfig::default();
        let kinds = [DetectorKind::Orphan, DetectorKind::Cycle, DetectorKind::Orphan];
        let detectors = registry(&kinds, &config);
        let got: Vec<_> = detectors.iter().map(|d| d.kind()).collect();
        assert_eq!(got, vec![DetectorKind::Cycle, DetectorKind::Orphan]);
    }
}
