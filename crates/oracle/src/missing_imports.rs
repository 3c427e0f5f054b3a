//! # Missing-Import Detector
//!
//! Reports undefined name references that match a well-known module
//! (`json`, `os`, `np`, ...). Other undefined names are left alone; they
//! may be globals injected at runtime or typos the interpreter will catch.

use crate::{Detection, Detector, DetectorKind};
use anatomist::LogicGraph;
use common::wisdom::suggest_imports;
use common::{AnalysisError, Deadline, Issue, IssueKind, NodeKind, Severity};

const MISSING_IMPORT_CONFIDENCE: f64 = 0.8;

pub struct MissingImportDetector;

impl MissingImportDetector {
    /// Undefined references with no known import suggestion.
    pub fn unknown_undefined(graph: &LogicGraph) -> usize {
        graph
            .nodes()
            .filter(|n| n.is_undefined_reference() && suggest_imports(&n.name).is_none())
            .count()
    }
}

impl Detector for MissingImportDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::MissingImport
    }

    fn detect(&self, graph: &LogicGraph, _deadline: &Deadline) -> Result<Detection, AnalysisError> {
        let issues = graph
            .nodes()
            .filter(|n| n.kind == NodeKind::NameReference && n.is_undefined_reference())
            .filter_map(|node| {
                let suggestions = suggest_imports(&node.name)?;
                Some(Issue {
                    kind: IssueKind::MissingImport,
                    severity: Severity::High,
                    description: format!("'{}' is used at {} but never imported", node.name, node.location()),
                    node_ids: vec![node.id.clone()],
                    suggested_fixes: suggestions.iter().map(|s| s.to_string()).collect(),
                    confidence: MISSING_IMPORT_CONFIDENCE,
                })
            })
            .collect();
        Ok(Detection::complete(issues))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{call_graph, reference};

    #[test]
    fn test_known_module_suggested() {
        let nodes = vec![reference("m.py", "json", 3, true)];
        let graph = call_graph(&nodes, &[]);
        let detection = MissingImportDetector.detect(&graph, &Deadline::unbounded()).unwrap();

        assert_eq!(detection.issues.len(), 1);
        let issue = &detection.issues[0];
        assert_eq!(issue.severity, Severity::High);
        assert_eq!(issue.node_ids, vec!["m.py:json:name_reference:3"]);
        assert!(issue.suggested_fixes.contains(&"import json".to_string()));
    }

    #[test]
    fn test_defined_and_unknown_names_skipped() {
        let nodes = vec![
            reference("m.py", "json", 3, false),
            reference("m.py", "undefined_name_xyz", 4, true),
        ];
        let graph = call_graph(&nodes, &[]);
        let detection = MissingImportDetector.detect(&graph, &Deadline::unbounded()).unwrap();

        assert!(detection.issues.is_empty());
        assert_eq!(MissingImportDetector::unknown_undefined(&graph), 1);
    }
}
