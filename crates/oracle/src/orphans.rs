//! # Orphan Detector
//!
//! A function or class is orphaned when nothing else calls or inherits from
//! it and no entry-point heuristic tagged it at collection time. A recursive
//! call counts as a reference like any other incoming edge.

use crate::{Detection, Detector, DetectorKind};
use anatomist::LogicGraph;
use common::{AnalysisError, Deadline, EdgeKind, GraphNode, Issue, IssueKind, Severity};

const ORPHAN_CONFIDENCE: f64 = 0.7;

const ORPHAN_FIXES: &[&str] = &[
    "Delete it if it is no longer needed",
    "Call it from the code path that was meant to use it",
    "Cover it with a unit test",
    "Mark it as internal with a leading underscore",
];

pub struct OrphanDetector;

impl OrphanDetector {
    fn is_referenced(graph: &LogicGraph, node: &GraphNode) -> bool {
        graph
            .in_edges(&node.id)
            .any(|e| matches!(e.kind, EdgeKind::Calls | EdgeKind::Inherits))
    }
}

impl Detector for OrphanDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Orphan
    }

    fn detect(&self, graph: &LogicGraph, deadline: &Deadline) -> Result<Detection, AnalysisError> {
        let mut issues = Vec::new();
        for node in graph.nodes() {
            if !node.kind.is_definition() || node.entry_point().is_some() {
                continue;
            }
            if Self::is_referenced(graph, node) {
                continue;
            }
            if deadline.is_exceeded() {
                return Ok(Detection {
                    issues,
                    truncated: true,
                });
            }
            issues.push(Issue {
                kind: IssueKind::OrphanedCode,
                severity: Severity::Medium,
                description: format!(
                    "{} '{}' at {} is never called or inherited",
                    node.kind,
                    node.name,
                    node.location()
                ),
                node_ids: vec![node.id.clone()],
                suggested_fixes: ORPHAN_FIXES.iter().map(|s| s.to_string()).collect(),
                confidence: ORPHAN_CONFIDENCE,
            });
        }
        Ok(Detection::complete(issues))
    }
}
