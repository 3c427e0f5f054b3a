//! # Inconsistent-API Detector
//!
//! Groups functions by name across the whole file set. A group whose
//! members disagree on their parameter annotation tuple is reported once,
//! listing every member. Dunder methods are skipped; every class has its
//! own `__init__`.

use crate::{Detection, Detector, DetectorKind};
use anatomist::{is_dunder, LogicGraph};
use common::{AnalysisError, Deadline, GraphNode, Issue, IssueKind, Severity};
use std::collections::{BTreeMap, BTreeSet};

const INCONSISTENT_API_CONFIDENCE: f64 = 0.9;

const INCONSISTENT_API_FIXES: &[&str] = &[
    "Unify the signatures",
    "Use typing.overload to declare the variants",
    "Rename the functions to tell them apart",
    "Extract the shared logic into one function",
];

pub struct InconsistentApiDetector;

fn render_signature(signature: &[Option<&str>]) -> String {
    let parts: Vec<&str> = signature.iter().map(|a| a.unwrap_or("_")).collect();
    format!("({})", parts.join(", "))
}

impl Detector for InconsistentApiDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::InconsistentApi
    }

    fn detect(&self, graph: &LogicGraph, _deadline: &Deadline) -> Result<Detection, AnalysisError> {
        let mut groups: BTreeMap<&str, Vec<&GraphNode>> = BTreeMap::new();
        for node in graph.nodes() {
            if node.as_function().is_some() && !is_dunder(&node.name) {
                groups.entry(node.name.as_str()).or_default().push(node);
            }
        }

        let mut issues = Vec::new();
        for (name, members) in groups {
            if members.len() < 2 {
                continue;
            }
            let signatures: BTreeSet<Vec<Option<&str>>> = members
                .iter()
                .filter_map(|n| n.as_function())
                .map(|meta| meta.annotation_signature())
                .collect();
            if signatures.len() < 2 {
                continue;
            }

            let mut node_ids: Vec<String> = members.iter().map(|n| n.id.clone()).collect();
            node_ids.sort();
            let variants: Vec<String> = signatures.iter().map(|s| render_signature(s)).collect();

            issues.push(Issue {
                kind: IssueKind::InconsistentApi,
                severity: Severity::High,
                description: format!(
                    "{} definitions of '{name}' disagree on parameter types: {}",
                    members.len(),
                    variants.join(" vs ")
                ),
                node_ids,
                suggested_fixes: INCONSISTENT_API_FIXES.iter().map(|s| s.to_string()).collect(),
                confidence: INCONSISTENT_API_CONFIDENCE,
            });
        }
        Ok(Detection::complete(issues))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{call_graph, function_with};

    fn detect(nodes: &[GraphNode]) -> Vec<Issue> {
        let graph = call_graph(nodes, &[]);
        InconsistentApiDetector
            .detect(&graph, &Deadline::unbounded())
            .unwrap()
            .issues
    }

    #[test]
    fn test_differing_annotations_flagged() {
        let nodes = vec![
            function_with("a.py", "load", 1, &[("path", Some("str"))], None),
            function_with("b.py", "load", 1, &[("path", Some("Path"))], None),
            function_with("c.py", "load", 1, &[("path", Some("str"))], None),
        ];
        let issues = detect(&nodes);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].node_ids.len(), 3);
        assert_eq!(issues[0].node_ids[0], "a.py:load:function:1");
        assert!(issues[0].description.contains("(Path) vs (str)"));
    }

    #[test]
    fn test_matching_signatures_not_flagged() {
        let nodes = vec![
            function_with("a.py", "save", 1, &[("x", Some("int"))], None),
            function_with("b.py", "save", 5, &[("y", Some("int"))], None),
        ];
        assert!(detect(&nodes).is_empty());
    }

    #[test]
    fn test_arity_difference_flagged() {
        let nodes = vec![
            function_with("a.py", "run", 1, &[], None),
            function_with("b.py", "run", 1, &[("n", None)], None),
        ];
        assert_eq!(detect(&nodes).len(), 1);
    }

    #[test]
    fn test_dunders_and_singletons_skipped() {
        let nodes = vec![
            function_with("a.py", "__init__", 1, &[("x", Some("int"))], None),
            function_with("b.py", "__init__", 1, &[("y", Some("str"))], None),
            function_with("c.py", "unique", 1, &[("z", Some("str"))], None),
        ];
        assert!(detect(&nodes).is_empty());
    }
}
