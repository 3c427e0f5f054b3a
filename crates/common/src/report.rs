//! Issues and the final analysis report.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Critical and high issues fail a CLI run.
    pub fn is_blocking(self) -> bool {
        matches!(self, Severity::Critical | Severity::High)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    CircularDependency,
    OrphanedCode,
    MissingImport,
    InconsistentApi,
}

impl IssueKind {
    pub const ALL: [IssueKind; 4] = [
        IssueKind::CircularDependency,
        IssueKind::OrphanedCode,
        IssueKind::MissingImport,
        IssueKind::InconsistentApi,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IssueKind::CircularDependency => "circular_dependency",
            IssueKind::OrphanedCode => "orphaned_code",
            IssueKind::MissingImport => "missing_import",
            IssueKind::InconsistentApi => "inconsistent_api",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One finding of a detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub description: String,
    /// Never empty; the first id anchors the issue for sorting.
    pub node_ids: Vec<String>,
    pub suggested_fixes: Vec<String>,
    pub confidence: f64,
}

impl Issue {
    /// Sort key giving byte-identical reports across runs.
    fn order_key(&self) -> (IssueKind, &str, &[String], &str) {
        (
            self.kind,
            self.node_ids.first().map(String::as_str).unwrap_or(""),
            &self.node_ids,
            &self.description,
        )
    }
}

/// Issues grouped by kind. Every bucket is always present in the JSON output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueBuckets {
    pub circular_dependency: Vec<Issue>,
    pub orphaned_code: Vec<Issue>,
    pub missing_import: Vec<Issue>,
    pub inconsistent_api: Vec<Issue>,
}

impl IssueBuckets {
    pub fn bucket(&self, kind: IssueKind) -> &[Issue] {
        match kind {
            IssueKind::CircularDependency => &self.circular_dependency,
            IssueKind::OrphanedCode => &self.orphaned_code,
            IssueKind::MissingImport => &self.missing_import,
            IssueKind::InconsistentApi => &self.inconsistent_api,
        }
    }

    fn bucket_mut(&mut self, kind: IssueKind) -> &mut Vec<Issue> {
        match kind {
            IssueKind::CircularDependency => &mut self.circular_dependency,
            IssueKind::OrphanedCode => &mut self.orphaned_code,
            IssueKind::MissingImport => &mut self.missing_import,
            IssueKind::InconsistentApi => &mut self.inconsistent_api,
        }
    }

    pub fn push(&mut self, issue: Issue) {
        self.bucket_mut(issue.kind).push(issue);
    }

    /// Orders every bucket by `(kind, node_ids[0])`, ties broken by the full
    /// id list and then the description.
    pub fn sort(&mut self) {
        for kind in IssueKind::ALL {
            self.bucket_mut(kind)
                .sort_by(|a, b| a.order_key().cmp(&b.order_key()));
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Issue> {
        IssueKind::ALL.into_iter().flat_map(move |kind| self.bucket(kind).iter())
    }

    pub fn len(&self) -> usize {
        IssueKind::ALL.iter().map(|&kind| self.bucket(kind).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_blocking(&self) -> bool {
        self.iter().any(|issue| issue.severity.is_blocking())
    }
}

impl FromIterator<Issue> for IssueBuckets {
    fn from_iter<I: IntoIterator<Item = Issue>>(iter: I) -> Self {
        let mut buckets = IssueBuckets::default();
        for issue in iter {
            buckets.push(issue);
        }
        buckets.sort();
        buckets
    }
}

/// Counters describing what the run had to drop or could not resolve.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub files_analyzed: usize,
    /// Files never reached because the time budget ran out.
    pub unprocessed_files: usize,
    pub duplicate_node_ids: usize,
    pub duplicate_edges: usize,
    /// Edges dropped because an endpoint was missing.
    pub dangling_edges: usize,
    pub unresolved_calls: usize,
    /// Undefined names with no known import suggestion.
    pub unresolved_references: usize,
    /// Imports of modules outside the analyzed file set.
    pub unresolved_imports: usize,
    pub errors: Vec<String>,
}

/// Structural statistics of the assembled graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSummary {
    pub isolated_nodes: usize,
    pub weak_components: usize,
    pub density: f64,
    pub cycles: usize,
}

/// The result of one analysis run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub nodes_total: usize,
    pub edges_total: usize,
    pub skipped_files: Vec<String>,
    pub issues: IssueBuckets,
    /// The time budget ran out and some stage returned partial results.
    pub truncated: bool,
    pub diagnostics: Diagnostics,
    pub stats: GraphSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(kind: IssueKind, severity: Severity, first: &str) -> Issue {
        Issue {
            kind,
            severity,
            description: format!("{kind} at {first}"),
            node_ids: vec![first.to_string()],
            suggested_fixes: vec![],
            confidence: 0.5,
        }
    }

    #[test]
    fn test_buckets_sorted_by_first_node() {
        let buckets: IssueBuckets = vec![
            issue(IssueKind::OrphanedCode, Severity::Medium, "b.py:z:function:1"),
            issue(IssueKind::OrphanedCode, Severity::Medium, "a.py:y:function:4"),
            issue(IssueKind::MissingImport, Severity::High, "a.py:json:name_reference:2"),
        ]
        .into_iter()
        .collect();

        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets.orphaned_code[0].node_ids[0], "a.py:y:function:4");
        assert_eq!(buckets.orphaned_code[1].node_ids[0], "b.py:z:function:1");
        assert_eq!(buckets.missing_import.len(), 1);
        assert!(buckets.has_blocking());
    }

    #[test]
    fn test_medium_only_is_not_blocking() {
        let buckets: IssueBuckets =
            std::iter::once(issue(IssueKind::OrphanedCode, Severity::Medium, "a.py:f:function:1")).collect();
        assert!(!buckets.has_blocking());
    }

    #[test]
    fn test_empty_report_has_every_bucket() {
        let json = serde_json::to_value(AnalysisReport::default()).unwrap();
        for kind in IssueKind::ALL {
            assert!(json["issues"][kind.as_str()].is_array(), "missing bucket {kind}");
        }
        assert_eq!(json["truncated"], false);
    }
}
