//! # Cycle Detector
//!
//! Enumerates elementary cycles with Johnson's algorithm: repeatedly take
//! a strongly connected component, find every circuit through its smallest
//! vertex using the blocked-set search, then drop that vertex and recurse
//! into the remaining components. Runs in O((V + E)(C + 1)) for C cycles.
//!
//! Self-loops are not reported; recursion is not a dependency cycle.

use crate::{Detection, Detector, DetectorKind};
use anatomist::LogicGraph;
use common::{AnalysisError, Deadline, Issue, IssueKind, Severity};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

const CYCLE_CONFIDENCE: f64 = 1.0;

const CYCLE_FIXES: &[&str] = &[
    "Break the cycle by moving the shared logic into its own module",
    "Invert one dependency by passing the collaborator in as a parameter",
    "Extract a common interface that both sides depend on",
    "Defer one of the imports to function scope",
];

pub struct CycleDetector {
    max_cycles: usize,
}

impl CycleDetector {
    pub fn new(max_cycles: usize) -> Self {
        Self { max_cycles }
    }
}

impl Detector for CycleDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Cycle
    }

    fn detect(&self, graph: &LogicGraph, deadline: &Deadline) -> Result<Detection, AnalysisError> {
        let inner = graph.inner();
        let adjacency: Vec<Vec<usize>> = inner
            .node_indices()
            .map(|ix| {
                let mut targets: Vec<usize> = inner
                    .neighbors_directed(ix, Direction::Outgoing)
                    .map(|n| n.index())
                    .filter(|&n| n != ix.index())
                    .collect();
                targets.sort_unstable();
                targets.dedup();
                targets
            })
            .collect();

        let search = simple_cycles(&adjacency, self.max_cycles, deadline);
        if search.truncated {
            tracing::warn!(cycles = search.cycles.len(), "cycle enumeration stopped early");
        }

        let issues = search
            .cycles
            .into_iter()
            .map(|mut cycle| {
                canonicalize(&mut cycle, |&i| inner[NodeIndex::new(i)].id.as_str());
                let ids: Vec<String> = cycle
                    .iter()
                    .map(|&i| inner[NodeIndex::new(i)].id.clone())
                    .collect();
                let names: Vec<&str> = cycle
                    .iter()
                    .map(|&i| inner[NodeIndex::new(i)].name.as_str())
                    .collect();

                Issue {
                    kind: IssueKind::CircularDependency,
                    severity: Severity::Critical,
                    description: format!(
                        "Circular dependency across {} nodes: {} -> {}",
                        ids.len(),
                        names.join(" -> "),
                        names[0]
                    ),
                    node_ids: ids,
                    suggested_fixes: CYCLE_FIXES.iter().map(|s| s.to_string()).collect(),
                    confidence: CYCLE_CONFIDENCE,
                }
            })
            .collect();

        Ok(Detection {
            issues,
            truncated: search.truncated,
        })
    }
}

/// Rotates a cycle so the member with the smallest key comes first.
fn canonicalize<T, K: Ord>(cycle: &mut [T], key: impl Fn(&T) -> K) {
    if let Some(pos) = cycle
        .iter()
        .enumerate()
        .min_by(|a, b| key(a.1).cmp(&key(b.1)))
        .map(|(i, _)| i)
    {
        cycle.rotate_left(pos);
    }
}

/// Result of a cycle enumeration over dense indices.
#[derive(Debug, Default)]
pub struct CycleSearch {
    /// Each cycle lists its vertices once, in traversal order.
    pub cycles: Vec<Vec<usize>>,
    pub truncated: bool,
}

/// All elementary cycles of length ≥ 2 in `adjacency`.
///
/// `adjacency[v]` lists the successors of `v` and must not contain `v`.
/// Stops after `limit` cycles or when `deadline` passes, setting `truncated`.
pub fn simple_cycles(adjacency: &[Vec<usize>], limit: usize, deadline: &Deadline) -> CycleSearch {
    let mut out = CycleSearch::default();
    let all: Vec<usize> = (0..adjacency.len()).collect();
    let mut components = strongly_connected(&all, adjacency);

    while let Some(component) = components.pop() {
        // Components are sorted, so the start vertex is the smallest.
        let start = component[0];
        let members: HashSet<usize> = component.iter().copied().collect();
        let successors = |v: usize| -> Vec<usize> {
            adjacency[v]
                .iter()
                .copied()
                .filter(|w| members.contains(w))
                .collect()
        };

        let mut path = vec![start];
        let mut blocked: HashSet<usize> = HashSet::from([start]);
        let mut closed: HashSet<usize> = HashSet::new();
        let mut blocked_by: HashMap<usize, HashSet<usize>> = HashMap::new();
        let mut stack: Vec<(usize, Vec<usize>)> = vec![(start, successors(start))];

        while let Some(frame) = stack.last_mut() {
            if deadline.is_exceeded() {
                out.truncated = true;
                return out;
            }

            let node = frame.0;
            let next = frame.1.pop();
            let exhausted = frame.1.is_empty();

            if let Some(next) = next {
                if next == start {
                    out.cycles.push(path.clone());
                    if out.cycles.len() >= limit {
                        out.truncated = true;
                        return out;
                    }
                    closed.extend(path.iter().copied());
                } else if !blocked.contains(&next) {
                    path.push(next);
                    stack.push((next, successors(next)));
                    closed.remove(&next);
                    blocked.insert(next);
                    continue;
                }
            }

            if exhausted {
                if closed.contains(&node) {
                    unblock(node, &mut blocked, &mut blocked_by);
                } else {
                    for w in successors(node) {
                        blocked_by.entry(w).or_default().insert(node);
                    }
                }
                stack.pop();
                path.pop();
            }
        }

        components.extend(strongly_connected(&component[1..], adjacency));
    }

    out
}

fn unblock(node: usize, blocked: &mut HashSet<usize>, blocked_by: &mut HashMap<usize, HashSet<usize>>) {
    let mut pending = vec![node];
    while let Some(v) = pending.pop() {
        if blocked.remove(&v) {
            if let Some(waiting) = blocked_by.remove(&v) {
                pending.extend(waiting);
            }
        }
    }
}

/// Non-trivial SCCs of the subgraph induced by `nodes`, each sorted ascending.
fn strongly_connected(nodes: &[usize], adjacency: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let position: HashMap<usize, usize> = nodes.iter().enumerate().map(|(i, &v)| (v, i)).collect();
    let mut sub: DiGraph<usize, ()> = DiGraph::with_capacity(nodes.len(), 0);
    let indices: Vec<NodeIndex> = nodes.iter().map(|&v| sub.add_node(v)).collect();

    for (i, &v) in nodes.iter().enumerate() {
        for w in &adjacency[v] {
            if let Some(&j) = position.get(w) {
                sub.add_edge(indices[i], indices[j], ());
            }
        }
    }

    tarjan_scc(&sub)
        .into_iter()
        .filter(|component| component.len() > 1)
        .map(|component| {
            let mut vs: Vec<usize> = component.into_iter().map(|ix| sub[ix]).collect();
            vs.sort_unstable();
            vs
        })
        .collect()
}
