//! Graph builders shared by the detector tests.

use anatomist::LogicGraph;
use common::{
    ClassMeta, EdgeKind, EntryPoint, FunctionMeta, GraphEdge, GraphNode, NameMeta, NodeMetadata, Parameter,
};

pub fn function(file: &str, name: &str, line: u32) -> GraphNode {
    function_with(file, name, line, &[], None)
}

pub fn function_with(
    file: &str,
    name: &str,
    line: u32,
    params: &[(&str, Option<&str>)],
    entry_point: Option<EntryPoint>,
) -> GraphNode {
    GraphNode::new(
        file,
        name,
        line,
        0,
        NodeMetadata::Function(FunctionMeta {
            parameters: params
                .iter()
                .map(|(n, a)| Parameter {
                    name: n.to_string(),
                    annotation: a.map(str::to_string),
                })
                .collect(),
            has_return_annotation: false,
            decorators: vec![],
            has_docstring: false,
            is_async: false,
            is_method: false,
            entry_point,
        }),
    )
}

pub fn class(file: &str, name: &str, line: u32) -> GraphNode {
    GraphNode::new(
        file,
        name,
        line,
        0,
        NodeMetadata::Class(ClassMeta {
            bases: vec![],
            decorators: vec![],
            has_docstring: false,
            entry_point: None,
        }),
    )
}

pub fn reference(file: &str, name: &str, line: u32, is_undefined: bool) -> GraphNode {
    GraphNode::new(
        file,
        name,
        line,
        0,
        NodeMetadata::NameReference(NameMeta {
            is_undefined,
            scope: vec![],
        }),
    )
}

/// Builds a graph from nodes and `(source index, target index, kind)` edges.
pub fn graph(nodes: &[GraphNode], edges: &[(usize, usize, EdgeKind)]) -> LogicGraph {
    let mut graph = LogicGraph::new();
    for node in nodes {
        graph.add_node(node.clone());
    }
    for &(s, t, kind) in edges {
        graph.add_edge(GraphEdge::new(nodes[s].id.clone(), nodes[t].id.clone(), kind, 0.9));
    }
    graph
}

/// Shorthand for a graph of `calls` edges.
pub fn call_graph(nodes: &[GraphNode], edges: &[(usize, usize)]) -> LogicGraph {
    let edges: Vec<_> = edges.iter().map(|&(s, t)| (s, t, EdgeKind::Calls)).collect();
    graph(nodes, &edges)
}
