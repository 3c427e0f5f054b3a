//! # Symbol Table: global name index
//!
//! Maps `"name:kind"` keys to every function or class node carrying that
//! name. Built once after collection and only read afterwards, so it can be
//! shared across worker threads by reference.

use crate::{GraphNode, NodeKind};
use std::collections::HashMap;

/// Key under which a definition is indexed.
///
/// # Examples
/// ```
/// # use common::{symbol_key, NodeKind};
/// assert_eq!(symbol_key("helper", NodeKind::Function), "helper:function");
/// assert_eq!(symbol_key("Base", NodeKind::Class), "Base:class");
/// ```
pub fn symbol_key(name: &str, kind: NodeKind) -> String {
    format!("{name}:{kind}")
}

/// Immutable snapshot of all definitions across the analyzed files.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    entries: HashMap<String, Vec<GraphNode>>,
}

impl SymbolTable {
    /// Indexes every function and class node; other kinds are ignored.
    ///
    /// Insertion order is preserved within a key, so lookups are as
    /// deterministic as the node stream passed in.
    pub fn build<'a>(nodes: impl IntoIterator<Item = &'a GraphNode>) -> Self {
        let mut entries: HashMap<String, Vec<GraphNode>> = HashMap::new();
        for node in nodes {
            if !node.kind.is_definition() {
                continue;
            }
            entries
                .entry(symbol_key(&node.name, node.kind))
                .or_default()
                .push(node.clone());
        }
        Self { entries }
    }

    /// All definitions named `name` of the given kind. Empty when unknown.
    pub fn lookup(&self, name: &str, kind: NodeKind) -> &[GraphNode] {
        self.entries
            .get(&symbol_key(name, kind))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of distinct `name:kind` keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no definitions were indexed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of indexed definitions.
    pub fn symbol_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Keys that resolve to more than one definition.
    pub fn ambiguous_keys(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, nodes)| nodes.len() > 1)
            .map(|(key, _)| key.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClassMeta, NameMeta, NodeMetadata};

    fn class(file: &str, name: &str, line: u32) -> GraphNode {
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

    fn reference(file: &str, name: &str, line: u32) -> GraphNode {
        GraphNode::new(
            file,
            name,
            line,
            0,
            NodeMetadata::NameReference(NameMeta {
                is_undefined: false,
                scope: vec![],
            }),
        )
    }

    #[test]
    fn test_lookup_by_name_and_kind() {
        let nodes = vec![class("a.py", "Base", 1), reference("a.py", "Base", 5)];
        let table = SymbolTable::build(&nodes);

        assert_eq!(table.lookup("Base", NodeKind::Class).len(), 1);
        assert!(table.lookup("Base", NodeKind::Function).is_empty());
        assert!(table.lookup("Base", NodeKind::NameReference).is_empty());
        assert_eq!(table.symbol_count(), 1);
    }

    #[test]
    fn test_same_name_keeps_every_definition() {
        let nodes = vec![class("a.py", "Config", 1), class("b.py", "Config", 9)];
        let table = SymbolTable::build(&nodes);

        let hits = table.lookup("Config", NodeKind::Class);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].source_file, "a.py");
        assert_eq!(hits[1].source_file, "b.py");
        assert_eq!(table.len(), 1);
        assert_eq!(table.ambiguous_keys().collect::<Vec<_>>(), vec!["Config:class"]);
    }

    #[test]
    fn test_empty_table() {
        let table = SymbolTable::build(std::iter::empty());
        assert!(table.is_empty());
        assert!(table.lookup("anything", NodeKind::Function).is_empty());
    }
}
