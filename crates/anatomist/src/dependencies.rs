//! # Dependency Analyzer
//!
//! Emits `calls` edges from each call site to every definition the
//! [`Resolver`] returns for the callee name, and `inherits` edges from each
//! class to its base classes.
//!
//! Resolution is by bare name. `obj.save()` links to every function named
//! `save` in the whole file set, so an edge may land on the wrong
//! same-named symbol. Swapping in a scope-aware [`Resolver`] tightens this
//! without touching the analyzer.

use crate::parser::ParsedFile;
use crate::symbols::enclosing_definition;
use common::{AnalysisError, Deadline, EdgeKind, GraphEdge, GraphNode, NodeKind, SymbolTable, NAME_MATCH_CONFIDENCE};
use std::collections::HashSet;
use std::sync::OnceLock;
use tree_sitter::{Query, QueryCursor, QueryError, StreamingIterator};

/// Maps a referenced name to candidate definitions.
pub trait Resolver: Sync {
    fn resolve(&self, name: &str, kind: NodeKind) -> &[GraphNode];
}

/// Bare-name lookup in the global [`SymbolTable`].
pub struct NameResolver<'a> {
    table: &'a SymbolTable,
}

impl<'a> NameResolver<'a> {
    pub fn new(table: &'a SymbolTable) -> Self {
        Self { table }
    }
}

impl Resolver for NameResolver<'_> {
    fn resolve(&self, name: &str, kind: NodeKind) -> &[GraphNode] {
        self.table.lookup(name, kind)
    }
}

/// Edges found in one file.
#[derive(Debug, Default)]
pub struct FileDependencies {
    pub edges: Vec<GraphEdge>,
    /// Call sites whose callee matched no definition.
    pub unresolved_calls: usize,
}

static CALL_QUERY: OnceLock<Result<Query, QueryError>> = OnceLock::new();

fn call_query() -> Result<&'static Query, AnalysisError> {
    CALL_QUERY
        .get_or_init(|| {
            Query::new(
                &tree_sitter_python::LANGUAGE.into(),
                r#"
                (call
                  function: (identifier) @direct_call)

                (call
                  function: (attribute
                    attribute: (identifier) @attr_call))
                "#,
            )
        })
        .as_ref()
        .map_err(|e| AnalysisError::Grammar(format!("Invalid call query: {e}")))
}

pub struct DependencyAnalyzer<'r, R: Resolver + ?Sized> {
    resolver: &'r R,
    /// Also match call names against classes (`Config()` constructs a `Config`).
    resolve_constructors: bool,
}

impl<'r, R: Resolver + ?Sized> DependencyAnalyzer<'r, R> {
    pub fn new(resolver: &'r R) -> Self {
        Self {
            resolver,
            resolve_constructors: true,
        }
    }

    pub fn resolve_constructors(mut self, enabled: bool) -> Self {
        self.resolve_constructors = enabled;
        self
    }

    /// Analyzes one file. `file_nodes` are the nodes collected from it.
    ///
    /// # Errors
    /// `BudgetExceeded` when the deadline passes between call sites.
    pub fn analyze(
        &self,
        file: &ParsedFile,
        file_nodes: &[GraphNode],
        deadline: &Deadline,
    ) -> Result<FileDependencies, AnalysisError> {
        let mut deps = FileDependencies::default();
        self.link_calls(file, file_nodes, deadline, &mut deps)?;
        self.link_bases(file_nodes, &mut deps);
        Ok(deps)
    }

    fn link_calls(
        &self,
        file: &ParsedFile,
        file_nodes: &[GraphNode],
        deadline: &Deadline,
        deps: &mut FileDependencies,
    ) -> Result<(), AnalysisError> {
        let known: HashSet<&str> = file_nodes.iter().map(|n| n.id.as_str()).collect();
        let module_id = file.module_id();

        let query = call_query()?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(query, file.root(), file.bytes());

        while let Some(m) = matches.next() {
            deadline.check()?;
            for capture in m.captures {
                let callee = file.text(capture.node);
                let caller = caller_id(file, capture.node);
                let caller = if known.contains(caller.as_str()) { caller } else { module_id.clone() };

                let mut targets: Vec<&GraphNode> = self.resolver.resolve(callee, NodeKind::Function).iter().collect();
                if self.resolve_constructors {
                    targets.extend(self.resolver.resolve(callee, NodeKind::Class));
                }

                if targets.is_empty() {
                    deps.unresolved_calls += 1;
                    continue;
                }
                for target in targets {
                    deps.edges.push(GraphEdge::new(
                        caller.clone(),
                        target.id.clone(),
                        EdgeKind::Calls,
                        NAME_MATCH_CONFIDENCE,
                    ));
                }
            }
        }
        Ok(())
    }

    fn link_bases(&self, file_nodes: &[GraphNode], deps: &mut FileDependencies) {
        for node in file_nodes {
            let Some(meta) = node.as_class() else {
                continue;
            };
            for base in &meta.bases {
                let name = base_name(base);
                for target in self.resolver.resolve(name, NodeKind::Class) {
                    if target.id != node.id {
                        deps.edges.push(GraphEdge::new(
                            node.id.clone(),
                            target.id.clone(),
                            EdgeKind::Inherits,
                            NAME_MATCH_CONFIDENCE,
                        ));
                    }
                }
            }
        }
    }
}

/// Id of the innermost function or class around a call site, or the
/// module node when the call happens at module level.
fn caller_id(file: &ParsedFile, node: tree_sitter::Node<'_>) -> String {
    match enclosing_definition(node) {
        Some(def) => {
            let kind = if def.kind() == "class_definition" {
                NodeKind::Class
            } else {
                NodeKind::Function
            };
            let name = def.child_by_field_name("name").map(|n| file.text(n)).unwrap_or("");
            GraphNode::make_id(&file.path, name, kind, def.start_position().row as u32 + 1)
        }
        None => file.module_id(),
    }
}

/// `pkg.models.Base` → `Base`, `Generic[T]` → `Generic`.
fn base_name(base: &str) -> &str {
    let base = base.split('[').next().unwrap_or(base).trim();
    base.rsplit('.').next().unwrap_or(base)
}
