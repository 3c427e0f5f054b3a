//! # Common: the logic graph data model
//!
//! Node, edge and issue types shared by the collectors (`anatomist`), the
//! detectors (`oracle`) and the command line front end. Everything here is
//! plain data: serializable with `serde`, built once and then only read.

pub mod budget;
pub mod error;
pub mod registry;
pub mod report;
pub mod wisdom;

pub use budget::Deadline;
pub use error::AnalysisError;
pub use registry::{symbol_key, SymbolTable};
pub use report::{AnalysisReport, Diagnostics, GraphSummary, Issue, IssueBuckets, IssueKind, Severity};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Confidence attached to every edge resolved by bare-name matching.
pub const NAME_MATCH_CONFIDENCE: f64 = 0.9;

/// Confidence of an import edge whose module path matched exactly.
pub const EXACT_MATCH_CONFIDENCE: f64 = 1.0;

/// Kind of a logic graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// One per source file; owns module-level calls and imports.
    Module,
    Function,
    Class,
    /// A read-context identifier.
    NameReference,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Module => "module",
            NodeKind::Function => "function",
            NodeKind::Class => "class",
            NodeKind::NameReference => "name_reference",
        }
    }

    /// Function and class nodes are the only ones that enter the symbol table.
    pub fn is_definition(self) -> bool {
        matches!(self, NodeKind::Function | NodeKind::Class)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reason why a definition is reachable from outside the analyzed code.
///
/// Set by the entry-point heuristics at collection time. A tagged node is
/// never reported as orphaned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryPoint {
    /// `main()` by convention.
    MainFunction,
    /// `test_*` functions collected by test runners.
    TestFunction,
    /// `Test*` classes inside a test module.
    TestClass,
    /// Dunder method invoked implicitly by the interpreter (`__init__`, `__enter__`, ...).
    LifecycleMethod,
    /// Route, CLI command, task or signal handler registered through a decorator.
    FrameworkDecorator,
    /// pytest fixture or anything defined in `conftest.py`.
    PytestFixture,
}

/// One formal parameter of a function definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name; splat parameters keep their `*` / `**` prefix.
    pub name: String,
    /// Annotation source text, if any.
    pub annotation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionMeta {
    pub parameters: Vec<Parameter>,
    pub has_return_annotation: bool,
    /// Decorator names with call arguments stripped (`app.route`, not `app.route("/")`).
    pub decorators: Vec<String>,
    pub has_docstring: bool,
    pub is_async: bool,
    /// Defined directly inside a class body.
    pub is_method: bool,
    pub entry_point: Option<EntryPoint>,
}

impl FunctionMeta {
    pub fn parameter_names(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.name.as_str()).collect()
    }

    /// Annotation tuple used to compare same-named functions.
    ///
    /// The receiver (`self` / `cls`) of a method carries no API information
    /// and is left out.
    pub fn annotation_signature(&self) -> Vec<Option<&str>> {
        let skip = match self.parameters.first() {
            Some(first) if self.is_method && (first.name == "self" || first.name == "cls") => 1,
            _ => 0,
        };
        self.parameters[skip..]
            .iter()
            .map(|p| p.annotation.as_deref())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassMeta {
    /// Base class expressions as written (`Base`, `abc.ABC`, `Generic[T]`).
    pub bases: Vec<String>,
    pub decorators: Vec<String>,
    pub has_docstring: bool,
    pub entry_point: Option<EntryPoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameMeta {
    /// No binding for this name exists anywhere in its file and it is not a builtin.
    pub is_undefined: bool,
    /// Enclosing function/class names, outermost first. Empty at module level.
    pub scope: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleMeta {
    /// Dotted module path (`pkg.utils`).
    pub module: String,
    /// The file is a package `__init__.py`.
    pub is_package: bool,
}

/// Per-kind node attributes, fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeMetadata {
    Module(ModuleMeta),
    Function(FunctionMeta),
    Class(ClassMeta),
    NameReference(NameMeta),
}

impl NodeMetadata {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeMetadata::Module(_) => NodeKind::Module,
            NodeMetadata::Function(_) => NodeKind::Function,
            NodeMetadata::Class(_) => NodeKind::Class,
            NodeMetadata::NameReference(_) => NodeKind::NameReference,
        }
    }
}

/// A vertex of the logic graph.
///
/// The kind is derived from the metadata variant so the two can never disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    /// `"{source_file}:{name}:{kind}:{line}"`
    pub id: String,
    pub kind: NodeKind,
    pub name: String,
    pub source_file: String,
    /// 1-based.
    pub line: u32,
    /// 0-based byte column.
    pub column: u32,
    pub metadata: NodeMetadata,
}

impl GraphNode {
    pub fn new(source_file: &str, name: &str, line: u32, column: u32, metadata: NodeMetadata) -> Self {
        let kind = metadata.kind();
        Self {
            id: Self::make_id(source_file, name, kind, line),
            kind,
            name: name.to_string(),
            source_file: source_file.to_string(),
            line,
            column,
            metadata,
        }
    }

    /// Builds a node id without building the node.
    ///
    /// # Examples
    /// ```
    /// # use common::{GraphNode, NodeKind};
    /// let id = GraphNode::make_id("pkg/a.py", "helper", NodeKind::Function, 3);
    /// assert_eq!(id, "pkg/a.py:helper:function:3");
    /// ```
    pub fn make_id(source_file: &str, name: &str, kind: NodeKind, line: u32) -> String {
        format!("{source_file}:{name}:{kind}:{line}")
    }

    pub fn as_function(&self) -> Option<&FunctionMeta> {
        match &self.metadata {
            NodeMetadata::Function(meta) => Some(meta),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&ClassMeta> {
        match &self.metadata {
            NodeMetadata::Class(meta) => Some(meta),
            _ => None,
        }
    }

    pub fn as_module(&self) -> Option<&ModuleMeta> {
        match &self.metadata {
            NodeMetadata::Module(meta) => Some(meta),
            _ => None,
        }
    }

    pub fn entry_point(&self) -> Option<EntryPoint> {
        match &self.metadata {
            NodeMetadata::Function(meta) => meta.entry_point,
            NodeMetadata::Class(meta) => meta.entry_point,
            _ => None,
        }
    }

    pub fn is_undefined_reference(&self) -> bool {
        matches!(&self.metadata, NodeMetadata::NameReference(meta) if meta.is_undefined)
    }

    /// Location string for human-readable messages.
    pub fn location(&self) -> String {
        format!("{}:{}", self.source_file, self.line)
    }
}

/// Kind of a logic graph edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Calls,
    Imports,
    Inherits,
}

/// A directed relation between two node ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source_id: String,
    pub target_id: String,
    pub kind: EdgeKind,
    /// In `[0, 1]`.
    pub confidence: f64,
}

impl GraphEdge {
    pub fn new(source_id: impl Into<String>, target_id: impl Into<String>, kind: EdgeKind, confidence: f64) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            kind,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn function(name: &str, params: &[(&str, Option<&str>)], is_method: bool) -> FunctionMeta {
        FunctionMeta {
            parameters: params
                .iter()
                .map(|(n, a)| Parameter {
                    name: n.to_string(),
                    annotation: a.map(str::to_string),
                })
                .collect(),
            has_return_annotation: false,
            decorators: Vec::new(),
            has_docstring: false,
            is_async: false,
            is_method,
            entry_point: None,
        }
    }

    #[test]
    fn test_node_id_format() {
        let node = GraphNode::new(
            "src/app.py",
            "run",
            12,
            4,
            NodeMetadata::Function(function("run", &[], false)),
        );
        assert_eq!(node.id, "src/app.py:run:function:12");
        assert_eq!(node.kind, NodeKind::Function);
        assert_eq!(node.location(), "src/app.py:12");
    }

    #[test]
    fn test_kind_follows_metadata() {
        let node = GraphNode::new(
            "a.py",
            "json",
            1,
            0,
            NodeMetadata::NameReference(NameMeta {
                is_undefined: true,
                scope: vec![],
            }),
        );
        assert_eq!(node.kind, NodeKind::NameReference);
        assert!(node.is_undefined_reference());
        assert!(node.entry_point().is_none());
    }

    #[test]
    fn test_annotation_signature_skips_receiver() {
        let method = function("save", &[("self", None), ("path", Some("str"))], true);
        assert_eq!(method.annotation_signature(), vec![Some("str")]);

        // A free function whose first parameter happens to be named `self` keeps it.
        let free = function("save", &[("self", None), ("path", Some("str"))], false);
        assert_eq!(free.annotation_signature(), vec![None, Some("str")]);
    }

    #[test]
    fn test_edge_confidence_clamped() {
        let edge = GraphEdge::new("a", "b", EdgeKind::Calls, 1.7);
        assert_eq!(edge.confidence, 1.0);
    }

    #[test]
    fn test_node_serializes_snake_case_kind() {
        let node = GraphNode::new(
            "m.py",
            "m",
            1,
            0,
            NodeMetadata::Module(ModuleMeta {
                module: "m".into(),
                is_package: false,
            }),
        );
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["kind"], "module");
        assert_eq!(json["metadata"]["module"]["module"], "m");
    }
}
