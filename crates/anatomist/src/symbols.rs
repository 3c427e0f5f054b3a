//! # Symbol Collector
//!
//! One pre-order walk per file emits:
//! - a `module` node (always first),
//! - a `function` node per `def` / `async def` (methods and nested functions included),
//! - a `class` node per `class`,
//! - a `name_reference` node per identifier read in load context.
//!
//! Whether a reference is undefined is decided against a per-file checklist
//! of every name bound anywhere in the file plus the Python builtins. The
//! checklist is not scope-aware; a name bound in one function counts as
//! defined in all of them.

use crate::heuristics::{self, Candidate, Heuristic};
use crate::parser::{walk_preorder, ParsedFile};
use common::wisdom::is_builtin;
use common::{
    AnalysisError, ClassMeta, Deadline, FunctionMeta, GraphNode, ModuleMeta, NameMeta, NodeKind, NodeMetadata,
    Parameter,
};
use std::collections::HashSet;
use tree_sitter::Node;

/// Collects every node of one parsed file.
///
/// # Errors
/// `BudgetExceeded` if the deadline passes mid-walk.
pub fn collect_symbols(
    file: &ParsedFile,
    heuristics: &[Box<dyn Heuristic>],
    deadline: &Deadline,
) -> Result<Vec<GraphNode>, AnalysisError> {
    let bindings = Bindings::collect(file, deadline)?;
    let mut nodes = vec![module_node(file)];

    walk_preorder(file.root(), deadline, |node| {
        match node.kind() {
            "function_definition" => nodes.extend(function_node(file, node, heuristics)),
            "class_definition" => nodes.extend(class_node(file, node, heuristics)),
            "identifier" if is_load(node) => nodes.push(reference_node(file, node, &bindings)),
            _ => {}
        }
        Ok(())
    })?;

    Ok(nodes)
}

fn module_node(file: &ParsedFile) -> GraphNode {
    GraphNode::new(
        &file.path,
        &file.module,
        1,
        0,
        NodeMetadata::Module(ModuleMeta {
            module: file.module.clone(),
            is_package: file.is_package,
        }),
    )
}

fn function_node(file: &ParsedFile, node: Node<'_>, heuristics: &[Box<dyn Heuristic>]) -> Option<GraphNode> {
    let name = file.text(node.child_by_field_name("name")?);
    let decorators = decorator_names(file, node);
    let is_method = enclosing_definition(node).is_some_and(|def| def.kind() == "class_definition");

    let parameters = node
        .child_by_field_name("parameters")
        .map(|params| extract_parameters(file, params))
        .unwrap_or_default();

    let mut cursor = node.walk();
    let is_async = node.children(&mut cursor).any(|child| child.kind() == "async");

    let entry_point = heuristics::classify(
        heuristics,
        &Candidate {
            source: file.bytes(),
            file_path: &file.path,
            name,
            kind: NodeKind::Function,
            decorators: &decorators,
            is_method,
        },
    );

    let pos = node.start_position();
    Some(GraphNode::new(
        &file.path,
        name,
        pos.row as u32 + 1,
        pos.column as u32,
        NodeMetadata::Function(FunctionMeta {
            parameters,
            has_return_annotation: node.child_by_field_name("return_type").is_some(),
            decorators,
            has_docstring: has_docstring(node),
            is_async,
            is_method,
            entry_point,
        }),
    ))
}

fn class_node(file: &ParsedFile, node: Node<'_>, heuristics: &[Box<dyn Heuristic>]) -> Option<GraphNode> {
    let name = file.text(node.child_by_field_name("name")?);
    let decorators = decorator_names(file, node);

    let mut bases = Vec::new();
    if let Some(args) = node.child_by_field_name("superclasses") {
        let mut cursor = args.walk();
        for arg in args.named_children(&mut cursor) {
            match arg.kind() {
                // metaclass=..., **kwargs
                "keyword_argument" | "dictionary_splat" | "comment" => {}
                _ => bases.push(file.text(arg).to_string()),
            }
        }
    }

    let entry_point = heuristics::classify(
        heuristics,
        &Candidate {
            source: file.bytes(),
            file_path: &file.path,
            name,
            kind: NodeKind::Class,
            decorators: &decorators,
            is_method: false,
        },
    );

    let pos = node.start_position();
    Some(GraphNode::new(
        &file.path,
        name,
        pos.row as u32 + 1,
        pos.column as u32,
        NodeMetadata::Class(ClassMeta {
            bases,
            decorators,
            has_docstring: has_docstring(node),
            entry_point,
        }),
    ))
}

fn reference_node(file: &ParsedFile, node: Node<'_>, bindings: &Bindings) -> GraphNode {
    let name = file.text(node);
    let pos = node.start_position();
    GraphNode::new(
        &file.path,
        name,
        pos.row as u32 + 1,
        pos.column as u32,
        NodeMetadata::NameReference(NameMeta {
            is_undefined: !bindings.defines(name),
            scope: enclosing_scope(file, node),
        }),
    )
}

/// Parameters in declaration order. Splat parameters keep their `*` / `**`.
fn extract_parameters(file: &ParsedFile, params: Node<'_>) -> Vec<Parameter> {
    let mut out = Vec::new();
    let mut cursor = params.walk();
    for param in params.named_children(&mut cursor) {
        let (name_node, annotation) = match param.kind() {
            "identifier" | "list_splat_pattern" | "dictionary_splat_pattern" => (Some(param), None),
            "typed_parameter" => {
                let mut inner = param.walk();
                let name = param
                    .named_children(&mut inner)
                    .find(|c| c.kind() != "type" && c.kind() != "comment");
                (name, param.child_by_field_name("type"))
            }
            "default_parameter" | "typed_default_parameter" => {
                (param.child_by_field_name("name"), param.child_by_field_name("type"))
            }
            // `*`, `/` separators and comments
            _ => continue,
        };
        if let Some(name_node) = name_node {
            out.push(Parameter {
                name: file.text(name_node).to_string(),
                annotation: annotation.map(|a| file.text(a).to_string()),
            });
        }
    }
    out
}

/// Decorator names with call arguments and whitespace stripped.
fn decorator_names(file: &ParsedFile, def: Node<'_>) -> Vec<String> {
    let Some(wrapper) = def.parent().filter(|p| p.kind() == "decorated_definition") else {
        return Vec::new();
    };

    let mut cursor = wrapper.walk();
    let decorators: Vec<Node<'_>> = wrapper
        .named_children(&mut cursor)
        .filter(|c| c.kind() == "decorator")
        .collect();

    decorators
        .into_iter()
        .filter_map(|dec| {
            let mut inner = dec.walk();
            let expr = dec.named_children(&mut inner).find(|c| c.kind() != "comment")?;
            let target = if expr.kind() == "call" {
                expr.child_by_field_name("function")?
            } else {
                expr
            };
            Some(file.text(target).split_whitespace().collect::<String>())
        })
        .collect()
}

fn has_docstring(def: Node<'_>) -> bool {
    let Some(body) = def.child_by_field_name("body") else {
        return false;
    };
    let mut cursor = body.walk();
    let Some(first) = body.named_children(&mut cursor).find(|c| c.kind() != "comment") else {
        return false;
    };
    if first.kind() != "expression_statement" {
        return false;
    }
    let mut inner = first.walk();
    let result = first
        .named_children(&mut inner)
        .next()
        .is_some_and(|expr| matches!(expr.kind(), "string" | "concatenated_string"));
    result
}

/// Nearest enclosing `def` or `class`.
pub(crate) fn enclosing_definition(node: Node<'_>) -> Option<Node<'_>> {
    let mut current = node.parent();
    while let Some(n) = current {
        if matches!(n.kind(), "function_definition" | "class_definition") {
            return Some(n);
        }
        current = n.parent();
    }
    None
}

/// Names of the enclosing definitions, outermost first.
fn enclosing_scope(file: &ParsedFile, node: Node<'_>) -> Vec<String> {
    let mut scope = Vec::new();
    let mut current = enclosing_definition(node);
    while let Some(def) = current {
        if let Some(name) = def.child_by_field_name("name") {
            scope.push(file.text(name).to_string());
        }
        current = enclosing_definition(def);
    }
    scope.reverse();
    scope
}

fn is_field_of(parent: Node<'_>, field: &str, node: Node<'_>) -> bool {
    parent
        .child_by_field_name(field)
        .is_some_and(|child| child.id() == node.id())
}

/// True when an identifier is read rather than bound, declared or used as
/// an attribute / keyword label.
fn is_load(node: Node<'_>) -> bool {
    let Some(parent) = node.parent() else {
        return true;
    };
    match parent.kind() {
        "function_definition" | "class_definition" | "keyword_argument" | "named_expression"
        | "default_parameter" | "typed_default_parameter" => !is_field_of(parent, "name", node),
        "attribute" => !is_field_of(parent, "attribute", node),
        "assignment" | "augmented_assignment" | "for_statement" | "for_in_clause" => {
            !is_field_of(parent, "left", node)
        }
        "as_pattern" => !is_field_of(parent, "alias", node),
        "except_clause" => !node.prev_sibling().is_some_and(|prev| prev.kind() == "as"),
        "parameters" | "lambda_parameters" | "typed_parameter" | "list_splat_pattern"
        | "dictionary_splat_pattern" | "pattern_list" | "tuple_pattern" | "list_pattern"
        | "as_pattern_target" | "global_statement" | "nonlocal_statement" | "dotted_name"
        | "aliased_import" | "import_prefix" | "relative_import" | "case_pattern"
        | "keyword_pattern" | "class_pattern" | "splat_pattern" => false,
        _ => true,
    }
}

/// Per-file checklist of bound names.
#[derive(Debug, Default)]
struct Bindings {
    names: HashSet<String>,
    /// `from x import *` makes every name potentially bound.
    wildcard: bool,
}

impl Bindings {
    fn collect(file: &ParsedFile, deadline: &Deadline) -> Result<Self, AnalysisError> {
        let mut bindings = Bindings::default();
        walk_preorder(file.root(), deadline, |node| {
            bindings.visit(file, node);
            Ok(())
        })?;
        Ok(bindings)
    }

    fn defines(&self, name: &str) -> bool {
        self.wildcard || self.names.contains(name) || is_builtin(name)
    }

    fn bind(&mut self, file: &ParsedFile, node: Node<'_>) {
        self.names.insert(file.text(node).to_string());
    }

    fn visit(&mut self, file: &ParsedFile, node: Node<'_>) {
        match node.kind() {
            "function_definition" | "class_definition" => {
                if let Some(name) = node.child_by_field_name("name") {
                    self.bind(file, name);
                }
            }
            "parameters" | "lambda_parameters" => {
                let mut cursor = node.walk();
                for param in node.named_children(&mut cursor) {
                    match param.kind() {
                        "default_parameter" | "typed_default_parameter" => {
                            if let Some(name) = param.child_by_field_name("name") {
                                self.bind_target(file, name);
                            }
                        }
                        "typed_parameter" => {
                            let mut inner = param.walk();
                            let targets: Vec<Node<'_>> = param
                                .named_children(&mut inner)
                                .filter(|c| c.kind() != "type")
                                .collect();
                            for target in targets {
                                self.bind_target(file, target);
                            }
                        }
                        _ => self.bind_target(file, param),
                    }
                }
            }
            "assignment" | "augmented_assignment" | "for_statement" | "for_in_clause" => {
                if let Some(left) = node.child_by_field_name("left") {
                    self.bind_target(file, left);
                }
            }
            "as_pattern" => {
                if let Some(alias) = node.child_by_field_name("alias") {
                    self.bind_target(file, alias);
                }
            }
            "named_expression" => {
                if let Some(name) = node.child_by_field_name("name") {
                    self.bind(file, name);
                }
            }
            "except_clause" => {
                let mut cursor = node.walk();
                let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
                for pair in children.windows(2) {
                    if pair[0].kind() == "as" {
                        self.bind_target(file, pair[1]);
                    }
                }
            }
            "global_statement" | "nonlocal_statement" | "case_pattern" | "keyword_pattern" => {
                self.bind_identifiers(file, node);
            }
            "import_statement" => {
                let mut cursor = node.walk();
                let names: Vec<Node<'_>> = node.children_by_field_name("name", &mut cursor).collect();
                for name in names {
                    match name.kind() {
                        // `import a.b` binds `a`
                        "dotted_name" => self.bind_first_segment(file, name),
                        "aliased_import" => {
                            if let Some(alias) = name.child_by_field_name("alias") {
                                self.bind(file, alias);
                            }
                        }
                        _ => {}
                    }
                }
            }
            "import_from_statement" => {
                let mut cursor = node.walk();
                if node.children(&mut cursor).any(|c| c.kind() == "wildcard_import") {
                    self.wildcard = true;
                }
                let names: Vec<Node<'_>> = node.children_by_field_name("name", &mut cursor).collect();
                for name in names {
                    match name.kind() {
                        "dotted_name" => self.bind(file, name),
                        "aliased_import" => {
                            if let Some(alias) = name.child_by_field_name("alias") {
                                self.bind(file, alias);
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    /// Binds the identifiers of an assignment-like target, skipping
    /// attribute and subscript targets (`self.x = ...`, `d[k] = ...`).
    fn bind_target(&mut self, file: &ParsedFile, target: Node<'_>) {
        match target.kind() {
            "identifier" => self.bind(file, target),
            "attribute" | "subscript" => {}
            // Some grammar versions alias the bare identifier itself.
            "as_pattern_target" if target.named_child_count() == 0 => self.bind(file, target),
            _ => {
                let mut cursor = target.walk();
                let children: Vec<Node<'_>> = target.named_children(&mut cursor).collect();
                for child in children {
                    self.bind_target(file, child);
                }
            }
        }
    }

    fn bind_identifiers(&mut self, file: &ParsedFile, node: Node<'_>) {
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
        for child in children {
            if child.kind() == "identifier" {
                self.bind(file, child);
            } else if child.kind() != "dotted_name" {
                self.bind_identifiers(file, child);
            }
        }
    }

    fn bind_first_segment(&mut self, file: &ParsedFile, dotted: Node<'_>) {
        let mut cursor = dotted.walk();
        let first = dotted.named_children(&mut cursor).next();
        if let Some(first) = first {
            self.bind(file, first);
        }
    }
}
