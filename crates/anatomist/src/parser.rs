//! tree-sitter host: parses one source, rejects files with syntax errors and
//! hands the tree to the collectors.

use crate::heuristics::{self, Heuristic};
use crate::imports::{extract_imports, ImportRecord};
use crate::symbols::collect_symbols;
use crate::SourceFile;
use common::{AnalysisError, Deadline, GraphNode};
use tree_sitter::{Node, Parser, Tree};

/// How many nodes a tree walk visits between two deadline checks.
const DEADLINE_STRIDE: usize = 1024;

/// A successfully parsed source file: raw text plus its syntax tree.
///
/// Kept alive between collection and dependency analysis so each file is
/// parsed exactly once.
pub struct ParsedFile {
    pub path: String,
    pub module: String,
    pub is_package: bool,
    pub source: String,
    pub tree: Tree,
}

impl ParsedFile {
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn bytes(&self) -> &[u8] {
        self.source.as_bytes()
    }

    /// Source text covered by `node`.
    pub fn text(&self, node: Node<'_>) -> &str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    /// Id of this file's module node.
    pub fn module_id(&self) -> String {
        GraphNode::make_id(&self.path, &self.module, common::NodeKind::Module, 1)
    }
}

impl std::fmt::Debug for ParsedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParsedFile")
            .field("path", &self.path)
            .field("module", &self.module)
            .field("is_package", &self.is_package)
            .finish_non_exhaustive()
    }
}

/// Everything the per-file collectors produce.
#[derive(Debug)]
pub struct CollectedFile {
    pub parsed: ParsedFile,
    /// Module node first, then definitions and references in walk order.
    pub nodes: Vec<GraphNode>,
    pub imports: Vec<ImportRecord>,
}

/// The parser host for dissecting Python sources.
///
/// # Example
/// ```
/// use anatomist::{ParserHost, SourceFile};
/// use common::Deadline;
///
/// let mut host = ParserHost::with_default_heuristics().unwrap();
/// let src = SourceFile::new("app.py", "def main():\n    pass\n");
/// let collected = host.dissect(&src, &Deadline::unbounded()).unwrap();
/// assert_eq!(collected.nodes.len(), 2);
/// ```
pub struct ParserHost {
    parser: Parser,
    heuristics: Vec<Box<dyn Heuristic>>,
}

impl ParserHost {
    /// Creates a parser host with the Python grammar loaded and no heuristics.
    ///
    /// # Errors
    /// Returns `AnalysisError::Grammar` if the grammar is incompatible with
    /// the linked tree-sitter runtime.
    pub fn new() -> Result<Self, AnalysisError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| AnalysisError::Grammar(format!("Failed to load Python grammar: {e}")))?;

        Ok(Self {
            parser,
            heuristics: Vec::new(),
        })
    }

    /// A host with the stock entry-point heuristics registered.
    pub fn with_default_heuristics() -> Result<Self, AnalysisError> {
        let mut host = Self::new()?;
        for heuristic in heuristics::defaults() {
            host.register_heuristic(heuristic);
        }
        Ok(host)
    }

    /// Heuristics are consulted in registration order; the first match wins.
    pub fn register_heuristic(&mut self, heuristic: Box<dyn Heuristic>) {
        self.heuristics.push(heuristic);
    }

    /// Parses a source. Fails with `AnalysisError::Parse` when the tree
    /// contains any error or missing node, or Python 2 only syntax.
    pub fn parse(&mut self, source: &SourceFile) -> Result<ParsedFile, AnalysisError> {
        if source.text.len() > u32::MAX as usize {
            return Err(AnalysisError::ByteRangeOverflow);
        }

        let tree = self
            .parser
            .parse(source.text.as_bytes(), None)
            .ok_or_else(|| AnalysisError::Parse {
                path: source.path.clone(),
                line: 0,
                column: 0,
                message: "parser returned no tree".to_string(),
            })?;

        let issue = match first_syntax_error(&tree)? {
            Some(issue) => Some(issue),
            None => first_legacy_construct(&tree)?,
        };
        if let Some((line, column, message)) = issue {
            return Err(AnalysisError::Parse {
                path: source.path.clone(),
                line,
                column,
                message,
            });
        }

        Ok(ParsedFile {
            path: source.path.clone(),
            module: source.module_name(),
            is_package: source.is_package(),
            source: source.text.clone(),
            tree,
        })
    }

    /// Parses a source and runs the symbol and import collectors over it.
    pub fn dissect(&mut self, source: &SourceFile, deadline: &Deadline) -> Result<CollectedFile, AnalysisError> {
        deadline.check()?;
        let parsed = self.parse(source)?;
        let nodes = collect_symbols(&parsed, &self.heuristics, deadline)?;
        let imports = extract_imports(&parsed)?;
        tracing::debug!(
            path = %parsed.path,
            nodes = nodes.len(),
            imports = imports.len(),
            "dissected"
        );
        Ok(CollectedFile { parsed, nodes, imports })
    }
}

/// Line (1-based), column and description of a rejected node.
type SyntaxIssue = (u32, u32, String);

fn position(node: Node<'_>, message: String) -> SyntaxIssue {
    let pos = node.start_position();
    (pos.row as u32 + 1, pos.column as u32, message)
}

/// First error or missing node in the tree.
fn first_syntax_error(tree: &Tree) -> Result<Option<SyntaxIssue>, AnalysisError> {
    let root = tree.root_node();
    if !root.has_error() {
        return Ok(None);
    }

    let mut found = None;
    // Only descend into subtrees that contain an error.
    walk_preorder_filtered(root, &Deadline::unbounded(), |node| node.has_error(), |node| {
        if found.is_none() && (node.is_error() || node.is_missing()) {
            let message = if node.is_missing() {
                format!("missing `{}`", node.kind())
            } else {
                "unexpected token".to_string()
            };
            found = Some(position(node, message));
        }
        Ok(())
    })?;

    // `has_error` can be set without a reachable error node; report the root then.
    Ok(found.or_else(|| Some((1, 0, "syntax error".to_string()))))
}

/// First construct the grammar accepts but Python 3 does not: `print` and
/// `exec` statements, `except E, e:` and a bare `x := y` statement.
fn first_legacy_construct(tree: &Tree) -> Result<Option<SyntaxIssue>, AnalysisError> {
    let mut found = None;
    walk_preorder(tree.root_node(), &Deadline::unbounded(), |node| {
        if found.is_some() {
            return Ok(());
        }
        let message = match node.kind() {
            "print_statement" => Some("Python 2 print statement"),
            "exec_statement" => Some("Python 2 exec statement"),
            "except_clause" if has_comma_child(node) => Some("Python 2 `except E, name` clause"),
            "named_expression" if node.parent().is_some_and(|p| p.kind() == "expression_statement") => {
                Some("unparenthesized assignment expression")
            }
            _ => None,
        };
        if let Some(message) = message {
            found = Some(position(node, message.to_string()));
        }
        Ok(())
    })?;
    Ok(found)
}

fn has_comma_child(node: Node<'_>) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|child| child.kind() == ",");
    found
}

/// Iterative pre-order walk over every node under `root`.
///
/// Uses a tree cursor rather than recursion, so deeply nested sources cannot
/// exhaust the stack. The deadline is checked every [`DEADLINE_STRIDE`] nodes.
pub fn walk_preorder<'t, F>(root: Node<'t>, deadline: &Deadline, visit: F) -> Result<(), AnalysisError>
where
    F: FnMut(Node<'t>) -> Result<(), AnalysisError>,
{
    walk_preorder_filtered(root, deadline, |_| true, visit)
}

/// Like [`walk_preorder`], but children of a node are only visited when
/// `descend` returns `true` for it.
pub fn walk_preorder_filtered<'t, D, F>(
    root: Node<'t>,
    deadline: &Deadline,
    mut descend: D,
    mut visit: F,
) -> Result<(), AnalysisError>
where
    D: FnMut(Node<'t>) -> bool,
    F: FnMut(Node<'t>) -> Result<(), AnalysisError>,
{
    let mut cursor = root.walk();
    let mut visited = 0usize;

    loop {
        let node = cursor.node();
        visited += 1;
        if visited % DEADLINE_STRIDE == 0 {
            deadline.check()?;
        }
        visit(node)?;

        if descend(node) && cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
impl ParserHost {
    /// Test helper: parse raw text under a fake path.
    pub(crate) fn parse_str(&mut self, text: &str, path: &str) -> ParsedFile {
        self.parse(&SourceFile::new(path, text)).unwrap()
    }
}
