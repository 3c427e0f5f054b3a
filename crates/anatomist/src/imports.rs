//! # Import Collection & Linking
//!
//! Extracts one record per imported name and links records to the module
//! nodes of the analyzed file set. Relative imports (`from ..utils import x`)
//! are resolved against the importing module's package.

use crate::parser::ParsedFile;
use common::{AnalysisError, EdgeKind, GraphEdge, GraphNode, ModuleMeta, EXACT_MATCH_CONFIDENCE, NAME_MATCH_CONFIDENCE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tree_sitter::{Node, Query, QueryCursor, QueryError, StreamingIterator};

/// One imported name.
///
/// - `import a.b as c` → `{ module: "a.b", alias: Some("c") }`
/// - `from p import x` → `{ module: "p.x", alias: None }`
/// - `from .u import h` → `{ module: ".u.h", alias: None }`
/// - `from p import *` → `{ module: "p.*", alias: None }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRecord {
    pub module: String,
    pub alias: Option<String>,
    /// Line number (1-indexed).
    pub line: u32,
}

static IMPORT_QUERY: OnceLock<Result<Query, QueryError>> = OnceLock::new();

fn import_query() -> Result<&'static Query, AnalysisError> {
    IMPORT_QUERY
        .get_or_init(|| {
            Query::new(
                &tree_sitter_python::LANGUAGE.into(),
                r#"
                (import_statement) @import
                (import_from_statement) @import_from
                (future_import_statement) @future
                "#,
            )
        })
        .as_ref()
        .map_err(|e| AnalysisError::Grammar(format!("Invalid import query: {e}")))
}

/// Extracts every import statement, including ones nested in functions.
pub fn extract_imports(file: &ParsedFile) -> Result<Vec<ImportRecord>, AnalysisError> {
    let query = import_query()?;
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(query, file.root(), file.bytes());

    let mut records = Vec::new();
    while let Some(m) = matches.next() {
        for capture in m.captures {
            let node = capture.node;
            match node.kind() {
                "import_statement" => plain_import(file, node, &mut records),
                "import_from_statement" => from_import(file, node, &mut records),
                "future_import_statement" => future_import(file, node, &mut records),
                _ => {}
            }
        }
    }

    records.sort_by_key(|r| r.line);
    Ok(records)
}

fn line_of(node: Node<'_>) -> u32 {
    node.start_position().row as u32 + 1
}

fn plain_import(file: &ParsedFile, node: Node<'_>, out: &mut Vec<ImportRecord>) {
    let line = line_of(node);
    let mut cursor = node.walk();
    for name in node.children_by_field_name("name", &mut cursor) {
        let (module, alias) = split_alias(file, name);
        out.push(ImportRecord { module, alias, line });
    }
}

fn from_import(file: &ParsedFile, node: Node<'_>, out: &mut Vec<ImportRecord>) {
    let line = line_of(node);
    let Some(module_node) = node.child_by_field_name("module_name") else {
        return;
    };
    let base = file.text(module_node).to_string();
    let join = |name: &str| {
        if base.ends_with('.') {
            format!("{base}{name}")
        } else {
            format!("{base}.{name}")
        }
    };

    let mut cursor = node.walk();
    if node.children(&mut cursor).any(|c| c.kind() == "wildcard_import") {
        out.push(ImportRecord {
            module: join("*"),
            alias: None,
            line,
        });
        return;
    }

    for name in node.children_by_field_name("name", &mut cursor) {
        let (imported, alias) = split_alias(file, name);
        out.push(ImportRecord {
            module: join(&imported),
            alias,
            line,
        });
    }
}

/// `from __future__ import x` has no `module_name` field in the grammar.
fn future_import(file: &ParsedFile, node: Node<'_>, out: &mut Vec<ImportRecord>) {
    let line = line_of(node);
    let mut cursor = node.walk();
    for name in node.children_by_field_name("name", &mut cursor) {
        let (feature, alias) = split_alias(file, name);
        out.push(ImportRecord {
            module: format!("__future__.{feature}"),
            alias,
            line,
        });
    }
}

/// `(dotted name, alias)` of an `import` target.
fn split_alias(file: &ParsedFile, name: Node<'_>) -> (String, Option<String>) {
    if name.kind() == "aliased_import" {
        let module = name
            .child_by_field_name("name")
            .map(|n| file.text(n).to_string())
            .unwrap_or_default();
        let alias = name.child_by_field_name("alias").map(|n| file.text(n).to_string());
        (module, alias)
    } else {
        (file.text(name).to_string(), None)
    }
}

/// Module name → module node id for every analyzed file.
#[derive(Debug, Clone, Default)]
pub struct ModuleIndex {
    modules: BTreeMap<String, String>,
}

/// Edges produced for one importing file.
#[derive(Debug, Default)]
pub struct ImportLinks {
    pub edges: Vec<GraphEdge>,
    /// Records naming modules outside the analyzed set.
    pub unresolved: usize,
}

impl ModuleIndex {
    /// Indexes module nodes; the first file claiming a module name keeps it.
    pub fn build<'a>(nodes: impl IntoIterator<Item = &'a GraphNode>) -> Self {
        let mut modules = BTreeMap::new();
        for node in nodes {
            if let Some(meta) = node.as_module() {
                modules
                    .entry(meta.module.clone())
                    .or_insert_with(|| node.id.clone());
            }
        }
        Self { modules }
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Module node id and confidence for one record.
    ///
    /// Tries the full path, then its parent (`from pkg import name` names an
    /// attribute of `pkg`). Each candidate is matched exactly first, then as
    /// a unique dotted suffix of a known module (`utils` → `app.utils`).
    pub fn resolve(&self, importer: &ModuleMeta, record: &ImportRecord) -> Option<(&str, f64)> {
        let absolute = absolutize(importer, &record.module)?;
        let absolute = absolute.strip_suffix(".*").unwrap_or(&absolute);

        let mut candidates = vec![absolute];
        if let Some((parent, _)) = absolute.rsplit_once('.') {
            candidates.push(parent);
        }

        for candidate in candidates {
            if candidate.is_empty() {
                continue;
            }
            if let Some(id) = self.modules.get(candidate) {
                return Some((id.as_str(), EXACT_MATCH_CONFIDENCE));
            }
            let suffix = format!(".{candidate}");
            let mut hits = self.modules.iter().filter(|(name, _)| name.ends_with(&suffix));
            if let (Some((_, id)), None) = (hits.next(), hits.next()) {
                return Some((id.as_str(), NAME_MATCH_CONFIDENCE));
            }
        }
        None
    }

    /// `imports` edges from `importer_id` to every resolvable target.
    pub fn link(&self, importer_id: &str, importer: &ModuleMeta, records: &[ImportRecord]) -> ImportLinks {
        let mut links = ImportLinks::default();
        for record in records {
            match self.resolve(importer, record) {
                Some((target, _)) if target == importer_id => {}
                Some((target, confidence)) => {
                    links
                        .edges
                        .push(GraphEdge::new(importer_id, target, EdgeKind::Imports, confidence));
                }
                None => links.unresolved += 1,
            }
        }
        links
    }
}

/// Strips leading dots from a relative import by walking up the importer's
/// package. `None` when the import climbs above the top-level package.
fn absolutize(importer: &ModuleMeta, module: &str) -> Option<String> {
    let level = module.chars().take_while(|&c| c == '.').count();
    if level == 0 {
        return Some(module.to_string());
    }

    let mut package: Vec<&str> = importer.module.split('.').collect();
    if !importer.is_package {
        package.pop();
    }
    for _ in 1..level {
        package.pop()?;
    }

    let rest = &module[level..];
    if !rest.is_empty() {
        package.push(rest);
    }
    Some(package.join("."))
}
