//! # Import Fixes
//!
//! Turns `missing_import` issues into edits. Each affected file gets the
//! first suggestion of every issue inserted below its header: shebang,
//! encoding line, module docstring and the existing top-of-file imports.

use anatomist::LogicGraph;
use common::{AnalysisError, AnalysisReport};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// Imports to add, keyed by source file path.
pub type ImportPlan = BTreeMap<String, BTreeSet<String>>;

/// Collects the first suggested import of each `missing_import` issue.
pub fn plan(report: &AnalysisReport, graph: &LogicGraph) -> ImportPlan {
    let mut plan = ImportPlan::new();
    for issue in &report.issues.missing_import {
        let Some(import) = issue.suggested_fixes.first() else {
            continue;
        };
        for id in &issue.node_ids {
            if let Some(node) = graph.node(id) {
                plan.entry(node.source_file.clone())
                    .or_default()
                    .insert(import.clone());
            }
        }
    }
    plan
}

/// Byte offset where new imports go.
pub fn insert_position(source: &str) -> usize {
    let lines: Vec<(usize, &str)> = source
        .split_inclusive('\n')
        .scan(0, |offset, line| {
            let start = *offset;
            *offset += line.len();
            Some((start, line))
        })
        .collect();
    let end_of = |i: usize| lines.get(i).map_or(source.len(), |(start, _)| *start);

    let mut i = 0;
    let mut insert_at = 0;

    // shebang and encoding declaration
    while i < lines.len() && i < 2 {
        let line = lines[i].1.trim_end();
        if (i == 0 && line.starts_with("#!")) || (line.starts_with('#') && line.contains("coding")) {
            i += 1;
            insert_at = i;
        } else {
            break;
        }
    }

    i = skip_trivia(&lines, i);
    if let Some(after) = lines.get(i).and_then(|_| skip_docstring(&lines, i)) {
        i = after;
        insert_at = i;
    }

    loop {
        let next = skip_trivia(&lines, i);
        match lines.get(next) {
            Some((_, line)) if is_import(line) => {
                i = skip_statement(&lines, next);
                insert_at = i;
            }
            _ => break,
        }
    }

    end_of(insert_at)
}

/// Inserts the imports the file lacks. `None` when nothing changes.
///
/// New lines use the file's own line ending (`\r\n` if it has any).
pub fn insert_imports(source: &str, imports: &[String]) -> Option<String> {
    let existing: BTreeSet<&str> = source.lines().map(strip_comment).collect();
    let mut wanted: Vec<&str> = Vec::new();
    for import in imports {
        let import = import.trim();
        if !import.is_empty() && !existing.contains(import) && !wanted.contains(&import) {
            wanted.push(import);
        }
    }
    if wanted.is_empty() {
        return None;
    }

    let newline = if source.contains("\r\n") { "\r\n" } else { "\n" };
    let position = insert_position(source);
    let mut block = String::new();
    if position == source.len() && !source.is_empty() && !source.ends_with('\n') {
        block.push_str(newline);
    }
    for import in wanted {
        block.push_str(import);
        block.push_str(newline);
    }

    let mut out = String::with_capacity(source.len() + block.len());
    out.push_str(&source[..position]);
    out.push_str(&block);
    out.push_str(&source[position..]);
    Some(out)
}

/// Rewrites each planned file in place. Returns the paths that changed.
///
/// # Errors
/// Stops at the first file that cannot be read or written.
pub fn apply(plan: &ImportPlan) -> Result<Vec<String>, AnalysisError> {
    let mut changed = Vec::new();
    for (path, imports) in plan {
        let source = fs::read_to_string(Path::new(path))?;
        let imports: Vec<String> = imports.iter().cloned().collect();
        if let Some(updated) = insert_imports(&source, &imports) {
            fs::write(Path::new(path), updated)?;
            tracing::info!(path = %path, added = imports.len(), "imports inserted");
            changed.push(path.clone());
        }
    }
    Ok(changed)
}

/// Code part of a line, without its trailing comment.
fn strip_comment(line: &str) -> &str {
    line.split('#').next().unwrap_or("").trim()
}

fn is_import(line: &str) -> bool {
    let line = line.trim_start();
    line.starts_with("import ") || line.starts_with("from ")
}

/// First index at or after `i` that is not blank or a comment.
fn skip_trivia(lines: &[(usize, &str)], mut i: usize) -> usize {
    while let Some((_, line)) = lines.get(i) {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            i += 1;
        } else {
            break;
        }
    }
    i
}

/// Index past a module docstring starting at `i`, if there is one.
fn skip_docstring(lines: &[(usize, &str)], i: usize) -> Option<usize> {
    let first = lines[i].1.trim();
    let body = first.trim_start_matches(['r', 'R', 'u', 'U']);
    let quote = ["\"\"\"", "'''"].into_iter().find(|q| body.starts_with(q))?;

    if body[quote.len()..].contains(quote) {
        return Some(i + 1);
    }
    (i + 1..lines.len())
        .find(|&j| lines[j].1.contains(quote))
        .map(|j| j + 1)
}

/// Index past one statement, following parentheses and backslash continuations.
fn skip_statement(lines: &[(usize, &str)], mut i: usize) -> usize {
    let mut depth: i32 = 0;
    while let Some((_, line)) = lines.get(i) {
        let code = line.split('#').next().unwrap_or("");
        depth += code.matches('(').count() as i32 - code.matches(')').count() as i32;
        i += 1;
        if depth <= 0 && !code.trim_end().ends_with('\\') {
            break;
        }
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    fn imports(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_file() {
        assert_eq!(insert_imports("", &imports(&["import json"])).unwrap(), "import json\n");
    }

    #[test]
    fn test_after_shebang_and_docstring() {
        let src = "#!/usr/bin/env python\n# -*- coding: utf-8 -*-\n\"\"\"Tool.\n\nMore.\n\"\"\"\n\ndef f():\n    return json.dumps({})\n";
        let out = insert_imports(src, &imports(&["import json"])).unwrap();
        assert_eq!(
            out,
            "#!/usr/bin/env python\n# -*- coding: utf-8 -*-\n\"\"\"Tool.\n\nMore.\n\"\"\"\nimport json\n\ndef f():\n    return json.dumps({})\n"
        );
    }

    #[test]
    fn test_after_existing_import_block() {
        let src = "import os\nfrom typing import (\n    Any,\n    Dict,\n)\n\nx = os.getcwd()\n";
        let out = insert_imports(src, &imports(&["import sys"])).unwrap();
        assert!(out.starts_with("import os\nfrom typing import (\n    Any,\n    Dict,\n)\nimport sys\n\nx = "));
    }

    #[test]
    fn test_single_line_docstring() {
        let src = "'''Doc.'''\nimport os\nprint(os.sep)\n";
        assert_eq!(insert_position(src), "'''Doc.'''\nimport os\n".len());
    }

    #[test]
    fn test_existing_import_not_duplicated() {
        let src = "import json\n\njson.loads('1')\n";
        assert!(insert_imports(src, &imports(&["import json"])).is_none());
        let out = insert_imports(src, &imports(&["import json", "import re", "import re"])).unwrap();
        assert_eq!(out.matches("import re").count(), 1);
        assert_eq!(out.matches("import json").count(), 1);
    }

    #[test]
    fn test_commented_import_counts_as_present() {
        let src = "import json  # noqa: F401\n\njson.loads('1')\n";
        assert!(insert_imports(src, &imports(&["import json"])).is_none());
    }

    #[test]
    fn test_crlf_line_endings_kept() {
        let src = "\"\"\"Doc.\"\"\"\r\nimport os\r\n\r\nx = 1\r\n";
        let out = insert_imports(src, &imports(&["import re"])).unwrap();
        assert_eq!(out, "\"\"\"Doc.\"\"\"\r\nimport os\r\nimport re\r\n\r\nx = 1\r\n");

        let out = insert_imports("import os\r\nimport sys", &imports(&["import re"])).unwrap();
        assert_eq!(out, "import os\r\nimport sys\r\nimport re\r\n");
    }

    #[test]
    fn test_source_without_trailing_newline() {
        let out = insert_imports("import os", &imports(&["import re"])).unwrap();
        assert_eq!(out, "import os\nimport re\n");
    }

    #[test]
    fn test_apply_rewrites_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tool.py");
        fs::write(&path, "def f():\n    return os.getcwd()\n").unwrap();

        let key = path.to_string_lossy().to_string();
        let mut plan = ImportPlan::new();
        plan.entry(key.clone()).or_default().insert("import os".to_string());

        assert_eq!(apply(&plan).unwrap(), vec![key]);
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("import os\ndef f():"));
        assert!(apply(&plan).unwrap().is_empty());
    }

    #[test]
    fn test_plan_from_report() {
        let analysis = crate::run(
            vec![anatomist::SourceFile::new("a.py", "def f():\n    return np.zeros(3), json.dumps(1)\n")],
            &crate::AnalysisConfig::default(),
        )
        .unwrap();
        let plan = plan(&analysis.report, &analysis.graph);
        let wanted: Vec<&str> = plan["a.py"].iter().map(String::as_str).collect();
        assert_eq!(wanted, vec!["import json", "import numpy as np"]);
    }
}
