//! # Analysis Pipeline
//!
//! collect (parallel) → symbol table → dependencies (parallel) → imports →
//! assemble (serial) → detectors (parallel) → report.
//!
//! Per-file failures land in `skipped_files` and `diagnostics.errors`. A
//! spent budget stops each stage where it is and the partial graph is still
//! assembled and reported as `truncated`.

use crate::{registry, AnalysisConfig, Detection, DetectorKind};
use crate::missing_imports::MissingImportDetector;
use anatomist::parser::CollectedFile;
use anatomist::scan::{load_sources, ScanOptions};
use anatomist::{DependencyAnalyzer, LogicGraph, ModuleIndex, NameResolver, ParserHost, SourceFile};
use common::{AnalysisError, AnalysisReport, Deadline, Diagnostics, GraphEdge, IssueBuckets, SymbolTable};
use rayon::prelude::*;
use std::path::PathBuf;

/// A finished run: the report plus the graph it was computed from.
#[derive(Debug)]
pub struct Analysis {
    pub report: AnalysisReport,
    pub graph: LogicGraph,
}

/// Outcome bookkeeping shared across stages.
#[derive(Default)]
struct RunState {
    skipped_files: Vec<String>,
    diagnostics: Diagnostics,
    truncated: bool,
}

impl RunState {
    fn skip_file(&mut self, path: &str, err: AnalysisError) {
        tracing::warn!(path, error = %err, "skipping file");
        self.skipped_files.push(path.to_string());
        self.diagnostics.errors.push(err.to_string());
    }

    fn leave_unprocessed(&mut self) {
        self.truncated = true;
        self.diagnostics.unprocessed_files += 1;
    }
}

/// Runs the whole pipeline over in-memory sources.
///
/// # Errors
/// Only internal failures (grammar setup) are returned; per-file problems
/// (see [`AnalysisError::is_per_file`]) are folded into the report.
pub fn run(mut sources: Vec<SourceFile>, config: &AnalysisConfig) -> Result<Analysis, AnalysisError> {
    let deadline = Deadline::new(config.time_budget());
    sources.sort_by(|a, b| a.path.cmp(&b.path));
    sources.dedup_by(|a, b| a.path == b.path);

    let mut state = RunState::default();

    // Phase 1: per-file collection
    let outcomes = collect_files(&sources, &deadline, config.parallel);
    let mut files: Vec<CollectedFile> = Vec::with_capacity(outcomes.len());
    for (source, outcome) in sources.iter().zip(outcomes) {
        match outcome {
            Ok(file) => files.push(file),
            Err(err) if err.is_per_file() => state.skip_file(&source.path, err),
            Err(AnalysisError::BudgetExceeded(_)) => state.leave_unprocessed(),
            Err(err) => return Err(err),
        }
    }
    state.diagnostics.files_analyzed = files.len();
    tracing::info!(
        files = files.len(),
        skipped = state.skipped_files.len(),
        elapsed_ms = deadline.elapsed().as_millis() as u64,
        "collection finished"
    );

    // Phase 2: immutable snapshot of every definition
    let table = SymbolTable::build(files.iter().flat_map(|f| f.nodes.iter()));
    let resolver = NameResolver::new(&table);
    let analyzer = DependencyAnalyzer::new(&resolver).resolve_constructors(config.resolve_constructor_calls);
    tracing::debug!(
        symbols = table.symbol_count(),
        ambiguous = table.ambiguous_keys().count(),
        "symbol table built"
    );

    // Phase 3: calls and inherits edges
    let analyze_file = |file: &CollectedFile| analyzer.analyze(&file.parsed, &file.nodes, &deadline);
    let dependencies: Vec<_> = if config.parallel {
        files.par_iter().map(analyze_file).collect()
    } else {
        files.iter().map(analyze_file).collect()
    };

    let mut edges: Vec<GraphEdge> = Vec::new();
    for (file, outcome) in files.iter().zip(dependencies) {
        match outcome {
            Ok(deps) => {
                state.diagnostics.unresolved_calls += deps.unresolved_calls;
                edges.extend(deps.edges);
            }
            Err(AnalysisError::BudgetExceeded(_)) => state.truncated = true,
            Err(err) => state.diagnostics.errors.push(format!("{}: {err}", file.parsed.path)),
        }
    }

    // Phase 4: imports edges between analyzed modules
    let modules = ModuleIndex::build(files.iter().flat_map(|f| f.nodes.iter()));
    for file in &files {
        let Some((module_id, meta)) = file
            .nodes
            .iter()
            .find_map(|n| n.as_module().map(|meta| (n.id.as_str(), meta)))
        else {
            continue;
        };
        let links = modules.link(module_id, meta, &file.imports);
        state.diagnostics.unresolved_imports += links.unresolved;
        edges.extend(links.edges);
    }

    // Phase 5: single-threaded assembly
    let mut graph = LogicGraph::new();
    for file in files {
        for node in file.nodes {
            graph.add_node(node);
        }
    }
    for edge in edges {
        graph.add_edge(edge);
    }
    let assembly = graph.stats();
    state.diagnostics.duplicate_node_ids = assembly.duplicate_nodes;
    state.diagnostics.duplicate_edges = assembly.duplicate_edges;
    state.diagnostics.dangling_edges = assembly.dangling_edges;
    state.diagnostics.unresolved_references = MissingImportDetector::unknown_undefined(&graph);
    tracing::info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        dropped_edges = assembly.duplicate_edges + assembly.dangling_edges,
        "graph assembled"
    );

    // Phase 6: detectors
    let detectors = registry(&config.detectors, config);
    let detections: Vec<(DetectorKind, Result<Detection, AnalysisError>)> = if config.parallel {
        detectors
            .par_iter()
            .map(|d| (d.kind(), d.detect(&graph, &deadline)))
            .collect()
    } else {
        detectors
            .iter()
            .map(|d| (d.kind(), d.detect(&graph, &deadline)))
            .collect()
    };

    let mut issues = Vec::new();
    for (kind, outcome) in detections {
        match outcome {
            Ok(detection) => {
                tracing::debug!(detector = %kind, issues = detection.issues.len(), "detector finished");
                state.truncated |= detection.truncated;
                issues.extend(detection.issues);
            }
            Err(AnalysisError::BudgetExceeded(_)) => state.truncated = true,
            Err(err) => state.diagnostics.errors.push(format!("{kind}: {err}")),
        }
    }
    let issues: IssueBuckets = issues.into_iter().collect();

    let mut stats = graph.summary();
    stats.cycles = issues.circular_dependency.len();

    if state.truncated {
        tracing::warn!(
            budget_ms = config.time_budget_ms,
            unprocessed = state.diagnostics.unprocessed_files,
            "time budget exceeded, report is partial"
        );
    }
    tracing::info!(
        issues = issues.len(),
        elapsed_ms = deadline.elapsed().as_millis() as u64,
        "analysis finished"
    );

    let report = AnalysisReport {
        nodes_total: graph.node_count(),
        edges_total: graph.edge_count(),
        skipped_files: state.skipped_files,
        issues,
        truncated: state.truncated,
        diagnostics: state.diagnostics,
        stats,
    };
    Ok(Analysis { report, graph })
}

/// Dissects every source, one parser per rayon worker.
fn collect_files(sources: &[SourceFile], deadline: &Deadline, parallel: bool) -> Vec<Result<CollectedFile, AnalysisError>> {
    let dissect = |host: &mut Result<ParserHost, AnalysisError>, source: &SourceFile| match host {
        Ok(host) => host.dissect(source, deadline),
        Err(err) => Err(AnalysisError::Grammar(err.to_string())),
    };

    if parallel {
        sources
            .par_iter()
            .map_init(ParserHost::with_default_heuristics, dissect)
            .collect()
    } else {
        let mut host = ParserHost::with_default_heuristics();
        sources.iter().map(|source| dissect(&mut host, source)).collect()
    }
}

/// Runs the pipeline and keeps only the report.
pub fn analyze(sources: Vec<SourceFile>, config: &AnalysisConfig) -> Result<AnalysisReport, AnalysisError> {
    run(sources, config).map(|analysis| analysis.report)
}

/// Discovers and loads `.py` files under `roots`, then analyzes them.
/// Files that cannot be read are reported as skipped.
pub fn analyze_paths(
    roots: &[PathBuf],
    scan: &ScanOptions,
    config: &AnalysisConfig,
) -> Result<Analysis, AnalysisError> {
    let loaded = load_sources(roots, scan)?;
    let mut analysis = run(loaded.sources, config)?;

    let report = &mut analysis.report;
    for (path, err) in loaded.failures {
        report.diagnostics.errors.push(err.to_string());
        report.skipped_files.push(path);
    }
    report.skipped_files.sort();
    Ok(analysis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::IssueKind;

    fn serial() -> AnalysisConfig {
        AnalysisConfig {
            parallel: false,
            ..AnalysisConfig::default()
        }
    }

    fn source(path: &str, text: &str) -> SourceFile {
        SourceFile::new(path, text)
    }

    fn report(sources: Vec<SourceFile>) -> AnalysisReport {
        analyze(sources, &AnalysisConfig::default()).unwrap()
    }

    #[test]
    fn test_three_function_cycle() {
        let report = report(vec![source(
            "loop.py",
            "def a():\n    b()\n\ndef b():\n    c()\n\ndef c():\n    a()\n",
        )]);

        let cycles = &report.issues.circular_dependency;
        assert_eq!(cycles.len(), 1);
        assert_eq!(
            cycles[0].node_ids,
            vec!["loop.py:a:function:1", "loop.py:b:function:4", "loop.py:c:function:7"]
        );
        assert_eq!(cycles[0].severity, common::Severity::Critical);
        assert_eq!(report.stats.cycles, 1);
    }

    #[test]
    fn test_uncalled_helper_reported_once() {
        let report = report(vec![source(
            "app.py",
            "def helper():\n    return 1\n\ndef main():\n    print('hi')\n",
        )]);

        let orphans: Vec<&str> = report
            .issues
            .orphaned_code
            .iter()
            .map(|i| i.node_ids[0].as_str())
            .collect();
        assert_eq!(orphans, vec!["app.py:helper:function:1"]);
    }

    #[test]
    fn test_json_usage_suggests_import() {
        let report = report(vec![source("io_utils.py", "def load(s):\n    return json.loads(s)\n")]);

        let missing = &report.issues.missing_import;
        assert_eq!(missing.len(), 1);
        assert!(missing[0].node_ids[0].starts_with("io_utils.py:json:name_reference:2"));
        assert!(missing[0].suggested_fixes.contains(&"import json".to_string()));
    }

    #[test]
    fn test_unrelated_file_does_not_change_findings() {
        let a = source(
            "a.py",
            "def helper(x: int):\n    return json.dumps(x)\n\ndef ping():\n    pong()\n\ndef pong():\n    ping()\n\nclass Box:\n    def helper(self, x: str):\n        pass\n",
        );
        let b = source("b.py", "def main():\n    print('unrelated')\n");

        let config = AnalysisConfig::default();
        let before = run(vec![a.clone()], &config).unwrap();
        let after = run(vec![a, b.clone()], &config).unwrap();
        let b_alone = analyze(vec![b], &config).unwrap();

        for kind in IssueKind::ALL {
            assert!(!before.report.issues.bucket(kind).is_empty(), "{kind} bucket is empty");
            assert_eq!(before.report.issues.bucket(kind), after.report.issues.bucket(kind), "{kind}");
        }
        assert_eq!(after.report.nodes_total, before.report.nodes_total + b_alone.nodes_total);
        assert_eq!(after.report.edges_total, before.report.edges_total + b_alone.edges_total);

        let ids_in_a = |graph: &LogicGraph| -> Vec<String> {
            graph
                .nodes()
                .filter(|n| n.source_file == "a.py")
                .map(|n| n.id.clone())
                .collect()
        };
        assert_eq!(ids_in_a(&before.graph), ids_in_a(&after.graph));
    }

    #[test]
    fn test_recursive_function_not_orphaned() {
        let report = report(vec![source("r.py", "def walk(n):\n    return walk(n - 1)\n")]);
        assert!(report.issues.orphaned_code.is_empty());
        assert!(report.issues.circular_dependency.is_empty());
    }

    #[test]
    fn test_uppercase_module_name_suggests_import() {
        let report = report(vec![source("codec.py", "def load(s):\n    return JSON.loads(s)\n")]);

        let missing = &report.issues.missing_import;
        assert_eq!(missing.len(), 1);
        assert!(missing[0].node_ids[0].starts_with("codec.py:JSON:name_reference:2"));
        assert!(missing[0].suggested_fixes.contains(&"import json".to_string()));
        assert_eq!(report.diagnostics.unresolved_references, 0);
    }

    #[test]
    fn test_python2_file_skipped() {
        let analysis = run(
            vec![
                source("legacy.py", "def main():\n    print \"hi\"\n"),
                source("handler.py", "try:\n    pass\nexcept ValueError, e:\n    pass\n"),
                source("modern.py", "def main():\n    print(\"hi\")\n"),
            ],
            &serial(),
        )
        .unwrap();

        assert_eq!(analysis.report.skipped_files, vec!["handler.py", "legacy.py"]);
        assert_eq!(analysis.report.diagnostics.files_analyzed, 1);
        assert!(analysis.graph.nodes().all(|n| n.source_file == "modern.py"));
    }

    #[test]
    fn test_two_file_scenario() {
        let report = report(vec![
            source("a.py", "def foo(): pass\n"),
            source("b.py", "bar_result = undefined_name_xyz\n"),
        ]);

        assert_eq!(report.issues.orphaned_code.len(), 1);
        assert_eq!(report.issues.orphaned_code[0].node_ids[0], "a.py:foo:function:1");
        assert!(report.issues.missing_import.is_empty());
        assert_eq!(report.diagnostics.unresolved_references, 1);
    }

    #[test]
    fn test_counts_match_graph() {
        let analysis = run(
            vec![source("m.py", "class A:\n    pass\n\nclass B(A):\n    def go(self):\n        A()\n")],
            &AnalysisConfig::default(),
        )
        .unwrap();

        assert_eq!(analysis.report.nodes_total, analysis.graph.node_count());
        assert_eq!(analysis.report.edges_total, analysis.graph.edge_count());
        for edge in analysis.graph.edges() {
            assert!(analysis.graph.contains(&edge.source_id));
            assert!(analysis.graph.contains(&edge.target_id));
        }
    }

    #[test]
    fn test_broken_file_skipped() {
        let analysis = run(
            vec![source("bad.py", "def broken(:\n    pass\n"), source("good.py", "def main():\n    pass\n")],
            &AnalysisConfig::default(),
        )
        .unwrap();

        assert_eq!(analysis.report.skipped_files, vec!["bad.py"]);
        assert_eq!(analysis.report.diagnostics.files_analyzed, 1);
        assert_eq!(analysis.report.diagnostics.errors.len(), 1);
        assert!(analysis.graph.nodes().all(|n| n.source_file != "bad.py"));
    }

    #[test]
    fn test_imports_link_modules() {
        let analysis = run(
            vec![
                source("app/main.py", "from app import util\n\ndef main():\n    util.run()\n"),
                source("app/util.py", "def run():\n    pass\n"),
            ],
            &serial(),
        )
        .unwrap();

        let imports: Vec<_> = analysis
            .graph
            .edges()
            .filter(|e| e.kind == common::EdgeKind::Imports)
            .collect();
        assert_eq!(imports.len(), 1);
        assert!(analysis.report.issues.orphaned_code.is_empty());
    }

    #[test]
    fn test_output_is_byte_identical() {
        let sources = vec![
            source("a.py", "import os\n\ndef f(x: int):\n    g()\n\ndef g():\n    f(1)\n"),
            source("b.py", "def f(x: str):\n    return np.zeros(x)\n"),
            source("c.py", "class Thing:\n    def __init__(self):\n        pass\n"),
        ];
        let first = serde_json::to_string(&analyze(sources.clone(), &AnalysisConfig::default()).unwrap()).unwrap();
        let second = serde_json::to_string(&analyze(sources.clone(), &AnalysisConfig::default()).unwrap()).unwrap();
        let serial_run = serde_json::to_string(&analyze(sources, &serial()).unwrap()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, serial_run);
    }

    #[test]
    fn test_zero_budget_truncates() {
        let config = AnalysisConfig {
            time_budget_ms: Some(0),
            ..AnalysisConfig::default()
        };
        let report = analyze(vec![source("a.py", "def f():\n    pass\n")], &config).unwrap();

        assert!(report.truncated);
        assert_eq!(report.diagnostics.unprocessed_files, 1);
        assert!(report.skipped_files.is_empty());
    }

    #[test]
    fn test_detector_selection() {
        let config = AnalysisConfig {
            detectors: vec![DetectorKind::MissingImport],
            ..AnalysisConfig::default()
        };
        let sources = vec![source("a.py", "def helper():\n    os.getcwd()\n")];
        let subset = analyze(sources.clone(), &config).unwrap();
        let full = report(sources);

        assert_eq!(subset.issues.missing_import.len(), 1);
        assert_eq!(subset.issues.missing_import, full.issues.missing_import);
        assert!(!full.issues.orphaned_code.is_empty());
        assert!(subset.issues.orphaned_code.is_empty());
        assert!(subset.issues.circular_dependency.is_empty());
        assert!(subset.issues.inconsistent_api.is_empty());
    }

    #[test]
    fn test_analyze_paths_reports_unreadable_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ok.py"), "def main():\n    pass\n").unwrap();
        std::fs::write(dir.path().join("latin.py"), [0x23, 0x20, 0xe9, 0x0a]).unwrap();

        let analysis = analyze_paths(
            &[dir.path().to_path_buf()],
            &ScanOptions::default(),
            &AnalysisConfig::default(),
        )
        .unwrap();
        assert_eq!(analysis.report.diagnostics.files_analyzed, 1);
        assert_eq!(analysis.report.skipped_files.len(), 1);
        assert!(analysis.report.skipped_files[0].ends_with("latin.py"));
    }
}
