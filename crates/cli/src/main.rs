use anatomist::scan::ScanOptions;
use clap::{Parser, Subcommand, ValueEnum};
use common::{AnalysisReport, IssueKind};
use oracle::{AnalysisConfig, DetectorKind};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Builds a call/import graph over Python sources and reports structural
/// anomalies: cycles, orphaned code, missing imports and inconsistent APIs.
#[derive(Parser)]
#[command(name = "logic-graph", author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze Python files or directories.
    Analyze {
        /// Files or directories to analyze.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
        /// Comma-separated subset of detectors to run.
        #[arg(long, value_delimiter = ',', value_parser = parse_detector)]
        detectors: Vec<DetectorKind>,
        /// Wall-clock budget for the whole run, in milliseconds.
        #[arg(long, env = "LOGIC_GRAPH_BUDGET_MS")]
        budget_ms: Option<u64>,
        /// Stop enumerating cycles after this many.
        #[arg(long, env = "LOGIC_GRAPH_MAX_CYCLES", default_value_t = oracle::config::DEFAULT_MAX_CYCLES)]
        max_cycles: usize,
        /// Extra directory names to skip during discovery.
        #[arg(long)]
        exclude: Vec<String>,
        /// Analyze on the current thread only.
        #[arg(long)]
        serial: bool,
        /// Insert the first suggested import for every missing-import issue.
        #[arg(long)]
        fix_imports: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Text,
}

fn parse_detector(s: &str) -> Result<DetectorKind, String> {
    s.parse()
}

fn main() -> ExitCode {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("warning: .env: {}", e);
        }
    }

    let cli = Cli::parse();

    // Logs go to stderr so JSON on stdout stays pipeable.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("warn,anatomist=info,oracle=info,logic_graph=info"),
        2 => EnvFilter::new("warn,anatomist=debug,oracle=debug,logic_graph=debug"),
        _ => EnvFilter::new("trace"),
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn run(command: Commands) -> anyhow::Result<ExitCode> {
    match command {
        Commands::Analyze {
            paths,
            format,
            detectors,
            budget_ms,
            max_cycles,
            exclude,
            serial,
            fix_imports,
        } => {
            let config = AnalysisConfig {
                detectors: if detectors.is_empty() {
                    DetectorKind::ALL.to_vec()
                } else {
                    detectors
                },
                time_budget_ms: budget_ms,
                max_cycles,
                parallel: !serial,
                ..AnalysisConfig::default()
            };
            let mut scan = ScanOptions::default();
            scan.exclude.extend(exclude);

            cmd_analyze(&paths, &scan, &config, format, fix_imports)
        }
    }
}

// ---------------------------------------------------------------------------
// analyze
// ---------------------------------------------------------------------------

fn cmd_analyze(
    paths: &[PathBuf],
    scan: &ScanOptions,
    config: &AnalysisConfig,
    format: Format,
    fix_imports: bool,
) -> anyhow::Result<ExitCode> {
    let analysis = oracle::analyze_paths(paths, scan, config)?;
    let report = &analysis.report;

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(report)?),
        Format::Text => print_text(report),
    }

    if fix_imports {
        let plan = oracle::fixes::plan(report, &analysis.graph);
        let changed = oracle::fixes::apply(&plan)?;
        tracing::info!(files = changed.len(), "import fixes applied");
        for path in &changed {
            eprintln!("fixed imports in {path}");
        }
    }

    let d = &report.diagnostics;
    if d.files_analyzed == 0 && !report.skipped_files.is_empty() {
        return Ok(ExitCode::from(2));
    }
    Ok(if report.issues.has_blocking() {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    })
}

fn print_text(report: &AnalysisReport) {
    let d = &report.diagnostics;
    println!("+------------------------------------------+");
    println!("| LOGIC GRAPH ANALYSIS                     |");
    println!("+------------------------------------------+");
    println!("| Files analyzed : {:>23} |", d.files_analyzed);
    println!("| Files skipped  : {:>23} |", report.skipped_files.len());
    println!("| Nodes          : {:>23} |", report.nodes_total);
    println!("| Edges          : {:>23} |", report.edges_total);
    println!("| Components     : {:>23} |", report.stats.weak_components);
    println!("| Density        : {:>23.4} |", report.stats.density);
    println!("+------------------------------------------+");

    for kind in IssueKind::ALL {
        let issues = report.issues.bucket(kind);
        if issues.is_empty() {
            continue;
        }
        println!("\n{} ({}):", kind.as_str().to_uppercase(), issues.len());
        for issue in issues {
            println!("  [{}] {}", issue.severity, issue.description);
            if let Some(fix) = issue.suggested_fixes.first() {
                println!("      fix: {fix}");
            }
        }
    }
    if report.issues.is_empty() {
        println!("No issues detected.");
    }

    if !report.skipped_files.is_empty() {
        println!("\nSKIPPED FILES:");
        for path in &report.skipped_files {
            println!("  {path}");
        }
    }

    if report.truncated {
        println!(
            "\nwarning: time budget exceeded; {} file(s) not processed, results are partial",
            d.unprocessed_files
        );
    }
}
