//! Entry-point heuristics.
//!
//! A definition tagged by a heuristic is invoked from outside the analyzed
//! code (a test runner, a web framework, the interpreter itself) and is
//! never reported as orphaned.

pub mod decorators;
pub mod naming;
pub mod pytest;

use common::{EntryPoint, NodeKind};

/// A function or class definition being collected.
pub struct Candidate<'a> {
    /// Complete file source.
    pub source: &'a [u8],
    /// Normalized file path.
    pub file_path: &'a str,
    pub name: &'a str,
    pub kind: NodeKind,
    /// Decorator names with call arguments stripped.
    pub decorators: &'a [String],
    pub is_method: bool,
}

/// Decides whether a definition is an externally invoked entry point.
///
/// # Implementation Notes
/// - Heuristics are applied during collection, not as a separate pass
/// - The first heuristic to return `Some(EntryPoint)` wins
/// - Implementations run for every definition in every file; keep them cheap
///
/// # Example
/// ```
/// use anatomist::heuristics::{Candidate, Heuristic};
/// use common::EntryPoint;
///
/// struct CliModule;
///
/// impl Heuristic for CliModule {
///     fn apply(&self, candidate: &Candidate<'_>) -> Option<EntryPoint> {
///         candidate
///             .file_path
///             .ends_with("__main__.py")
///             .then_some(EntryPoint::MainFunction)
///     }
/// }
/// ```
pub trait Heuristic {
    fn apply(&self, candidate: &Candidate<'_>) -> Option<EntryPoint>;
}

/// The stock heuristic set, in precedence order.
pub fn defaults() -> Vec<Box<dyn Heuristic>> {
    vec![
        Box::new(pytest::PytestHeuristic),
        Box::new(decorators::FrameworkDecoratorHeuristic),
        Box::new(naming::NamingHeuristic),
    ]
}

/// First tag returned by `heuristics` for `candidate`.
pub fn classify(heuristics: &[Box<dyn Heuristic>], candidate: &Candidate<'_>) -> Option<EntryPoint> {
    heuristics.iter().find_map(|h| h.apply(candidate))
}

/// Searches for a byte sequence within another byte slice.
pub(crate) fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() {
        return true;
    }
    if needle.len() > haystack.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}
