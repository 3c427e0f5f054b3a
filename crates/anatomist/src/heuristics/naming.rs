//! Naming conventions: `main`, `test_*` and interpreter-invoked dunders.

use super::{Candidate, Heuristic};
use crate::is_dunder;
use common::{EntryPoint, NodeKind};

pub struct NamingHeuristic;

impl Heuristic for NamingHeuristic {
    fn apply(&self, candidate: &Candidate<'_>) -> Option<EntryPoint> {
        if candidate.kind != NodeKind::Function {
            return None;
        }
        match candidate.name {
            "main" if !candidate.is_method => Some(EntryPoint::MainFunction),
            name if name.starts_with("test_") => Some(EntryPoint::TestFunction),
            name if is_dunder(name) => Some(EntryPoint::LifecycleMethod),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParserHost;

    fn check(name: &str, kind: NodeKind, is_method: bool) -> Option<EntryPoint> {
        let mut host = ParserHost::new().unwrap();
        let parsed = host.parse_str("pass\n", "m.py");
        let candidate = Candidate {
            source: parsed.bytes(),
            file_path: "m.py",
            name,
            kind,
            decorators: &[],
            is_method,
        };
        NamingHeuristic.apply(&candidate)
    }

    #[test]
    fn test_main_function() {
        assert_eq!(check("main", NodeKind::Function, false), Some(EntryPoint::MainFunction));
        assert_eq!(check("main", NodeKind::Function, true), None);
    }

    #[test]
    fn test_test_prefix() {
        assert_eq!(check("test_login", NodeKind::Function, false), Some(EntryPoint::TestFunction));
        assert_eq!(check("testing", NodeKind::Function, false), None);
    }

    #[test]
    fn test_dunders() {
        assert_eq!(check("__init__", NodeKind::Function, true), Some(EntryPoint::LifecycleMethod));
        assert_eq!(check("helper", NodeKind::Function, false), None);
        assert_eq!(check("__init__", NodeKind::Class, false), None);
    }
}
