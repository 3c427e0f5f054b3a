//! pytest discovery rules.
//!
//! - Functions decorated with `@pytest.fixture` / `@fixture`
//! - Every function defined in a `conftest.py` that mentions pytest
//! - `Test*` classes inside `test_*.py` / `*_test.py` modules

use super::{contains_bytes, Candidate, Heuristic};
use common::wisdom::PYTEST_DECORATORS;
use common::{EntryPoint, NodeKind};

pub struct PytestHeuristic;

impl Heuristic for PytestHeuristic {
    fn apply(&self, candidate: &Candidate<'_>) -> Option<EntryPoint> {
        if candidate.decorators.iter().any(|d| PYTEST_DECORATORS.matches(d)) {
            return Some(EntryPoint::PytestFixture);
        }

        // conftest fixtures are visible to the whole directory tree.
        if candidate.kind == NodeKind::Function
            && is_conftest(candidate.file_path)
            && (contains_bytes(candidate.source, b"pytest") || contains_bytes(candidate.source, b"@fixture"))
        {
            return Some(EntryPoint::PytestFixture);
        }

        if candidate.kind == NodeKind::Class
            && candidate.name.starts_with("Test")
            && is_test_module(candidate.file_path)
        {
            return Some(EntryPoint::TestClass);
        }

        None
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn is_conftest(path: &str) -> bool {
    file_name(path) == "conftest.py"
}

fn is_test_module(path: &str) -> bool {
    let name = file_name(path);
    name.starts_with("test_") || name.ends_with("_test.py")
}
