use std::time::Duration;

/// Errors raised while collecting or analyzing sources.
///
/// Per-file variants never abort a run; the pipeline records them in the
/// report and moves on to the next file.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Syntax error in {path} at {line}:{column}: {message}")]
    Parse {
        path: String,
        line: u32,
        column: u32,
        message: String,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Source is not valid UTF-8: {0}")]
    Encoding(String),
    #[error("Byte range overflow: file size exceeds 4GB limit")]
    ByteRangeOverflow,
    #[error("Grammar setup failed: {0}")]
    Grammar(String),
    #[error("Analysis budget of {0:?} exceeded")]
    BudgetExceeded(Duration),
}

impl AnalysisError {
    /// True for failures that mean "this one file could not be read or parsed".
    pub fn is_per_file(&self) -> bool {
        matches!(
            self,
            AnalysisError::Parse { .. }
                | AnalysisError::Io(_)
                | AnalysisError::Encoding(_)
                | AnalysisError::ByteRangeOverflow
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_file_classification() {
        let parse = AnalysisError::Parse {
            path: "a.py".into(),
            line: 1,
            column: 0,
            message: "syntax error".into(),
        };
        assert!(parse.is_per_file());
        assert!(AnalysisError::Encoding("b.py".into()).is_per_file());
        assert!(AnalysisError::ByteRangeOverflow.is_per_file());
        assert!(AnalysisError::from(std::io::Error::other("gone")).is_per_file());

        assert!(!AnalysisError::Grammar("bad query".into()).is_per_file());
        assert!(!AnalysisError::BudgetExceeded(Duration::ZERO).is_per_file());
    }
}
