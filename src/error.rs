use std::fmt;

use thiserror::Error;

/// Why the engine declined to annotate a scope.
///
/// None of these are fatal: the traversal logs them and either descends into
/// a narrower scope or leaves the node unannotated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// A loop or region carries no usable source line.
    MissingLineInfo,
    /// Side-effect information for the scope is incomplete.
    IncompleteAnalysisInfo,
    /// The scope failed a structural safety predicate.
    UnsafeRegion,
    /// The loop is divergent while divergent loops are discarded.
    UnsafeDivergence,
    /// Expression recovery could not build a computation.
    RecoveryFailure,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Rejection::MissingLineInfo => "missing line info",
            Rejection::IncompleteAnalysisInfo => "incomplete analysis info",
            Rejection::UnsafeRegion => "unsafe region",
            Rejection::UnsafeDivergence => "unsafe divergence",
            Rejection::RecoveryFailure => "recovery failure",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid program: {0}")]
    InvalidProgram(String),

    #[error("Invalid pragma file line {line}: {message}")]
    InvalidPragma { line: usize, message: String },

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
