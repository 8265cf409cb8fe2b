use crate::solver::SolverError;
use thiserror::Error;

/// Error types for the flattening pass.
///
/// Every fatal error raised while a rule is being processed names that rule and the
/// line it was declared on, so a failed traversal can be traced back to its source.
#[derive(Debug, Error)]
pub enum VerifierError {
    /// A variable was referenced before (or without) being declared in the same rule
    #[error("unresolved variable '{name}' in rule '{rule}' at line {line}")]
    UnresolvedVariable {
        name: String,
        rule: String,
        line: usize,
    },

    /// A node needs an enclosing pattern, constraint or rule that is not open
    #[error("{node} outside of a {expected} in rule '{rule}' at line {line}")]
    MissingContext {
        node: &'static str,
        expected: &'static str,
        rule: String,
        line: usize,
    },

    /// The evaluator of a restriction is not a known comparison operator
    #[error("unknown operator '{operator}' in rule '{rule}' at line {line}")]
    UnknownOperator {
        operator: String,
        rule: String,
        line: usize,
    },

    /// A qualified identifier restriction without a `name.path` shape
    #[error("malformed qualified identifier '{text}' in rule '{rule}' at line {line}")]
    MalformedIdentifier {
        text: String,
        rule: String,
        line: usize,
    },

    /// A configured analysis limit was exceeded
    #[error(
        "limit '{limit_name}' exceeded in rule '{rule}' at line {line}: {actual} > {limit_value}"
    )]
    LimitExceeded {
        limit_name: &'static str,
        limit_value: usize,
        actual: usize,
        rule: String,
        line: usize,
    },

    /// The logical context solver rejected a transition
    #[error("solver failure in rule '{rule}' at line {line}: {source}")]
    Solver {
        rule: String,
        line: usize,
        #[source]
        source: SolverError,
    },

    /// The rule base document could not be decoded
    #[error("invalid rule base document: {0}")]
    Input(#[from] serde_json::Error),
}

impl VerifierError {
    /// Name of the rule being processed when the error was raised, if any
    pub fn rule(&self) -> Option<&str> {
        match self {
            VerifierError::UnresolvedVariable { rule, .. }
            | VerifierError::MissingContext { rule, .. }
            | VerifierError::UnknownOperator { rule, .. }
            | VerifierError::MalformedIdentifier { rule, .. }
            | VerifierError::LimitExceeded { rule, .. }
            | VerifierError::Solver { rule, .. } => Some(rule),
            VerifierError::Input(_) => None,
        }
    }

    /// Source line of the rule being processed when the error was raised, if any
    pub fn line(&self) -> Option<usize> {
        match self {
            VerifierError::UnresolvedVariable { line, .. }
            | VerifierError::MissingContext { line, .. }
            | VerifierError::UnknownOperator { line, .. }
            | VerifierError::MalformedIdentifier { line, .. }
            | VerifierError::LimitExceeded { line, .. }
            | VerifierError::Solver { line, .. } => Some(*line),
            VerifierError::Input(_) => None,
        }
    }
}
