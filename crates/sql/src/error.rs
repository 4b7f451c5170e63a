//! Error types for the Spanner dialect layer

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // Codec errors
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Decoding error: {0}")]
    Decoding(String),

    // Rendering errors
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("{0}")]
    UnsupportedFeature(String),

    // Schema errors
    #[error("Policy conflict: {0}")]
    PolicyConflict(String),

    #[error("Invalid definition: {0}")]
    InvalidDefinition(String),

    // Execution errors
    #[error(
        "Mutation limit exceeded: {} mutations against a budget of {budget}; use partitioned_update or partitioned_delete for bulk writes",
        .predicted.map_or_else(|| "unknown".to_string(), |n| n.to_string())
    )]
    MutationLimitExceeded { predicted: Option<u64>, budget: u64 },

    #[error("Execution error: {0}")]
    Execution(String),
}

impl Error {
    /// Whether the statement hit the per-commit mutation cap. The caller may
    /// choose to escalate to a partitioned entry point; nothing is retried here.
    pub fn is_mutation_limit(&self) -> bool {
        matches!(self, Error::MutationLimitExceeded { .. })
    }

    pub(crate) fn unsupported(what: impl std::fmt::Display) -> Self {
        Error::UnsupportedFeature(format!("Spanner does not support {}", what))
    }
}

impl From<spanql_value::Error> for Error {
    fn from(err: spanql_value::Error) -> Self {
        match err {
            spanql_value::Error::TypeMismatch { expected, found } => {
                Error::TypeMismatch { expected, found }
            }
            spanql_value::Error::Decoding(msg) => Error::Decoding(msg),
        }
    }
}
