//! Engine error types.

use thiserror::Error;

/// Errors returned by engine operations.
///
/// These indicate a configuration bug in the caller, never a user input
/// problem. User input problems are reported through [`crate::ErrorSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A run was scoped to, or triggered by, a field that is not registered.
    #[error("field '{0}' is not registered")]
    UnknownField(String),

    /// A pattern rule was given a regex that does not compile.
    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Compiler error from the regex crate.
        message: String,
    },
}

impl From<(String, regex::Error)> for EngineError {
    fn from((pattern, err): (String, regex::Error)) -> Self {
        Self::InvalidPattern {
            pattern,
            message: err.to_string(),
        }
    }
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
