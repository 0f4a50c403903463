/// Unified error type for the jsonlens crate.
#[derive(Debug, thiserror::Error)]
pub enum LensError {
    /// Document text is not valid JSON5.
    #[error("parse error: {0}")]
    Parse(String),

    /// Filter text failed as a sandboxed expression.
    #[error("expression error: {0}")]
    Expression(String),

    /// Filter text failed in the query language, or the query engine failed.
    #[error("query error: {0}")]
    Query(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias using [`LensError`].
pub type LensResult<T> = Result<T, LensError>;
