//! Error types for Logduck

use thiserror::Error;

/// Result type alias using Logduck Error
pub type Result<T> = std::result::Result<T, Error>;

/// Logduck error types
#[derive(Error, Debug)]
pub enum Error {
    /// Creating or reconfiguring a database service failed.
    ///
    /// `origin` names the initialization source (a script path, or the
    /// external resolver when no path could be obtained).
    #[error("Initialization failed for {origin}: {cause}")]
    Initialization {
        origin: String,
        #[source]
        cause: Box<Error>,
    },

    #[error("Statement {index} failed: {message} (statement: {statement})")]
    Statement {
        index: usize,
        statement: String,
        message: String,
    },

    #[error("Query error: {0}")]
    Query(String),

    #[error("Reconnect failed: {0}")]
    Reconnect(#[source] Box<Error>),

    #[error("Source resolution error: {0}")]
    Resolution(String),

    #[error("Initialization source error: {0}")]
    Source(String),

    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid query parameter: {0}")]
    InvalidParameter(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Wrap `cause` as an initialization failure of `origin`.
    pub fn initialization(origin: impl Into<String>, cause: Self) -> Self {
        Self::Initialization {
            origin: origin.into(),
            cause: Box::new(cause),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    pub fn is_initialization_error(&self) -> bool {
        matches!(self, Self::Initialization { .. })
    }

    pub fn is_reconnect_error(&self) -> bool {
        matches!(self, Self::Reconnect(_))
    }

    /// 1-based index of the failing script statement, looking through
    /// initialization and reconnect wrappers.
    pub fn statement_index(&self) -> Option<usize> {
        match self {
            Self::Statement { index, .. } => Some(*index),
            Self::Initialization { cause, .. } | Self::Reconnect(cause) => cause.statement_index(),
            _ => None,
        }
    }
}
