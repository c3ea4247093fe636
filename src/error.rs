//! Error types for the level-k training crate

use thiserror::Error;

/// Main error type for the level-k training crate
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("unknown training role '{role}' (expected 'defender' or 'attacker')")]
    UnknownRole { role: String },

    #[error("trainer index selection error: super agent and opponent both resolve to index {index}")]
    DegeneratePair { index: usize },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("invalid opponent distribution {weights:?}: {reason}")]
    InvalidDistribution { weights: Vec<f64>, reason: String },

    #[error("opponent level {level} is out of range (max level {max_level})")]
    LevelOutOfRange { level: usize, max_level: usize },

    #[error("environment contract violated: {message}")]
    Environment { message: String },

    #[error("checkpoint '{path}' has no variables with prefix '{prefix}'")]
    MissingVariables { path: String, prefix: String },

    #[error("variable '{name}' has {got} values, expected {expected}")]
    VariableShape {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("failed to {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to {operation}: {message}")]
    SerializationContext { operation: String, message: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("progress bar template error: {message}")]
    ProgressBarTemplate { message: String },
}

/// Convenience type alias for Results using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Error::Io {
            operation: "IO operation".to_string(),
            source,
        }
    }
}

impl Error {
    /// Shorthand for an [`Error::InvalidConfiguration`].
    pub fn config(message: impl Into<String>) -> Self {
        Error::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Wrap an I/O error with the operation that produced it.
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            operation: operation.into(),
            source,
        }
    }
}
