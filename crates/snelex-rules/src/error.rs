//! Rule-book loading and consistency errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or checking a rule book.
#[derive(Error, Debug)]
pub enum RulesError {
    /// The rule-book file could not be read.
    #[error("failed to read rule book {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The YAML did not match the rule-book shape.
    #[error("failed to parse rule book: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The rule book parsed but is inconsistent.
    #[error("rule book has {} problem(s): {}", problems.len(), problems.join("; "))]
    Invalid {
        /// Every problem found, in discovery order.
        problems: Vec<String>,
    },
}
