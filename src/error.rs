//! Error types for interner configuration.

use thiserror::Error;

/// Errors that can occur when reading interner configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A boolean environment variable had an unrecognised value.
    #[error("invalid boolean {value:?} in {var} (expected 1, t, true, 0, f, false)")]
    InvalidBool {
        /// Name of the environment variable.
        var: &'static str,
        /// The rejected value.
        value: String,
    },

    /// An environment variable was not valid unicode.
    #[error("{var} is not valid unicode")]
    NotUnicode {
        /// Name of the environment variable.
        var: &'static str,
    },
}
