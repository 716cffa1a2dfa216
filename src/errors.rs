//! Error types for the icebite journal.
//!
//! The store itself never surfaces persistence failures to its callers (they
//! are logged and swallowed), so most of these variants show up at the edges:
//! the key-value backends, configuration loading, and the CLI.

use std::{io, path::PathBuf};

use thiserror::Error;

/// The main error type for the icebite journal.
#[derive(Error, Debug)]
pub enum JournalError {
    /// Errors related to file I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Errors related to serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No trip with the given id exists in the journal.
    #[error("Trip not found: {id}")]
    TripNotFound { id: String },

    /// A date or month argument could not be parsed.
    #[error("Invalid date '{input}': expected {expected}")]
    InvalidDate { input: String, expected: &'static str },

    /// Monthly goals must be positive.
    #[error("Invalid monthly goal: {goal} (must be greater than zero)")]
    InvalidGoal { goal: u32 },

    /// Species names must contain at least one non-whitespace character.
    #[error("Invalid species name: '{name}'")]
    InvalidSpecies { name: String },

    /// Errors related to configuration.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Directory creation or access failed.
    #[error("Failed to create or access directory: {path}")]
    DirectoryError { path: PathBuf },

    /// The backing store refused a write.
    #[error("Storage write failed: {message}")]
    WriteFailed { message: String },

    #[error("{message}")]
    EditorError { message: String },

    /// Generic application error with a custom message.
    #[error("{message}")]
    ApplicationError { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = JournalError::TripNotFound {
            id: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "Trip not found: abc");

        let err = JournalError::InvalidGoal { goal: 0 };
        assert_eq!(
            err.to_string(),
            "Invalid monthly goal: 0 (must be greater than zero)"
        );

        let err = JournalError::InvalidDate {
            input: "2024-13".to_string(),
            expected: "YYYY-MM",
        };
        assert_eq!(err.to_string(), "Invalid date '2024-13': expected YYYY-MM");
    }

    #[test]
    fn test_from_serde_error() {
        let parse_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: JournalError = parse_err.into();
        assert!(matches!(err, JournalError::Serialization(_)));
    }
}
