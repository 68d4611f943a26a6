//! Error types and error code constants for tugmock.
//!
//! This module provides a unified error type (`MockError`) that bridges
//! domain-specific errors from the resolution engine and configuration layer
//! into a common format suitable for JSON output.
//!
//! ## Error Code Mapping
//!
//! - `2`: Invalid arguments (bad input from caller)
//! - `3`: Input errors (unreadable or malformed declaration input, unknown type)
//! - `4`: Resolution aborted (structural precondition violated)
//! - `10`: Internal errors (bugs, unexpected state)
//!
//! Unresolved references are never errors. They surface as diagnostics and the
//! affected type is still produced best-effort.

use std::fmt;

use thiserror::Error;

pub use crate::types::Location;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Error codes for JSON output.
///
/// These codes map to CLI exit codes and appear in JSON error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller (bad flag combination, bad config value).
    InvalidArguments = 2,
    /// Input errors (file not found, malformed declaration JSON, unknown type).
    InputError = 3,
    /// Resolution aborted on a precondition violation.
    ResolutionAborted = 4,
    /// Internal errors (bugs, unexpected state).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for CLI output.
#[derive(Debug, Error)]
pub enum MockError {
    /// Invalid arguments from caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments {
        message: String,
        details: Option<serde_json::Value>,
    },

    /// Input file could not be found.
    #[error("file not found: {path}")]
    FileNotFound { path: String },

    /// Input could not be read or decoded.
    #[error("invalid input '{path}': {message}")]
    InvalidInput { path: String, message: String },

    /// A requested type does not exist in the resolved graph.
    #[error("type not found: {name}")]
    TypeNotFound { name: String },

    /// A structural precondition was violated; the batch was aborted.
    #[error("resolution aborted: {message}")]
    PreconditionViolation { message: String },

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    InternalError { message: String },
}

// ============================================================================
// Error Code Mapping
// ============================================================================

impl From<&MockError> for OutputErrorCode {
    fn from(err: &MockError) -> Self {
        match err {
            MockError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            MockError::FileNotFound { .. } => OutputErrorCode::InputError,
            MockError::InvalidInput { .. } => OutputErrorCode::InputError,
            MockError::TypeNotFound { .. } => OutputErrorCode::InputError,
            MockError::PreconditionViolation { .. } => OutputErrorCode::ResolutionAborted,
            MockError::InternalError { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl From<MockError> for OutputErrorCode {
    fn from(err: MockError) -> Self {
        OutputErrorCode::from(&err)
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl MockError {
    /// Create an invalid arguments error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        MockError::InvalidArguments {
            message: message.into(),
            details: None,
        }
    }

    /// Create an invalid arguments error with JSON details.
    pub fn invalid_args_with_details(
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        MockError::InvalidArguments {
            message: message.into(),
            details: Some(details),
        }
    }

    /// Create a file not found error.
    pub fn file_not_found(path: impl Into<String>) -> Self {
        MockError::FileNotFound { path: path.into() }
    }

    /// Create an invalid input error.
    pub fn invalid_input(path: impl Into<String>, message: impl Into<String>) -> Self {
        MockError::InvalidInput {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a type not found error.
    pub fn type_not_found(name: impl Into<String>) -> Self {
        MockError::TypeNotFound { name: name.into() }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        MockError::InternalError {
            message: message.into(),
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod error_code_mapping {
        use super::*;

        #[test]
        fn invalid_arguments_maps_to_invalid_arguments() {
            let err = MockError::invalid_args("--jobs must be positive");
            assert_eq!(
                OutputErrorCode::from(&err),
                OutputErrorCode::InvalidArguments
            );
            assert_eq!(err.error_code().code(), 2);
        }

        #[test]
        fn input_errors_map_to_input_error() {
            let missing = MockError::file_not_found("project.json");
            assert_eq!(missing.error_code(), OutputErrorCode::InputError);

            let malformed = MockError::invalid_input("project.json", "expected value");
            assert_eq!(malformed.error_code(), OutputErrorCode::InputError);

            let unknown = MockError::type_not_found("Nope");
            assert_eq!(unknown.error_code().code(), 3);
        }

        #[test]
        fn precondition_violation_maps_to_resolution_aborted() {
            let err = MockError::PreconditionViolation {
                message: "empty partial set".to_string(),
            };
            assert_eq!(
                OutputErrorCode::from(&err),
                OutputErrorCode::ResolutionAborted
            );
            assert_eq!(err.error_code().code(), 4);
        }

        #[test]
        fn internal_error_maps_to_internal_error() {
            let err = MockError::internal("unexpected state");
            assert_eq!(OutputErrorCode::from(&err), OutputErrorCode::InternalError);
            assert_eq!(err.error_code().code(), 10);
        }
    }

    mod error_display {
        use super::*;

        #[test]
        fn invalid_input_display() {
            let err = MockError::invalid_input("in.json", "EOF while parsing");
            assert_eq!(err.to_string(), "invalid input 'in.json': EOF while parsing");
        }

        #[test]
        fn type_not_found_display() {
            let err = MockError::type_not_found("App.Child");
            assert_eq!(err.to_string(), "type not found: App.Child");
        }
    }

    mod output_error_code {
        use super::*;

        #[test]
        fn code_values_are_stable() {
            assert_eq!(OutputErrorCode::InvalidArguments.code(), 2);
            assert_eq!(OutputErrorCode::InputError.code(), 3);
            assert_eq!(OutputErrorCode::ResolutionAborted.code(), 4);
            assert_eq!(OutputErrorCode::InternalError.code(), 10);
        }

        #[test]
        fn display_shows_code() {
            assert_eq!(format!("{}", OutputErrorCode::InvalidArguments), "2");
            assert_eq!(format!("{}", OutputErrorCode::InternalError), "10");
        }
    }
}
