//! JSON output types and serialization for CLI responses.
//!
//! ## Design Principles
//!
//! 1. **Status first:** Every response has `status` as first field
//! 2. **Deterministic:** Same input -> same output (field order, array ordering)
//! 3. **Versioned:** Schema version in response enables forward compatibility
//!
//! Successful responses wrap a command-specific body in [`Response`]; failures use
//! [`ErrorResponse`] with a stable numeric code from [`OutputErrorCode`].

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::error::{MockError, OutputErrorCode};

pub use crate::types::Location;

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

/// Success envelope around a command-specific body.
#[derive(Debug, Clone, Serialize)]
pub struct Response<T: Serialize> {
    /// Status: "ok".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    #[serde(flatten)]
    pub body: T,
}

impl<T: Serialize> Response<T> {
    pub fn ok(body: T) -> Self {
        Response {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            body,
        }
    }
}

/// Error details in an error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Numeric error code.
    pub code: u8,
    /// Human-readable message.
    pub message: String,
    /// Error-specific structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorInfo {
    /// Create from a MockError.
    pub fn from_error(err: &MockError) -> Self {
        let code = OutputErrorCode::from(err).code();
        let message = err.to_string();
        let details = match err {
            MockError::InvalidArguments { details, .. } => details.clone(),
            MockError::FileNotFound { path } | MockError::InvalidInput { path, .. } => {
                Some(serde_json::json!({ "path": path }))
            }
            MockError::TypeNotFound { name } => Some(serde_json::json!({ "type": name })),
            MockError::PreconditionViolation { .. } | MockError::InternalError { .. } => None,
        };
        ErrorInfo {
            code,
            message,
            details,
        }
    }
}

/// Error response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Status: "error".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Error information.
    pub error: ErrorInfo,
}

impl ErrorResponse {
    /// Create an error response from a MockError.
    pub fn from_error(err: &MockError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

/// Emit a response as pretty-printed JSON to a writer.
///
/// This is the single output path for CLI, ensuring consistency.
/// The output is deterministic: same input produces identical bytes.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

/// Emit a response as compact JSON (single line) to a writer.
pub fn emit_response_compact<T: Serialize>(
    response: &T,
    writer: &mut impl Write,
) -> io::Result<()> {
    let json = serde_json::to_string(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

// ============================================================================
// Tests
// ============================================================================
