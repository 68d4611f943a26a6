//! Error bridge implementations.
//!
//! `impl From<ConfigError> for MockError`. The resolver's own bridge lives next to
//! `ResolveError` in `tugmock-resolve`.

use tugmock_core::error::MockError;

use crate::config::ConfigError;

// ============================================================================
// Bridge: ConfigError -> MockError
// ============================================================================

impl From<ConfigError> for MockError {
    fn from(err: ConfigError) -> Self {
        match &err {
            ConfigError::NotFound { path } => MockError::file_not_found(path.display().to_string()),
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => {
                MockError::invalid_input(path.display().to_string(), err.to_string())
            }
            ConfigError::InvalidValue { field, .. } => MockError::invalid_args_with_details(
                err.to_string(),
                serde_json::json!({ "field": field }),
            ),
        }
    }
}
