//! Errors that abort a resolution batch.
//!
//! Almost nothing aborts: unresolved names, unmockable types and cycles all degrade to
//! diagnostics. Only structural precondition violations and worker-pool failures end up here.

use thiserror::Error;
use tugmock_core::error::MockError;

#[derive(Debug, Error)]
pub enum ResolveError {
    /// The flattening resolver was handed no partial declarations.
    #[error("empty partial set reached the resolver{}", context.as_deref().map(|c| format!(" ({})", c)).unwrap_or_default())]
    EmptyPartialSet { context: Option<String> },

    /// The worker pool could not be created.
    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

pub type ResolveResult<T> = Result<T, ResolveError>;

impl From<ResolveError> for MockError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::EmptyPartialSet { .. } => MockError::PreconditionViolation {
                message: err.to_string(),
            },
            ResolveError::WorkerPool(_) => MockError::internal(err.to_string()),
        }
    }
}
