//! Tugmock: semantic resolution for test-double generation.
//!
//! Turns parsed type declarations into flattened, fully-qualified type graphs that a mock
//! generator can emit code from without further lookups.

// Core infrastructure - re-exported from tugmock-core
pub use tugmock_core::decl;
pub use tugmock_core::diagnostics;
pub use tugmock_core::error;
pub use tugmock_core::member;
pub use tugmock_core::output;
pub use tugmock_core::typeref;
pub use tugmock_core::types;

// Resolution engine
pub use tugmock_resolve as resolve;
pub use tugmock_resolve::{resolve_project, ResolveOptions, ResolvedGraph, ResolvedType};

pub mod config;

// Front door
pub mod cli;

// Error bridges - converts resolver and config errors to MockError
mod error_bridges;
