//! Core infrastructure for tugmock.
//!
//! This crate provides the language-agnostic building blocks of the resolver:
//! - Declaration input model and partial declarations
//! - Type-reference parsing and rendering
//! - Resolved member model (methods, variables, generics, where clauses)
//! - Diagnostics for non-fatal findings
//! - Error types and error codes
//! - JSON output types for CLI responses

pub mod decl;
pub mod diagnostics;
pub mod error;
pub mod member;
pub mod output;
pub mod typeref;
pub mod types;
