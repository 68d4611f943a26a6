//! Semantic resolution for tugmock.
//!
//! Takes parsed declarations (see [`tugmock_core::decl`]) and produces a [`ResolvedGraph`]:
//! one flattened [`ResolvedType`] per mockable type, with every type reference qualified so
//! generated code compiles no matter which module it lands in.
//!
//! The layers, bottom-up:
//!
//! - [`store`]: partial declarations indexed by module and name, with scope-aware lookup
//! - [`alias`]: type alias unwrapping, memoized
//! - [`qualify`]: rewriting type text into context-, module- or alias-qualified form
//! - [`specialize`]: generic argument substitution for inherited members
//! - [`members`]: member building and inheritance filtering
//! - [`flatten`]: depth-first inheritance flattening with a shared cache
//! - [`pipeline`]: root selection and parallel batch resolution

pub mod alias;
pub mod context;
pub mod error;
pub mod flatten;
pub mod members;
pub mod options;
pub mod pipeline;
pub mod qualify;
pub mod resolved;
pub mod sink;
pub mod specialize;
pub mod store;

#[doc(hidden)]
pub mod test_helpers;

pub use context::ResolutionContext;
pub use error::{ResolveError, ResolveResult};
pub use flatten::FlatteningResolver;
pub use options::{RemapTarget, ResolveOptions};
pub use pipeline::{
    resolve_project, resolve_roots, ResolutionSummary, ResolvedGraph, SkipReason, SkippedType,
};
pub use qualify::{NameQualifier, QualifyMode, QualifyOptions, QualifyScope};
pub use resolved::{Completion, ResolvedType};
pub use store::{PartialStore, VisibleModules};
