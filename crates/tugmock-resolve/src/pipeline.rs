//! Batch resolution.
//!
//! [`resolve_project`] is the whole flattening phase: build the [`ResolutionContext`], pick the
//! root types, resolve them in parallel on a bounded `rayon` pool, apply the root drop rule and
//! assemble a deterministic [`ResolvedGraph`].

use std::collections::BTreeMap;
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use tugmock_core::decl::{PartialDeclaration, ProjectInput};
use tugmock_core::diagnostics::{Diagnostic, DiagnosticCode};
use tugmock_core::types::Location;

use crate::context::ResolutionContext;
use crate::error::ResolveResult;
use crate::flatten::FlatteningResolver;
use crate::options::ResolveOptions;
use crate::resolved::ResolvedType;
use crate::store::{base_partial, PartialGroup};

// ============================================================================
// Output Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Final, inaccessible, or internal to a module that is not mocked.
    NotMockable,
    /// Subclasses a class from another module without any accessible initializer.
    NoAccessibleInitializer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedType {
    pub name: String,
    pub reason: SkipReason,
    pub location: Location,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionSummary {
    pub root_count: usize,
    pub resolved_count: usize,
    pub skipped: Vec<SkippedType>,
    pub warning_count: usize,
}

/// Result of one batch: mockable roots plus every resolved type they depend on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedGraph {
    /// Keys of the root types to generate mocks for, sorted.
    pub roots: Vec<String>,
    /// Every completed type (roots, ancestors and nested types) by key.
    pub types: BTreeMap<String, ResolvedType>,
    pub diagnostics: Vec<Diagnostic>,
    pub summary: ResolutionSummary,
}

impl ResolvedGraph {
    /// Look up a type by key (`App.Outer.Inner`), module-local name (`Outer.Inner`) or bare
    /// name. Roots win over other matches; ties resolve in key order.
    pub fn find(&self, name: &str) -> Option<&ResolvedType> {
        if let Some(resolved) = self.types.get(name) {
            return Some(resolved);
        }
        let matches = |t: &&ResolvedType| {
            t.fully_qualified_name == name || t.fully_qualified_module_name == name
        };
        self.roots
            .iter()
            .filter_map(|key| self.types.get(key))
            .find(matches)
            .or_else(|| self.types.values().find(matches))
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Resolve every root type of `input`.
///
/// `jobs` bounds the worker pool; `None` uses one worker per available processor.
pub fn resolve_project(
    input: &ProjectInput,
    options: ResolveOptions,
    jobs: Option<usize>,
) -> ResolveResult<ResolvedGraph> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.unwrap_or(0))
        .build()?;
    pool.install(|| {
        let ctx = ResolutionContext::from_project(input, options);
        resolve_roots(&ctx)
    })
}

/// A group is a root when its primary declaration is a top-level class or protocol in a
/// module that is being mocked.
fn root_base(group: &PartialGroup) -> Option<&Arc<PartialDeclaration>> {
    base_partial(group)
        .filter(|base| base.kind.is_mockable() && base.file.should_mock && !base.is_contained_type())
}

/// Resolve the roots of an already-built context on the current `rayon` pool.
pub fn resolve_roots(ctx: &ResolutionContext) -> ResolveResult<ResolvedGraph> {
    let roots: Vec<(&PartialGroup, &Arc<PartialDeclaration>)> = ctx
        .store
        .groups()
        .into_iter()
        .filter_map(|group| root_base(group).map(|base| (group, base)))
        .collect();
    tracing::info!(roots = roots.len(), "resolving root types");

    let resolver = FlatteningResolver::new(ctx);
    let resolved: Vec<Option<Arc<ResolvedType>>> = roots
        .par_iter()
        .map(|(group, _)| resolver.resolve(group))
        .collect::<ResolveResult<_>>()?;

    let mut root_keys = Vec::new();
    let mut skipped = Vec::new();
    for ((_, base), result) in roots.iter().zip(resolved) {
        let name = base.fully_qualified_module_name();
        let Some(resolved) = result else {
            skipped.push(SkippedType {
                name,
                reason: SkipReason::NotMockable,
                location: base.location(),
            });
            continue;
        };
        if is_droppable(&resolved) {
            ctx.diagnostics.record(
                Diagnostic::warning(
                    DiagnosticCode::UnmockableRoot,
                    format!(
                        "'{}' subclasses a type from a different module but does not declare any accessible initializers and cannot be mocked",
                        resolved.fully_qualified_module_name
                    ),
                )
                .for_type(resolved.key.clone())
                .at(base.location()),
            );
            skipped.push(SkippedType {
                name,
                reason: SkipReason::NoAccessibleInitializer,
                location: base.location(),
            });
            continue;
        }
        root_keys.push(resolved.key.clone());
    }
    root_keys.sort();
    root_keys.dedup();

    let types: BTreeMap<String, ResolvedType> = ctx
        .complete_types()
        .into_iter()
        .map(|(key, resolved)| (key, (*resolved).clone()))
        .collect();
    let summary = ResolutionSummary {
        root_count: roots.len(),
        resolved_count: root_keys.len(),
        skipped,
        warning_count: ctx.diagnostics.warning_count(),
    };
    tracing::info!(
        resolved = summary.resolved_count,
        skipped = summary.skipped.len(),
        warnings = summary.warning_count,
        types = types.len(),
        "resolution complete"
    );

    Ok(ResolvedGraph {
        roots: root_keys,
        types,
        diagnostics: ctx.diagnostics.snapshot(),
        summary,
    })
}

/// Classes that subclass across a module boundary need an initializer the mock can call.
fn is_droppable(resolved: &ResolvedType) -> bool {
    resolved.kind == tugmock_core::decl::DeclKind::Class
        && resolved.subclasses_external_type
        && !resolved.has_accessible_initializer()
}
