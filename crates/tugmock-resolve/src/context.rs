//! The shared resolution context.
//!
//! One [`ResolutionContext`] is built per batch and shared by reference across all workers. It
//! owns the immutable inputs (partial store, alias table, module dependency graph, options)
//! and every memo table the batch fills in: the resolved-type cache, the alias unwrap memo
//! (inside [`AliasResolver`]) and the diagnostic sink.
//!
//! Cache reads and writes take a short `parking_lot` lock; the recursive computation that
//! produces an entry always runs outside it. Two workers may compute the same entry; both
//! results are equal and the later write simply overwrites the earlier one.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use rayon::prelude::*;
use tugmock_core::decl::{PartialDeclaration, ProjectInput};

use crate::alias::AliasResolver;
use crate::options::ResolveOptions;
use crate::qualify::NameQualifier;
use crate::resolved::ResolvedType;
use crate::sink::DiagnosticSink;
use crate::store::{PartialStore, VisibleModules};

/// State of one canonical name in the resolved-type cache.
#[derive(Debug, Clone)]
pub enum CacheEntry {
    /// Members and ancestors are final; nested types are not attached yet.
    Preliminary(Arc<ResolvedType>),
    Complete(Arc<ResolvedType>),
    /// Resolved to "cannot be mocked" (wrong kind, final, inaccessible).
    Unmockable,
}

impl CacheEntry {
    pub fn resolved(&self) -> Option<&Arc<ResolvedType>> {
        match self {
            CacheEntry::Preliminary(resolved) | CacheEntry::Complete(resolved) => Some(resolved),
            CacheEntry::Unmockable => None,
        }
    }
}

#[derive(Debug)]
pub struct ResolutionContext {
    pub store: PartialStore,
    pub aliases: AliasResolver,
    pub module_dependencies: BTreeMap<String, BTreeSet<String>>,
    pub options: ResolveOptions,
    pub diagnostics: DiagnosticSink,
    cache: RwLock<HashMap<String, CacheEntry>>,
}

impl ResolutionContext {
    pub fn new(
        store: PartialStore,
        aliases: AliasResolver,
        module_dependencies: BTreeMap<String, BTreeSet<String>>,
        options: ResolveOptions,
    ) -> Self {
        ResolutionContext {
            store,
            aliases,
            module_dependencies,
            options,
            diagnostics: DiagnosticSink::new(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Build the store and alias table from parser output.
    ///
    /// Files are flattened into partials in parallel; partials are registered in file order so
    /// that group order is independent of scheduling.
    pub fn from_project(input: &ProjectInput, options: ResolveOptions) -> Self {
        let per_file: Vec<Vec<Arc<PartialDeclaration>>> =
            input.files.par_iter().map(|file| file.partials()).collect();

        let mut store = PartialStore::new();
        let mut aliases = AliasResolver::new();
        for partial in per_file.into_iter().flatten() {
            tracing::trace!(
                name = %partial.fully_qualified_module_name(),
                kind = partial.kind.as_str(),
                "registering partial"
            );
            aliases.add_alias(&partial);
            store.add_partial(partial);
        }
        tracing::debug!(
            partials = store.len(),
            aliases = aliases.len(),
            files = input.files.len(),
            "partial store built"
        );
        ResolutionContext::new(store, aliases, input.module_dependencies.clone(), options)
    }

    pub fn qualifier(&self) -> NameQualifier<'_> {
        NameQualifier::new(&self.store, &self.aliases, &self.diagnostics)
    }

    /// Modules visible from a type: each partial's own module plus its file's imports,
    /// expanded through the declared dependency graph.
    pub fn visible_modules(&self, partials: &[Arc<PartialDeclaration>]) -> VisibleModules {
        let mut strict = BTreeSet::new();
        for partial in partials {
            strict.insert(partial.module_name().to_string());
            for import in &partial.file.imported_modules {
                strict.insert(import.clone());
                if let Some(dependencies) = self.module_dependencies.get(import) {
                    strict.extend(dependencies.iter().cloned());
                }
            }
        }

        let relaxed = self.options.relaxed_linking.then(|| {
            let mut relaxed = strict.clone();
            for partial in partials {
                if let Some(dependencies) = self.module_dependencies.get(partial.module_name()) {
                    relaxed.extend(dependencies.iter().cloned());
                }
            }
            relaxed
        });
        VisibleModules::new(strict, relaxed)
    }

    // ------------------------------------------------------------------------
    // Resolved-type cache
    // ------------------------------------------------------------------------

    pub fn cached(&self, key: &str) -> Option<CacheEntry> {
        self.cache.read().get(key).cloned()
    }

    /// Record a preliminary node unless a complete one is already cached.
    pub fn insert_preliminary(&self, key: &str, resolved: Arc<ResolvedType>) {
        let mut cache = self.cache.write();
        if matches!(cache.get(key), Some(CacheEntry::Complete(_))) {
            return;
        }
        cache.insert(key.to_string(), CacheEntry::Preliminary(resolved));
    }

    pub fn insert_complete(&self, key: &str, resolved: Arc<ResolvedType>) {
        self.cache
            .write()
            .insert(key.to_string(), CacheEntry::Complete(resolved));
    }

    pub fn insert_unmockable(&self, key: &str) {
        self.cache
            .write()
            .insert(key.to_string(), CacheEntry::Unmockable);
    }

    /// Every completed type, ordered by key.
    pub fn complete_types(&self) -> BTreeMap<String, Arc<ResolvedType>> {
        self.cache
            .read()
            .iter()
            .filter_map(|(key, entry)| match entry {
                CacheEntry::Complete(resolved) => Some((key.clone(), Arc::clone(resolved))),
                _ => None,
            })
            .collect()
    }
}
