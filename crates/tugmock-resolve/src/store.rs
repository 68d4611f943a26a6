//! Partial store: every partial declaration in the project, indexed by name and module.
//!
//! The store is built once, before resolution starts, and is read-only afterwards; resolver
//! workers share it by reference without locking.
//!
//! ## Lookup Rules
//!
//! A reference is resolved against an ordered module list (the referencing module first, then
//! the visible modules in sorted order). Within that list the first module that declares a
//! primary (non-extension) partial under the name wins, with real types preferred over
//! typealiases. Lexical nesting is honored by [`PartialStore::nearest_inherited_type`], which
//! tries the innermost enclosing scope first and walks outward.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use tugmock_core::decl::{DeclKind, PartialDeclaration};
use tugmock_core::typeref::{strip_generics, TypeRef};

/// Partials sharing one name within one module: a primary declaration plus its extensions.
pub type PartialGroup = [Arc<PartialDeclaration>];

/// First primary (non-extension) partial of a group.
pub fn base_partial(partials: &PartialGroup) -> Option<&Arc<PartialDeclaration>> {
    partials.iter().find(|p| p.kind != DeclKind::Extension)
}

// ============================================================================
// Visible Modules
// ============================================================================

/// Modules a type may reference, split into the strict set and the relaxed extension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibleModules {
    /// Own modules plus imports (expanded through declared dependencies), sorted.
    pub strict: Vec<String>,
    /// Strict modules plus the direct dependencies of the declaring modules, sorted.
    /// `None` when relaxed linking is off or adds nothing.
    pub relaxed: Option<Vec<String>>,
}

impl VisibleModules {
    pub fn new(strict: BTreeSet<String>, relaxed: Option<BTreeSet<String>>) -> Self {
        let relaxed = relaxed.filter(|r| r != &strict).map(|r| r.into_iter().collect());
        VisibleModules {
            strict: strict.into_iter().collect(),
            relaxed,
        }
    }

    /// Unrestricted visibility for tests and one-off queries.
    pub fn of(modules: &[&str]) -> Self {
        VisibleModules::new(modules.iter().map(|m| m.to_string()).collect(), None)
    }
}

/// Result of a scoped lookup.
#[derive(Debug, Clone, Copy)]
pub struct Found<'a> {
    pub partials: &'a PartialGroup,
    /// Only the relaxed module list produced a match.
    pub relaxed: bool,
}

impl<'a> Found<'a> {
    pub fn base(&self) -> Option<&'a Arc<PartialDeclaration>> {
        base_partial(self.partials)
    }
}

// ============================================================================
// Partial Store
// ============================================================================

#[derive(Debug, Default)]
pub struct PartialStore {
    /// lookup name -> module -> partials in insertion order
    by_name: HashMap<String, BTreeMap<String, Vec<Arc<PartialDeclaration>>>>,
    /// module -> lookup names declared in it
    module_types: BTreeMap<String, BTreeSet<String>>,
}

impl PartialStore {
    pub fn new() -> Self {
        PartialStore::default()
    }

    /// Register one partial. Insertion order within a group is preserved.
    pub fn add_partial(&mut self, partial: Arc<PartialDeclaration>) {
        let name = partial.lookup_name();
        let module = partial.module_name().to_string();
        self.module_types
            .entry(module.clone())
            .or_default()
            .insert(name.clone());
        self.by_name
            .entry(name)
            .or_default()
            .entry(module)
            .or_default()
            .push(partial);
    }

    pub fn len(&self) -> usize {
        self.by_name
            .values()
            .flat_map(|modules| modules.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn module_names(&self) -> impl Iterator<Item = &String> {
        self.module_types.keys()
    }

    /// Every partial of `name` declared in `module`.
    pub fn lookup(&self, name: &str, module: &str) -> Option<&PartialGroup> {
        self.by_name
            .get(name)
            .and_then(|modules| modules.get(module))
            .map(Vec::as_slice)
    }

    /// All groups, ordered by module then name.
    pub fn groups(&self) -> Vec<&PartialGroup> {
        let mut keys: Vec<(&str, &str)> = self
            .by_name
            .iter()
            .flat_map(|(name, modules)| modules.keys().map(move |m| (m.as_str(), name.as_str())))
            .collect();
        keys.sort_unstable();
        keys.into_iter()
            .filter_map(|(module, name)| self.lookup(name, module))
            .collect()
    }

    /// True when one of `within` (or any module, if `None`) declares a type named `module`.
    ///
    /// A shadowed module cannot be used as a qualifier in generated source.
    pub fn is_module_shadowed(&self, module: &str, within: Option<&[String]>) -> bool {
        let Some(declaring) = self.by_name.get(module) else {
            return false;
        };
        match within {
            None => !declaring.is_empty(),
            Some(modules) => modules.iter().any(|m| declaring.contains_key(m)),
        }
    }

    /// First group for `name` among `modules` that has a primary declaration.
    ///
    /// Modules are tried in order. A real type wins over a typealias in a later module.
    pub fn find(&self, name: &str, modules: &[String]) -> Option<&PartialGroup> {
        let declaring = self.by_name.get(name)?;
        let mut alias_fallback = None;
        for module in modules {
            let Some(group) = declaring.get(module) else {
                continue;
            };
            match base_partial(group) {
                Some(base) if base.kind != DeclKind::TypeAlias => return Some(group),
                Some(_) if alias_fallback.is_none() => alias_fallback = Some(group.as_slice()),
                _ => {}
            }
        }
        alias_fallback
    }

    /// Resolve a raw type reference from a lexical position.
    ///
    /// `raw` may carry attributes, optionals and generic arguments; they are ignored. The
    /// innermost scope of `containing` is tried first, then each enclosing scope, then the
    /// module level. A dotted name whose first component is a visible module is finally tried
    /// as a module-qualified reference.
    pub fn nearest_inherited_type(
        &self,
        raw: &str,
        modules: &[String],
        referencing_module: Option<&str>,
        containing: &[String],
    ) -> Option<&PartialGroup> {
        let name = lookup_key(raw);
        if name.is_empty() {
            return None;
        }
        let mut attributed: Vec<String> = Vec::with_capacity(modules.len() + 1);
        if let Some(module) = referencing_module {
            attributed.push(module.to_string());
        }
        attributed.extend(modules.iter().cloned());
        self.nearest_in_scope(&name, &attributed, containing)
    }

    /// Strict lookup first, then the relaxed module list.
    pub fn nearest_visible(
        &self,
        raw: &str,
        visible: &VisibleModules,
        referencing_module: Option<&str>,
        containing: &[String],
    ) -> Option<Found<'_>> {
        if let Some(partials) =
            self.nearest_inherited_type(raw, &visible.strict, referencing_module, containing)
        {
            return Some(Found {
                partials,
                relaxed: false,
            });
        }
        let relaxed = visible.relaxed.as_deref()?;
        self.nearest_inherited_type(raw, relaxed, referencing_module, containing)
            .map(|partials| Found {
                partials,
                relaxed: true,
            })
    }

    fn nearest_in_scope(
        &self,
        name: &str,
        modules: &[String],
        containing: &[String],
    ) -> Option<&PartialGroup> {
        for depth in (1..=containing.len()).rev() {
            let scoped = format!("{}.{}", containing[..depth].join("."), name);
            if let Some(group) = self.find(&scoped, modules) {
                return Some(group);
            }
        }
        if let Some(group) = self.find(name, modules) {
            return Some(group);
        }

        let (module, rest) = name.split_once('.')?;
        if !modules.iter().any(|m| m == module) {
            return None;
        }
        let group = self.lookup(rest, module)?;
        base_partial(group).map(|_| group)
    }
}

/// Reduce a raw reference to its store key: `@escaping Outer<T>.Inner?` becomes `Outer.Inner`.
fn lookup_key(raw: &str) -> String {
    let parsed = TypeRef::parse(raw);
    match parsed.nominal_path() {
        Some(path) => path,
        None => strip_generics(raw.trim().trim_end_matches(['?', '!'])),
    }
}

// ============================================================================
// Tests
// ============================================================================
