//! Typealias unwrapping.
//!
//! A typealias may name another alias, a composition (`A & B`) or an unknown type. Unwrapping
//! follows the chain until every target is either a real declaration or unresolvable, and
//! returns the list of actual names. Results are memoized per alias and shared by all workers.
//!
//! # Example
//!
//! ```text
//! typealias Service = Loader & Storage    // Loader, Storage are protocols
//! typealias AppService = Service
//!
//! actual_type_names("App.AppService") == ["App.Loader", "App.Storage"]
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use tugmock_core::decl::{DeclKind, PartialDeclaration};

use crate::store::{PartialStore, VisibleModules};

#[derive(Debug, Default)]
pub struct AliasResolver {
    /// alias `Module.Name` -> declaration
    aliases: HashMap<String, Arc<PartialDeclaration>>,
    unwrapped: RwLock<HashMap<String, Arc<Vec<String>>>>,
}

impl AliasResolver {
    pub fn new() -> Self {
        AliasResolver::default()
    }

    /// Register a typealias partial. Other kinds are ignored.
    pub fn add_alias(&mut self, partial: &Arc<PartialDeclaration>) {
        if partial.kind != DeclKind::TypeAlias {
            return;
        }
        self.aliases
            .entry(partial.fully_qualified_module_name())
            .or_insert_with(|| Arc::clone(partial));
    }

    pub fn is_alias(&self, fully_qualified_module_name: &str) -> bool {
        self.aliases.contains_key(fully_qualified_module_name)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// Fully unwrapped target names for `fully_qualified_module_name`.
    ///
    /// Non-aliases unwrap to themselves. Targets that match no declaration are kept as written.
    /// Targets are looked up from the alias's own declaration site, widened by `visible`.
    pub fn actual_type_names(
        &self,
        fully_qualified_module_name: &str,
        store: &PartialStore,
        visible: &VisibleModules,
    ) -> Arc<Vec<String>> {
        if !self.is_alias(fully_qualified_module_name) {
            return Arc::new(vec![fully_qualified_module_name.to_string()]);
        }
        if let Some(hit) = self.unwrapped.read().get(fully_qualified_module_name) {
            return Arc::clone(hit);
        }

        let mut visiting = HashSet::new();
        let names = Arc::new(self.unwrap(fully_qualified_module_name, store, visible, &mut visiting));
        self.unwrapped
            .write()
            .entry(fully_qualified_module_name.to_string())
            .or_insert_with(|| Arc::clone(&names));
        names
    }

    /// Target text of a single-target alias chain as written at its last link, generic
    /// arguments included (`Box<String>`). `None` for compositions, cycles and non-aliases.
    pub fn terminal_reference(
        &self,
        fully_qualified_module_name: &str,
        store: &PartialStore,
        visible: &VisibleModules,
    ) -> Option<String> {
        let mut key = fully_qualified_module_name.to_string();
        let mut seen = HashSet::new();
        loop {
            let alias = self.aliases.get(&key)?;
            if !seen.insert(key.clone()) {
                return None;
            }
            let [target] = alias.aliased_type_names.as_slice() else {
                return None;
            };
            let resolved = store
                .nearest_visible(
                    target,
                    visible,
                    Some(alias.module_name()),
                    &alias.containing_type_names,
                )
                .and_then(|found| found.base())
                .map(|base| base.fully_qualified_module_name())?;
            if !self.is_alias(&resolved) {
                return Some(target.clone());
            }
            key = resolved;
        }
    }

    fn unwrap(
        &self,
        key: &str,
        store: &PartialStore,
        visible: &VisibleModules,
        visiting: &mut HashSet<String>,
    ) -> Vec<String> {
        let Some(alias) = self.aliases.get(key) else {
            return vec![key.to_string()];
        };
        if !visiting.insert(key.to_string()) {
            tracing::debug!(alias = key, "typealias cycle, keeping alias name");
            return vec![key.to_string()];
        }

        let mut names = Vec::new();
        for target in &alias.aliased_type_names {
            let resolved = store
                .nearest_visible(
                    target,
                    visible,
                    Some(alias.module_name()),
                    &alias.containing_type_names,
                )
                .and_then(|found| found.base())
                .map(|base| base.fully_qualified_module_name());
            match resolved {
                Some(resolved) if self.is_alias(&resolved) => {
                    names.extend(self.unwrap(&resolved, store, visible, visiting));
                }
                Some(resolved) => names.push(resolved),
                None => names.push(target.clone()),
            }
        }
        visiting.remove(key);

        let mut seen = HashSet::new();
        names.retain(|n| seen.insert(n.clone()));
        names
    }
}
