//! Inheritance flattening.
//!
//! [`FlatteningResolver::resolve`] turns the partials of one type into a [`ResolvedType`]:
//! own members, plus every member inherited from transitively resolved ancestors, qualified
//! and de-duplicated. Ancestors are resolved depth-first and memoized in the shared
//! [`ResolutionContext`] cache, so a type reached from many roots is flattened once (or a few
//! times, redundantly, under parallel resolution).
//!
//! ## Per-type lifecycle
//!
//! ```text
//! Unvisited -> Resolving (on this worker's stack) -> Preliminary (cached, nested types pending)
//!           -> Complete (cached, nested types attached)
//! ```
//!
//! A type that reaches itself through its own ancestors is cut at the repeated edge; the edge
//! is treated like an unresolved name.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use tugmock_core::decl::{Attributes, DeclKind, PartialDeclaration};
use tugmock_core::diagnostics::{Diagnostic, DiagnosticCode};
use tugmock_core::member::{Requirement, SELF_TOKEN};
use tugmock_core::typeref::strip_generics;

use crate::context::ResolutionContext;
use crate::error::{ResolveError, ResolveResult};
use crate::members::{declared_members, generic_type, inherit_members, InheritRules, Specializer};
use crate::qualify::{NameQualifier, QualifyMode, QualifyOptions, QualifyScope};
use crate::resolved::{Completion, ResolvedType};
use crate::specialize::SpecializationContext;
use crate::store::{base_partial, PartialGroup, VisibleModules};

/// Whether a type's declaration allows generating a mock for it at all.
pub fn is_mockable_declaration(base: &PartialDeclaration, partials: &PartialGroup) -> bool {
    base.kind.is_mockable()
        && base.access_level.is_mockable_type(base.file.should_mock)
        && !partials
            .iter()
            .any(|p| p.attributes.contains(Attributes::FINAL))
}

/// One resolved ancestor edge.
#[derive(Debug, Clone)]
struct Ancestor {
    resolved: Arc<ResolvedType>,
    specialization: Option<Arc<SpecializationContext>>,
    /// Reached through a `Self: X` requirement rather than an inheritance clause.
    from_self_constraint: bool,
}

/// Everything the ancestor lookup produced for one type.
#[derive(Debug, Default)]
struct AncestorSet {
    ancestors: Vec<Ancestor>,
    /// Raw names that matched nothing (or were cut as cycles), in discovery order.
    opaque: Vec<String>,
}

/// Per-type resolution inputs shared by the helper steps.
struct TypeFrame<'f> {
    key: &'f str,
    base: &'f Arc<PartialDeclaration>,
    visible: Arc<VisibleModules>,
    scope: QualifyScope,
}

pub struct FlatteningResolver<'c> {
    ctx: &'c ResolutionContext,
}

impl<'c> FlatteningResolver<'c> {
    pub fn new(ctx: &'c ResolutionContext) -> Self {
        FlatteningResolver { ctx }
    }

    /// Resolve the type whose partials are `partials`.
    ///
    /// Returns `Ok(None)` when the type cannot be mocked (wrong kind, `final`, inaccessible, or
    /// only extensions are known). An empty partial set is a caller bug.
    pub fn resolve(&self, partials: &PartialGroup) -> ResolveResult<Option<Arc<ResolvedType>>> {
        let mut visiting = Vec::new();
        self.resolve_group(partials, &mut visiting)
    }

    fn resolve_group(
        &self,
        partials: &PartialGroup,
        visiting: &mut Vec<String>,
    ) -> ResolveResult<Option<Arc<ResolvedType>>> {
        if partials.is_empty() {
            return Err(ResolveError::EmptyPartialSet {
                context: visiting.last().cloned(),
            });
        }
        let Some(base) = base_partial(partials) else {
            return Ok(None);
        };
        let key = base.fully_qualified_module_name();
        if let Some(entry) = self.ctx.cached(&key) {
            return Ok(entry.resolved().cloned());
        }
        if !is_mockable_declaration(base, partials) {
            tracing::debug!(type_name = %key, kind = base.kind.as_str(), "not mockable");
            self.ctx.insert_unmockable(&key);
            return Ok(None);
        }

        let _span = tracing::debug_span!("flatten", type_name = %key).entered();
        visiting.push(key.clone());
        let flattened = self.flatten(&key, base, partials, visiting);
        visiting.pop();
        let preliminary = Arc::new(flattened?);
        self.ctx.insert_preliminary(&key, Arc::clone(&preliminary));

        let contained_types = self.resolve_contained(partials, visiting)?;
        let mut complete = (*preliminary).clone();
        complete.contained_types = contained_types;
        complete.completion = Completion::Complete;
        let complete = Arc::new(complete);
        self.ctx.insert_complete(&key, Arc::clone(&complete));
        tracing::debug!(
            type_name = %key,
            methods = complete.methods.len(),
            variables = complete.variables.len(),
            ancestors = complete.all_inherited_type_names.len(),
            "flattened"
        );
        Ok(Some(complete))
    }

    /// Resolve nested types of every partial. Each nested type is resolved with all of its
    /// own partials, so extensions of nested types are merged too.
    fn resolve_contained(
        &self,
        partials: &PartialGroup,
        visiting: &mut Vec<String>,
    ) -> ResolveResult<Vec<String>> {
        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        for child in partials.iter().flat_map(|p| p.contained.iter()) {
            let lookup_name = child.lookup_name();
            if !seen.insert((child.module_name().to_string(), lookup_name.clone())) {
                continue;
            }
            let group = self
                .ctx
                .store
                .lookup(&lookup_name, child.module_name())
                .unwrap_or(std::slice::from_ref(child));
            if let Some(resolved) = self.resolve_group(group, visiting)? {
                keys.push(resolved.key.clone());
            }
        }
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    fn flatten(
        &self,
        key: &str,
        base: &Arc<PartialDeclaration>,
        partials: &PartialGroup,
        visiting: &mut Vec<String>,
    ) -> ResolveResult<ResolvedType> {
        let visible = Arc::new(self.ctx.visible_modules(partials));
        let frame = TypeFrame {
            key,
            base,
            scope: QualifyScope::inside(base, Arc::clone(&visible)),
            visible,
        };
        let qualifier = self.ctx.qualifier();

        let mut members = declared_members(&qualifier, partials, base.kind, &frame.visible);
        let rules = InheritRules {
            base_kind: base.kind,
            base_module: base.module_name(),
            defines_designated_initializer: members.defines_designated_initializer(),
        };

        let inheritance_names = unique(partials.iter().flat_map(|p| p.inherited_type_names.iter()));
        let self_constraint_names =
            unique(partials.iter().flat_map(|p| p.self_conformance_type_names.iter()));
        let inherited = self.resolve_ancestors(&frame, &inheritance_names, false, visiting)?;
        let self_constraints = if base.kind == DeclKind::Protocol {
            self.resolve_ancestors(&frame, &self_constraint_names, true, visiting)?
        } else {
            AncestorSet::default()
        };

        let base_generic_context = {
            let mut context = base.generic_type_context.clone();
            context.push(base.generic_type_names.clone());
            context
        };
        let specializer_for = |ancestor: &Ancestor| {
            ancestor.specialization.as_ref().map(|context| Specializer {
                qualifier: &qualifier,
                visible: Arc::clone(&frame.visible),
                base_generic_context: base_generic_context.clone(),
                context: Arc::clone(context),
            })
        };

        // Inheritance pass.
        let mut inherited_types = Vec::new();
        let mut all_inherited_type_names = Vec::new();
        let mut opaque: BTreeSet<String> = inherited.opaque.iter().cloned().collect();
        let mut generic_types: Vec<_> = base
            .generic_parameters
            .iter()
            .map(|g| generic_type(&qualifier, g, &frame.scope))
            .collect();
        let mut where_clauses: Vec<_> = base
            .where_clauses
            .iter()
            .filter_map(|raw| qualifier.qualify_where_clause(raw, &frame.scope))
            .filter(|w| {
                !(w.requirement == Requirement::Conforms && w.constrained_type_name == SELF_TOKEN)
            })
            .collect();
        let mut subclasses_external_type = false;

        for ancestor in &inherited.ancestors {
            let resolved = &ancestor.resolved;
            if base.kind == DeclKind::Class && resolved.kind == DeclKind::Class {
                subclasses_external_type |= resolved.module_name != base.module_name()
                    || resolved.subclasses_external_type;
            }
            let specializer = specializer_for(ancestor);
            inherit_members(&mut members, resolved, &rules, specializer.as_ref());
            if !rules.inherits_members_of(resolved) {
                continue;
            }
            inherited_types.push(resolved.key.clone());
            all_inherited_type_names.extend(resolved.all_inherited_type_names.iter().map(|name| {
                match &specializer {
                    Some(specializer) => specializer.inherited_name(resolved, name),
                    None => name.clone(),
                }
            }));
            all_inherited_type_names.push(self.specialized_name(&qualifier, ancestor, &frame));
            opaque.extend(resolved.opaque_inherited_type_names.iter().cloned());
            if base.kind == DeclKind::Protocol && resolved.kind == DeclKind::Protocol {
                generic_types.extend(resolved.generic_types.iter().cloned());
                where_clauses.extend(resolved.where_clauses.iter().cloned());
            }
        }
        all_inherited_type_names.extend(inherited.opaque.iter().cloned());

        // Conformance pass (protocols): what a conforming type must also be.
        let mut self_conformance_types = BTreeSet::new();
        let mut all_self_conformance_type_names = Vec::new();
        let mut conformance_names: BTreeMap<String, String> = BTreeMap::new();
        if base.kind == DeclKind::Protocol {
            let conformance = self_constraints
                .ancestors
                .iter()
                .chain(inherited.ancestors.iter());
            for ancestor in conformance {
                let resolved = &ancestor.resolved;
                inherit_members(&mut members, resolved, &rules, specializer_for(ancestor).as_ref());
                self_conformance_types.extend(resolved.self_conformance_types.iter().cloned());
                all_self_conformance_type_names
                    .extend(resolved.all_self_conformance_type_names.iter().cloned());
                opaque.extend(resolved.opaque_inherited_type_names.iter().cloned());
                if ancestor.from_self_constraint || resolved.kind == DeclKind::Class {
                    let name = self.specialized_name(&qualifier, ancestor, &frame);
                    self_conformance_types.insert(resolved.key.clone());
                    all_self_conformance_type_names.push(name.clone());
                    conformance_names.entry(resolved.key.clone()).or_insert(name);
                }
            }
            all_self_conformance_type_names.extend(self_constraints.opaque.iter().cloned());
            opaque.extend(self_constraints.opaque.iter().cloned());
        }

        let (primary_self_conformance_type, primary_self_conformance_type_name) =
            if base.kind == DeclKind::Protocol {
                self.primary_conformance(&inherited.ancestors, &self_conformance_types, &conformance_names)
            } else {
                (None, None)
            };

        let (methods, variables) = members.into_sorted();
        dedup_in_order(&mut all_inherited_type_names);
        dedup_in_order(&mut all_self_conformance_type_names);
        inherited_types.sort();
        inherited_types.dedup();
        where_clauses.sort();
        where_clauses.dedup();
        let mut seen_generics = HashSet::new();
        generic_types.retain(|g| seen_generics.insert(g.name.clone()));

        let has_self_constraint = methods.iter().any(|m| m.has_self_constraint)
            || variables.iter().any(|v| v.has_self_constraint)
            || generic_types.iter().any(|g| g.has_self_constraint)
            || where_clauses.iter().any(|w| w.has_self_constraint);

        let fully_qualified_module_name = qualifier.qualify(
            &base.fully_qualified_module_name(),
            QualifyMode::ModuleQualified,
            QualifyOptions::STANDARD,
            &frame.scope,
        );

        Ok(ResolvedType {
            name: base.name.clone(),
            module_name: base.module_name().to_string(),
            fully_qualified_name: base.fully_qualified_name.clone(),
            fully_qualified_module_name,
            key: key.to_string(),
            kind: base.kind,
            access_level: base.access_level,
            attributes: partials
                .iter()
                .fold(Attributes::empty(), |acc, p| acc | p.attributes),
            methods,
            variables,
            inherited_types,
            all_inherited_type_names,
            has_opaque_inherited_type: !opaque.is_empty(),
            opaque_inherited_type_names: opaque,
            self_conformance_types: self_conformance_types.into_iter().collect(),
            all_self_conformance_type_names,
            primary_self_conformance_type,
            primary_self_conformance_type_name,
            generic_type_context: base_generic_context,
            generic_types,
            where_clauses,
            contained_types: Vec::new(),
            should_mock: base.file.should_mock,
            is_contained_type: base.is_contained_type(),
            is_in_generic_containing_type: base
                .generic_type_context
                .iter()
                .any(|level| !level.is_empty()),
            subclasses_external_type,
            has_self_constraint,
            completion: Completion::Preliminary,
            location: base.location(),
        })
    }

    // ------------------------------------------------------------------------
    // Ancestor lookup
    // ------------------------------------------------------------------------

    fn resolve_ancestors(
        &self,
        frame: &TypeFrame<'_>,
        names: &[String],
        from_self_constraint: bool,
        visiting: &mut Vec<String>,
    ) -> ResolveResult<AncestorSet> {
        let mut set = AncestorSet::default();
        for raw in names {
            let found = self.ctx.store.nearest_visible(
                raw,
                &frame.visible,
                Some(frame.base.module_name()),
                &frame.base.containing_type_names,
            );
            let Some(mut target) = found.and_then(|f| {
                if f.relaxed {
                    tracing::debug!(type_name = frame.key, reference = %raw, "resolved through relaxed linking");
                }
                f.base().cloned()
            }) else {
                self.record_opaque(frame, raw, DiagnosticCode::UnresolvedReference, &mut set);
                continue;
            };

            if frame.base.kind == DeclKind::Protocol {
                target = self.remapped(target);
            }

            if target.kind == DeclKind::TypeAlias {
                let targets = self.ctx.aliases.actual_type_names(
                    &target.fully_qualified_module_name(),
                    &self.ctx.store,
                    &frame.visible,
                );
                let reference = match targets.as_slice() {
                    [_] => self.ctx.aliases.terminal_reference(
                        &target.fully_qualified_module_name(),
                        &self.ctx.store,
                        &frame.visible,
                    ),
                    _ => None,
                };
                for actual in targets.iter() {
                    let group = actual.split_once('.').and_then(|(module, name)| {
                        self.ctx
                            .store
                            .lookup(name, module)
                            .filter(|g| base_partial(g).is_some_and(|b| b.kind != DeclKind::TypeAlias))
                    });
                    match group {
                        Some(group) => {
                            let specialization = reference.as_deref().and_then(|reference| {
                                let ancestor = base_partial(group)?;
                                SpecializationContext::new(reference, ancestor).map(Arc::new)
                            });
                            self.follow_edge(frame, group, actual, specialization, from_self_constraint, visiting, &mut set)?
                        }
                        None => self.record_opaque(frame, actual, DiagnosticCode::UnresolvedAlias, &mut set),
                    }
                }
                continue;
            }

            let specialization = SpecializationContext::new(raw, &target).map(Arc::new);
            let group = self
                .ctx
                .store
                .lookup(&target.lookup_name(), target.module_name())
                .unwrap_or(std::slice::from_ref(&target));
            self.follow_edge(frame, group, raw, specialization, from_self_constraint, visiting, &mut set)?;
        }
        Ok(set)
    }

    #[allow(clippy::too_many_arguments)]
    fn follow_edge(
        &self,
        frame: &TypeFrame<'_>,
        group: &PartialGroup,
        raw: &str,
        specialization: Option<Arc<SpecializationContext>>,
        from_self_constraint: bool,
        visiting: &mut Vec<String>,
        set: &mut AncestorSet,
    ) -> ResolveResult<()> {
        let Some(ancestor_base) = base_partial(group) else {
            return Ok(());
        };
        let ancestor_key = ancestor_base.fully_qualified_module_name();
        if visiting.iter().any(|k| k == &ancestor_key) {
            self.ctx.diagnostics.record(
                Diagnostic::warning(
                    DiagnosticCode::CyclicInheritance,
                    format!("'{}' reaches itself through '{}'", frame.key, ancestor_key),
                )
                .for_type(frame.key)
                .at(frame.base.location()),
            );
            set.opaque.push(raw.to_string());
            return Ok(());
        }
        match self.resolve_group(group, visiting)? {
            Some(resolved) => set.ancestors.push(Ancestor {
                resolved,
                specialization,
                from_self_constraint,
            }),
            None => {
                tracing::debug!(type_name = frame.key, ancestor = %ancestor_key, "skipping unmockable ancestor");
            }
        }
        Ok(())
    }

    fn record_opaque(
        &self,
        frame: &TypeFrame<'_>,
        raw: &str,
        code: DiagnosticCode,
        set: &mut AncestorSet,
    ) {
        self.ctx.diagnostics.record(
            Diagnostic::warning(
                code,
                format!("'{}' references unknown type '{}'", frame.key, raw),
            )
            .for_type(frame.key)
            .at(frame.base.location()),
        );
        set.opaque.push(raw.to_string());
    }

    /// Swap a well-known unmockable protocol ancestor for its configured substitute.
    fn remapped(&self, target: Arc<PartialDeclaration>) -> Arc<PartialDeclaration> {
        let name = target.fully_qualified_module_name();
        let Some(remap) = self.ctx.options.inheritance_remap.get(&name) else {
            return target;
        };
        match self
            .ctx
            .store
            .lookup(&remap.type_name, &remap.module_name)
            .and_then(base_partial)
        {
            Some(substitute) => {
                tracing::debug!(from = %name, to = %substitute.fully_qualified_module_name(), "remapped ancestor");
                Arc::clone(substitute)
            }
            None => target,
        }
    }

    // ------------------------------------------------------------------------
    // Naming helpers
    // ------------------------------------------------------------------------

    /// Ancestor name as seen from the inheriting type, with specialized arguments.
    fn specialized_name(
        &self,
        qualifier: &NameQualifier<'_>,
        ancestor: &Ancestor,
        frame: &TypeFrame<'_>,
    ) -> String {
        let name = &ancestor.resolved.fully_qualified_module_name;
        let Some(specialization) = &ancestor.specialization else {
            return name.clone();
        };
        let args: Vec<String> = specialization
            .type_list
            .iter()
            .map(|arg| {
                qualifier.qualify_type(arg, QualifyMode::ModuleQualified, QualifyOptions::STANDARD, &frame.scope)
            })
            .collect();
        format!("{}<{}>", strip_generics(name), args.join(", "))
    }

    /// The class a conforming type must subclass: inherited from a parent protocol first, then
    /// taken from the conformance set, each in key order.
    fn primary_conformance(
        &self,
        inherited: &[Ancestor],
        self_conformance_types: &BTreeSet<String>,
        conformance_names: &BTreeMap<String, String>,
    ) -> (Option<String>, Option<String>) {
        let mut parents: Vec<&Arc<ResolvedType>> = inherited.iter().map(|a| &a.resolved).collect();
        parents.sort_by(|a, b| a.key.cmp(&b.key));
        if let Some(parent) = parents.iter().find(|p| p.primary_self_conformance_type.is_some()) {
            return (
                parent.primary_self_conformance_type.clone(),
                parent.primary_self_conformance_type_name.clone(),
            );
        }

        let conformances: Vec<Arc<ResolvedType>> = self_conformance_types
            .iter()
            .filter_map(|key| self.ctx.cached(key).and_then(|e| e.resolved().cloned()))
            .collect();
        if let Some(with_primary) = conformances
            .iter()
            .find(|c| c.primary_self_conformance_type.is_some())
        {
            return (
                with_primary.primary_self_conformance_type.clone(),
                with_primary.primary_self_conformance_type_name.clone(),
            );
        }
        conformances
            .iter()
            .find(|c| c.kind == DeclKind::Class)
            .map(|class| {
                let name = conformance_names
                    .get(&class.key)
                    .cloned()
                    .unwrap_or_else(|| class.fully_qualified_module_name.clone());
                (Some(class.key.clone()), Some(name))
            })
            .unwrap_or((None, None))
    }
}

fn unique<'a>(names: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .filter(|n| seen.insert(n.as_str()))
        .cloned()
        .collect()
}

fn dedup_in_order(names: &mut Vec<String>) {
    let mut seen = HashSet::new();
    names.retain(|n| seen.insert(n.clone()));
}
