//! Name qualification.
//!
//! Rewrites raw type text as it appears at a declaration site into text that is valid from
//! inside a generated mock: every nominal reference is resolved through the [`PartialStore`]
//! and replaced with its module-qualified (or context-qualified, or alias-resolved) spelling.
//! Structure around nominal references (optionals, collections, function arrows, attributes)
//! is preserved by rendering through [`TypeRef`].
//!
//! ## Modes
//!
//! | Mode               | `Inner` referenced from inside `Outer` in module `App` |
//! |--------------------|---------------------------------------------------------|
//! | `Unqualified`      | `Inner`                                                 |
//! | `ContextQualified` | `Outer.Inner`                                           |
//! | `ModuleQualified`  | `App.Outer.Inner`                                       |
//! | `AliasResolved`    | `App.Outer.Inner`, with typealiases unwrapped           |
//!
//! Generic parameter names in scope are never qualified. Unknown names are kept verbatim
//! (their generic arguments are still qualified).

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use bitflags::bitflags;
use parking_lot::RwLock;
use tugmock_core::decl::{DeclKind, PartialDeclaration};
use tugmock_core::diagnostics::{Diagnostic, DiagnosticCode};
use tugmock_core::member::{MemberOrigin, WhereClause, SELF_TOKEN, SYNTHETIC_SELF_TOKEN};
use tugmock_core::typeref::{split_top_level, strip_generics, TypeKind, TypeRef};

use crate::alias::AliasResolver;
use crate::sink::DiagnosticSink;
use crate::specialize::SpecializationContext;
use crate::store::{PartialStore, VisibleModules};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QualifyMode {
    Unqualified,
    ContextQualified,
    ModuleQualified,
    AliasResolved,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct QualifyOptions: u8 {
        /// Replace `Self` with [`SELF_TOKEN`].
        const TOKENIZE_SELF = 1 << 0;
        /// Drop implicitly-unwrapped markers.
        const EXCLUDE_IUO = 1 << 1;
        /// Substitute generic parameters from the scope's specialization context.
        const SPECIALIZE = 1 << 2;
    }
}

impl QualifyOptions {
    pub const STANDARD: QualifyOptions = QualifyOptions::TOKENIZE_SELF;
}

// ============================================================================
// Scope
// ============================================================================

type MemoKey = (String, QualifyMode, u8);

/// Lexical position that type text is qualified from.
///
/// A scope owns its memo, so scopes are short-lived: one per declaration or member origin.
#[derive(Debug)]
pub struct QualifyScope {
    pub visible: Arc<VisibleModules>,
    pub referencing_module: Option<String>,
    pub containing_type_names: Vec<String>,
    pub generic_type_context: Vec<Vec<String>>,
    pub excluded_generic_names: BTreeSet<String>,
    pub specialization: Option<Arc<SpecializationContext>>,
    memo: RwLock<HashMap<MemoKey, String>>,
}

impl QualifyScope {
    pub fn new(
        visible: Arc<VisibleModules>,
        referencing_module: Option<String>,
        containing_type_names: Vec<String>,
        generic_type_context: Vec<Vec<String>>,
    ) -> Self {
        QualifyScope {
            visible,
            referencing_module,
            containing_type_names,
            generic_type_context,
            excluded_generic_names: BTreeSet::new(),
            specialization: None,
            memo: RwLock::new(HashMap::new()),
        }
    }

    /// Scope of a declaration's body: its own name and generic parameters are in scope.
    pub fn inside(partial: &PartialDeclaration, visible: Arc<VisibleModules>) -> Self {
        let lookup_name = partial.lookup_name();
        let containing = split_top_level(&lookup_name, '.')
            .into_iter()
            .map(str::to_string)
            .collect();
        let mut generics = partial.generic_type_context.clone();
        generics.push(partial.generic_type_names.clone());
        QualifyScope::new(
            visible,
            Some(partial.module_name().to_string()),
            containing,
            generics,
        )
    }

    /// Scope a member was declared in, nested inside the generic context of `outer_generics`.
    pub fn for_origin(
        origin: &MemberOrigin,
        visible: Arc<VisibleModules>,
        outer_generics: &[Vec<String>],
    ) -> Self {
        let mut generics = outer_generics.to_vec();
        generics.extend(origin.generic_type_context.iter().cloned());
        QualifyScope::new(
            visible,
            Some(origin.module_name.clone()),
            origin.containing_type_names.clone(),
            generics,
        )
    }

    /// Same position with one more level of generic parameters (a generic method).
    pub fn with_generic_level(&self, names: Vec<String>) -> Self {
        let mut generics = self.generic_type_context.clone();
        generics.push(names);
        QualifyScope {
            generic_type_context: generics,
            excluded_generic_names: self.excluded_generic_names.clone(),
            specialization: self.specialization.clone(),
            ..QualifyScope::new(
                Arc::clone(&self.visible),
                self.referencing_module.clone(),
                self.containing_type_names.clone(),
                Vec::new(),
            )
        }
    }

    pub fn specialized(
        mut self,
        specialization: Arc<SpecializationContext>,
        excluded_generic_names: BTreeSet<String>,
    ) -> Self {
        self.specialization = Some(specialization);
        self.excluded_generic_names = excluded_generic_names;
        self
    }

    fn excluding(&self, generic_name: &str) -> Self {
        let mut excluded = self.excluded_generic_names.clone();
        excluded.insert(generic_name.to_string());
        QualifyScope {
            generic_type_context: self.generic_type_context.clone(),
            excluded_generic_names: excluded,
            specialization: self.specialization.clone(),
            ..QualifyScope::new(
                Arc::clone(&self.visible),
                self.referencing_module.clone(),
                self.containing_type_names.clone(),
                Vec::new(),
            )
        }
    }

    /// The referencing module followed by the containing type names.
    pub fn containing_scopes(&self) -> Vec<String> {
        self.referencing_module
            .iter()
            .cloned()
            .chain(self.containing_type_names.iter().cloned())
            .collect()
    }

    fn is_generic_name(&self, name: &str) -> bool {
        self.generic_type_context
            .iter()
            .any(|level| level.iter().any(|g| g == name))
    }
}

// ============================================================================
// Qualified Name Forms
// ============================================================================

/// The two qualified spellings of one resolved reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedNames {
    /// `Module.Outer.Name`, keeping the generic arguments written in the reference.
    pub module_qualified: String,
    /// Qualified only as far as needed from the referencing context.
    pub context_qualified: String,
}

/// Compute both spellings of `declaration` (as written) resolved to `partial`.
///
/// `context` is the referencing position (module followed by containing types). The context
/// form starts below the deepest scope the declaration shares with the context, or includes
/// the module when only the module is shared.
pub fn qualified_names(
    partial: &PartialDeclaration,
    declaration: &str,
    context: &[String],
    defining_module: Option<&str>,
) -> QualifiedNames {
    let raw_components: Vec<&str> = split_top_level(declaration, '.');
    let specialized_name = raw_components.last().copied().unwrap_or(declaration);

    let qualifiers: Vec<&str> = defining_module
        .into_iter()
        .chain(partial.containing_type_names.iter().map(String::as_str))
        .chain(std::iter::once(partial.name.as_str()))
        .collect();

    let lca = qualifiers
        .iter()
        .zip(context.iter())
        .enumerate()
        .filter(|(_, (q, c))| **q == c.as_str())
        .map(|(i, _)| i)
        .last()
        .unwrap_or(0);
    let end_index = qualifiers.len() - 1;
    let start_index = (lca + usize::from(lca > 0)).min(end_index);

    let mut module_components = qualifiers[..end_index].to_vec();
    module_components.push(specialized_name);
    let mut context_components = qualifiers[start_index..end_index].to_vec();
    context_components.push(specialized_name);

    QualifiedNames {
        module_qualified: merge_components(&raw_components, &module_components),
        context_qualified: merge_components(&raw_components, &context_components),
    }
}

/// Overlay the written components onto the qualified ones, keeping written generic arguments.
fn merge_components(written: &[&str], qualified: &[&str]) -> String {
    if qualified.len() > written.len() {
        let prefix = &qualified[..qualified.len() - written.len()];
        prefix
            .iter()
            .chain(written.iter())
            .copied()
            .collect::<Vec<_>>()
            .join(".")
    } else {
        written[written.len() - qualified.len()..].join(".")
    }
}

// ============================================================================
// Qualifier
// ============================================================================

/// Stateless qualifier over the shared store; all memoization lives in the [`QualifyScope`].
#[derive(Clone, Copy)]
pub struct NameQualifier<'a> {
    store: &'a PartialStore,
    aliases: &'a AliasResolver,
    diagnostics: &'a DiagnosticSink,
}

impl<'a> NameQualifier<'a> {
    pub fn new(
        store: &'a PartialStore,
        aliases: &'a AliasResolver,
        diagnostics: &'a DiagnosticSink,
    ) -> Self {
        NameQualifier {
            store,
            aliases,
            diagnostics,
        }
    }

    /// Qualify raw type text.
    pub fn qualify(
        &self,
        text: &str,
        mode: QualifyMode,
        options: QualifyOptions,
        scope: &QualifyScope,
    ) -> String {
        self.qualify_type(&TypeRef::parse(text), mode, options, scope)
    }

    pub fn qualify_type(
        &self,
        ty: &TypeRef,
        mode: QualifyMode,
        options: QualifyOptions,
        scope: &QualifyScope,
    ) -> String {
        ty.render_with(
            &mut |nominal| self.qualify_nominal(nominal, mode, options, scope),
            options.contains(QualifyOptions::EXCLUDE_IUO),
        )
    }

    /// Parse and qualify one generic requirement. `Self.` prefixes are dropped from both sides.
    pub fn qualify_where_clause(&self, raw: &str, scope: &QualifyScope) -> Option<WhereClause> {
        let clause = WhereClause::parse(raw)?;
        let side = |text: &str| {
            let qualified =
                self.qualify(text, QualifyMode::ModuleQualified, QualifyOptions::STANDARD, scope);
            match qualified.strip_prefix(SELF_TOKEN).and_then(|rest| rest.strip_prefix('.')) {
                Some(rest) => rest.to_string(),
                None => qualified,
            }
        };
        let constrained = side(&clause.constrained_type_name);
        let constraint = side(&clause.generic_constraint);
        Some(WhereClause::new(&constrained, &constraint, clause.requirement))
    }

    fn qualify_nominal(
        &self,
        type_name: &str,
        mode: QualifyMode,
        options: QualifyOptions,
        scope: &QualifyScope,
    ) -> String {
        let tokenize = options.contains(QualifyOptions::TOKENIZE_SELF);
        if type_name == "Self" {
            return if tokenize { SELF_TOKEN.to_string() } else { type_name.to_string() };
        }
        if let Some(member) = type_name.strip_prefix("Self.") {
            return if tokenize {
                format!("{}.{}", SELF_TOKEN, member)
            } else {
                type_name.to_string()
            };
        }
        if mode == QualifyMode::Unqualified || scope.referencing_module.is_none() {
            return type_name.to_string();
        }

        let key = (type_name.to_string(), mode, options.bits());
        if let Some(hit) = scope.memo.read().get(&key) {
            return hit.clone();
        }
        let qualified = self.resolve_nominal(type_name, mode, options, scope);
        scope.memo.write().insert(key, qualified.clone());
        qualified
    }

    fn resolve_nominal(
        &self,
        type_name: &str,
        mode: QualifyMode,
        options: QualifyOptions,
        scope: &QualifyScope,
    ) -> String {
        if options.contains(QualifyOptions::SPECIALIZE) {
            if let Some(specialized) = self.specialize(type_name, mode, options, scope) {
                return specialized;
            }
        }
        if scope.is_generic_name(type_name) {
            return self.qualify_generic_args(type_name, mode, options, scope);
        }

        let base = self
            .store
            .nearest_visible(
                &strip_generics(type_name),
                &scope.visible,
                scope.referencing_module.as_deref(),
                &scope.containing_type_names,
            )
            .and_then(|found| found.base());
        let Some(base) = base else {
            return self.qualify_generic_args(type_name, mode, options, scope);
        };

        let defining_module = self.defining_module(base, scope);
        let names = qualified_names(
            base,
            type_name,
            &scope.containing_scopes(),
            defining_module.as_deref(),
        );

        match mode {
            QualifyMode::Unqualified => type_name.to_string(),
            QualifyMode::ContextQualified => {
                self.qualify_generic_args(&names.context_qualified, mode, options, scope)
            }
            QualifyMode::ModuleQualified => {
                if base.kind == DeclKind::TypeAlias
                    && base.is_contained_type()
                    && names.context_qualified.len() < names.module_qualified.len()
                {
                    let nested =
                        self.qualify_generic_args(&names.context_qualified, mode, options, scope);
                    return format!("{}.{}", SYNTHETIC_SELF_TOKEN, nested);
                }
                let shadowed = defining_module
                    .as_deref()
                    .filter(|module| self.store.is_module_shadowed(module, None));
                if let Some(module) = shadowed {
                    self.diagnostics.record(Diagnostic::debug(
                        DiagnosticCode::ModuleShadowing,
                        format!(
                            "module '{}' is shadowed by a type of the same name; referencing '{}' without the module qualifier",
                            module, base.fully_qualified_name
                        ),
                    ));
                    let unqualified = names
                        .module_qualified
                        .split_once('.')
                        .map(|(_, rest)| rest)
                        .unwrap_or(&names.module_qualified);
                    return self.qualify_generic_args(unqualified, mode, options, scope);
                }
                self.qualify_generic_args(&names.module_qualified, mode, options, scope)
            }
            QualifyMode::AliasResolved => {
                let joined = if base.kind == DeclKind::TypeAlias {
                    self.aliases
                        .actual_type_names(
                            &base.fully_qualified_module_name(),
                            self.store,
                            &scope.visible,
                        )
                        .join(" & ")
                } else {
                    names.module_qualified
                };
                self.qualify_generic_args(&joined, mode, options, scope)
            }
        }
    }

    /// Replace a generic parameter with its specialized argument, qualified from this scope.
    fn specialize(
        &self,
        type_name: &str,
        mode: QualifyMode,
        options: QualifyOptions,
        scope: &QualifyScope,
    ) -> Option<String> {
        let context = scope.specialization.as_ref()?;
        if scope.excluded_generic_names.contains(type_name) {
            return None;
        }
        let replacement = context.get(type_name)?;
        let attributed = scope.excluding(type_name);
        Some(self.qualify_type(replacement, mode, options, &attributed))
    }

    /// Qualify the generic arguments of nominal text, leaving the base names as they are.
    fn qualify_generic_args(
        &self,
        text: &str,
        mode: QualifyMode,
        options: QualifyOptions,
        scope: &QualifyScope,
    ) -> String {
        if !text.contains('<') {
            return text.to_string();
        }
        let Some(parsed) = TypeRef::try_parse(text) else {
            return text.to_string();
        };
        let TypeKind::Nominal(components) = &parsed.kind else {
            return text.to_string();
        };
        let mut out = components
            .iter()
            .map(|component| {
                if component.generic_args.is_empty() {
                    component.name.clone()
                } else {
                    let args: Vec<String> = component
                        .generic_args
                        .iter()
                        .map(|arg| self.qualify_type(arg, mode, options, scope))
                        .collect();
                    format!("{}<{}>", component.name, args.join(", "))
                }
            })
            .collect::<Vec<_>>()
            .join(".");
        out.push_str(&parsed.optionals);
        out
    }

    /// Module a reference resolves into. Types nested in extensions belong to the extended
    /// type's module, which may differ from the extension's own.
    fn defining_module(&self, base: &PartialDeclaration, scope: &QualifyScope) -> Option<String> {
        if !base.defined_in_extension {
            return Some(base.module_name().to_string());
        }
        let extended = base.containing_type_names.first()?;
        let found = self
            .store
            .nearest_visible(extended, &scope.visible, scope.referencing_module.as_deref(), &[])
            .and_then(|found| found.base());
        match found {
            Some(extended) => Some(extended.module_name().to_string()),
            None => {
                self.diagnostics.record(
                    Diagnostic::warning(
                        DiagnosticCode::UndefinedContainingType,
                        format!(
                            "'{}' is nested in an extension of undefined type '{}'",
                            base.fully_qualified_name, extended
                        ),
                    )
                    .at(base.location()),
                );
                None
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{
        class, extension, file, project_store, protocol, typealias, DeclarationExt,
    };

    struct Fixture {
        store: PartialStore,
        aliases: AliasResolver,
        sink: DiagnosticSink,
    }

    impl Fixture {
        fn new(files: Vec<tugmock_core::decl::ParsedFile>) -> Self {
            let store = project_store(files);
            let mut aliases = AliasResolver::new();
            for group in store.groups() {
                for partial in group {
                    aliases.add_alias(partial);
                }
            }
            Fixture {
                store,
                aliases,
                sink: DiagnosticSink::new(),
            }
        }

        fn qualifier(&self) -> NameQualifier<'_> {
            NameQualifier::new(&self.store, &self.aliases, &self.sink)
        }

        fn scope_in(&self, module: &str, name: &str) -> QualifyScope {
            let group = self.store.lookup(name, module).unwrap();
            QualifyScope::inside(&group[0], Arc::new(self.visible()))
        }

        fn visible(&self) -> VisibleModules {
            let modules: Vec<&str> = self.store.module_names().map(String::as_str).collect();
            VisibleModules::of(&modules)
        }
    }

    fn module_qualified(fixture: &Fixture, scope: &QualifyScope, text: &str) -> String {
        fixture.qualifier().qualify(
            text,
            QualifyMode::ModuleQualified,
            QualifyOptions::STANDARD,
            scope,
        )
    }

    mod name_forms {
        use super::*;

        #[test]
        fn top_level_reference() {
            let fixture = Fixture::new(vec![file(
                "App",
                "A.swift",
                vec![class("Parent"), class("Child")],
            )]);
            let scope = fixture.scope_in("App", "Child");
            let parent = fixture.store.lookup("Parent", "App").unwrap();
            let names = qualified_names(&parent[0], "Parent", &scope.containing_scopes(), Some("App"));
            assert_eq!(names.module_qualified, "App.Parent");
            assert_eq!(names.context_qualified, "App.Parent");
        }

        #[test]
        fn nested_reference_keeps_written_generics() {
            let outer = class("Outer").containing(vec![class("Inner").with_generics(&["T"])]);
            let fixture = Fixture::new(vec![file("App", "A.swift", vec![outer])]);
            let scope = fixture.scope_in("App", "Outer");
            let inner = fixture.store.lookup("Outer.Inner", "App").unwrap();
            let names =
                qualified_names(&inner[0], "Inner<Int>", &scope.containing_scopes(), Some("App"));
            assert_eq!(names.module_qualified, "App.Outer.Inner<Int>");
            assert_eq!(names.context_qualified, "Inner<Int>");
        }
    }

    mod qualification {
        use super::*;

        #[test]
        fn structure_is_preserved() {
            let fixture = Fixture::new(vec![file(
                "App",
                "A.swift",
                vec![class("User"), class("Service")],
            )]);
            let scope = fixture.scope_in("App", "Service");
            assert_eq!(
                module_qualified(&fixture, &scope, "[String: User]?"),
                "[String: App.User]?"
            );
            assert_eq!(
                module_qualified(&fixture, &scope, "(User) async throws -> [User]"),
                "(App.User) async throws -> [App.User]"
            );
            assert_eq!(module_qualified(&fixture, &scope, "Int"), "Int");
        }

        #[test]
        fn unknown_names_keep_qualified_arguments() {
            let fixture = Fixture::new(vec![file("App", "A.swift", vec![class("User")])]);
            let scope = fixture.scope_in("App", "User");
            assert_eq!(
                module_qualified(&fixture, &scope, "Result<User, Error>"),
                "Result<App.User, Error>"
            );
        }

        #[test]
        fn self_is_tokenized() {
            let fixture = Fixture::new(vec![file("App", "A.swift", vec![protocol("Copyable")])]);
            let scope = fixture.scope_in("App", "Copyable");
            assert_eq!(module_qualified(&fixture, &scope, "Self"), "#Self#");
            assert_eq!(module_qualified(&fixture, &scope, "Self.Element?"), "#Self#.Element?");
            let untouched = fixture.qualifier().qualify(
                "Self",
                QualifyMode::ModuleQualified,
                QualifyOptions::empty(),
                &scope,
            );
            assert_eq!(untouched, "Self");
        }

        #[test]
        fn generic_parameters_stay_unqualified() {
            let fixture = Fixture::new(vec![file(
                "App",
                "A.swift",
                vec![class("Box").with_generics(&["T"]), class("T")],
            )]);
            let scope = fixture.scope_in("App", "Box");
            assert_eq!(module_qualified(&fixture, &scope, "[T]"), "[T]");
        }

        #[test]
        fn qualification_is_idempotent() {
            let fixture = Fixture::new(vec![file(
                "App",
                "A.swift",
                vec![class("User"), class("Box").with_generics(&["T"])],
            )]);
            let scope = fixture.scope_in("App", "User");
            let once = module_qualified(&fixture, &scope, "Box<[User]>?");
            assert_eq!(once, "App.Box<[App.User]>?");
            assert_eq!(module_qualified(&fixture, &scope, &once), once);
        }

        #[test]
        fn iuo_markers_can_be_dropped() {
            let fixture = Fixture::new(vec![file("App", "A.swift", vec![class("User")])]);
            let scope = fixture.scope_in("App", "User");
            let qualified = fixture.qualifier().qualify(
                "User!",
                QualifyMode::ModuleQualified,
                QualifyOptions::STANDARD | QualifyOptions::EXCLUDE_IUO,
                &scope,
            );
            assert_eq!(qualified, "App.User");
        }

        #[test]
        fn context_mode_stops_at_shared_scope() {
            let outer = class("Outer").containing(vec![class("Inner"), class("Sibling")]);
            let fixture = Fixture::new(vec![file("App", "A.swift", vec![outer])]);
            let scope = fixture.scope_in("App", "Outer.Sibling");
            let qualified = fixture.qualifier().qualify(
                "Inner",
                QualifyMode::ContextQualified,
                QualifyOptions::STANDARD,
                &scope,
            );
            assert_eq!(qualified, "Inner");
        }
    }

    mod shadowing {
        use super::*;

        #[test]
        fn shadowed_module_prefix_is_dropped() {
            let fixture = Fixture::new(vec![
                file("Foo", "Foo.swift", vec![class("Foo"), class("Bar")]),
                file("App", "App.swift", vec![class("Child")]),
            ]);
            let scope = fixture.scope_in("App", "Child");
            assert_eq!(module_qualified(&fixture, &scope, "Bar"), "Bar");
            assert_eq!(module_qualified(&fixture, &scope, "Foo"), "Foo");
            assert!(fixture
                .sink
                .snapshot()
                .iter()
                .any(|d| d.code == DiagnosticCode::ModuleShadowing));
        }
    }

    mod aliases {
        use super::*;

        #[test]
        fn alias_resolved_mode_unwraps_chains() {
            let fixture = Fixture::new(vec![file(
                "App",
                "A.swift",
                vec![typealias("A", "B"), typealias("B", "Concrete"), class("Concrete")],
            )]);
            let scope = fixture.scope_in("App", "Concrete");
            let qualified = fixture.qualifier().qualify(
                "A",
                QualifyMode::AliasResolved,
                QualifyOptions::STANDARD,
                &scope,
            );
            assert_eq!(qualified, "App.Concrete");
            assert_eq!(module_qualified(&fixture, &scope, "A"), "App.A");
        }

        #[test]
        fn nested_alias_uses_synthetic_self() {
            let owner = protocol("Owner").containing(vec![typealias("Handle", "Int")]);
            let fixture = Fixture::new(vec![file("App", "A.swift", vec![owner])]);
            let scope = fixture.scope_in("App", "Owner");
            assert_eq!(module_qualified(&fixture, &scope, "Handle"), "%Self%.Handle");
        }
    }

    mod specialization {
        use super::*;

        #[test]
        fn generic_parameter_is_replaced() {
            let fixture = Fixture::new(vec![file(
                "App",
                "A.swift",
                vec![class("Box").with_generics(&["T"]), class("User")],
            )]);
            let box_partial = Arc::clone(&fixture.store.lookup("Box", "App").unwrap()[0]);
            let context = SpecializationContext::new("Box<User>", &box_partial).unwrap();
            let scope = QualifyScope::new(
                Arc::new(fixture.visible()),
                Some("App".to_string()),
                vec!["Box".to_string()],
                vec![],
            )
            .specialized(Arc::new(context), BTreeSet::new());
            let qualified = fixture.qualifier().qualify(
                "[T]?",
                QualifyMode::ModuleQualified,
                QualifyOptions::STANDARD | QualifyOptions::SPECIALIZE,
                &scope,
            );
            assert_eq!(qualified, "[App.User]?");
        }

        #[test]
        fn self_referential_argument_terminates() {
            let fixture = Fixture::new(vec![file(
                "App",
                "A.swift",
                vec![class("Box").with_generics(&["T"])],
            )]);
            let box_partial = Arc::clone(&fixture.store.lookup("Box", "App").unwrap()[0]);
            let context = SpecializationContext::new("Box<[T]>", &box_partial).unwrap();
            let scope = QualifyScope::new(
                Arc::new(fixture.visible()),
                Some("App".to_string()),
                vec![],
                vec![],
            )
            .specialized(Arc::new(context), BTreeSet::new());
            let qualified = fixture.qualifier().qualify(
                "T",
                QualifyMode::ModuleQualified,
                QualifyOptions::STANDARD | QualifyOptions::SPECIALIZE,
                &scope,
            );
            assert_eq!(qualified, "[T]");
        }
    }

    mod extensions {
        use super::*;

        #[test]
        fn undefined_extended_type_is_reported() {
            let ext = extension("Missing").containing(vec![class("Nested")]);
            let fixture = Fixture::new(vec![file("App", "A.swift", vec![ext, class("User")])]);
            let scope = fixture.scope_in("App", "User");
            let qualified = module_qualified(&fixture, &scope, "Missing.Nested");
            assert_eq!(qualified, "Missing.Nested");
            assert!(fixture
                .sink
                .snapshot()
                .iter()
                .any(|d| d.code == DiagnosticCode::UndefinedContainingType));
        }
    }
}
