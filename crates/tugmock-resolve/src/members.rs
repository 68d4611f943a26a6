//! Member construction and inheritance merge rules.
//!
//! Declared members are built from raw parser output and qualified from the declaring scope.
//! Inherited members are filtered per ancestor edge, optionally re-qualified under a generic
//! specialization, and collapsed by [`MemberKey`] so that a member reachable through several
//! ancestors appears once.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use tugmock_core::decl::{
    AccessLevel, Attributes, DeclKind, GenericParamDecl, MethodDecl, PartialDeclaration,
    VariableDecl,
};
use tugmock_core::member::{
    mentions_self, short_name, GenericType, MemberKey, MemberOrigin, Method, MethodParameter,
    Variable, WhereClause,
};
use tugmock_core::typeref::{split_top_level, strip_generics};

use crate::qualify::{NameQualifier, QualifyMode, QualifyOptions, QualifyScope};
use crate::resolved::ResolvedType;
use crate::specialize::SpecializationContext;
use crate::store::VisibleModules;

// ============================================================================
// Member Set
// ============================================================================

/// Ordered, de-duplicated members of one type.
#[derive(Debug, Default)]
pub struct MemberSet {
    methods: Vec<Method>,
    method_keys: HashSet<MemberKey>,
    variables: Vec<Variable>,
    variable_keys: HashSet<MemberKey>,
}

impl MemberSet {
    /// Insert unless an equivalent member is already present. The first insertion wins.
    pub fn insert_method(&mut self, method: Method) -> bool {
        if !self.method_keys.insert(method.key()) {
            return false;
        }
        self.methods.push(method);
        true
    }

    pub fn insert_variable(&mut self, variable: Variable) -> bool {
        if !self.variable_keys.insert(variable.key()) {
            return false;
        }
        self.variables.push(variable);
        true
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Whether any designated initializer has been declared so far.
    pub fn defines_designated_initializer(&self) -> bool {
        self.methods.iter().any(|m| m.is_designated_initializer)
    }

    /// Members in output order: methods by name and signature, variables by name.
    pub fn into_sorted(mut self) -> (Vec<Method>, Vec<Variable>) {
        self.methods.sort_by_key(Method::sort_key);
        self.variables
            .sort_by(|a, b| (&a.name, &a.type_name).cmp(&(&b.name, &b.type_name)));
        (self.methods, self.variables)
    }
}

// ============================================================================
// Declared Members
// ============================================================================

/// Declaring scope recorded on every member built from `partial`.
pub fn origin_of(partial: &PartialDeclaration) -> MemberOrigin {
    let lookup_name = partial.lookup_name();
    let mut generic_type_context = partial.generic_type_context.clone();
    generic_type_context.push(partial.generic_type_names.clone());
    MemberOrigin {
        module_name: partial.module_name().to_string(),
        containing_type_names: split_top_level(&lookup_name, '.')
            .into_iter()
            .map(str::to_string)
            .collect(),
        generic_type_context,
    }
}

/// Build the members declared directly in `partials`. Extension bodies do not contribute.
pub fn declared_members(
    qualifier: &NameQualifier<'_>,
    partials: &[Arc<PartialDeclaration>],
    base_kind: DeclKind,
    visible: &Arc<VisibleModules>,
) -> MemberSet {
    let mut members = MemberSet::default();
    for partial in partials.iter().filter(|p| p.kind != DeclKind::Extension) {
        let scope = QualifyScope::inside(partial, Arc::clone(visible));
        let origin = origin_of(partial);
        for decl in &partial.methods {
            if let Some(method) = build_method(qualifier, decl, partial, base_kind, &scope, &origin) {
                members.insert_method(method);
            }
        }
        for decl in &partial.variables {
            if let Some(variable) =
                build_variable(qualifier, decl, partial, base_kind, &scope, &origin)
            {
                members.insert_variable(variable);
            }
        }
    }
    members
}

fn build_method(
    qualifier: &NameQualifier<'_>,
    decl: &MethodDecl,
    partial: &PartialDeclaration,
    base_kind: DeclKind,
    scope: &QualifyScope,
    origin: &MemberOrigin,
) -> Option<Method> {
    if short_name(&decl.name) == "deinit" || !decl.scope.is_mockable_in(base_kind) {
        return None;
    }
    let attributes = Attributes::from_keywords(&decl.attributes);
    if attributes.contains(Attributes::FINAL) {
        return None;
    }

    let is_initializer = decl.name.starts_with("init(");
    let is_mockable = decl
        .access_level
        .is_mockable_member(base_kind, partial.file.should_mock)
        || (is_initializer && decl.access_level.is_mockable());

    let generic_names: Vec<String> = decl.generic_parameters.iter().map(|g| g.name.clone()).collect();
    let method_scope = (!generic_names.is_empty()).then(|| scope.with_generic_level(generic_names));
    let scope = method_scope.as_ref().unwrap_or(scope);
    let qualify =
        |text: &str| qualifier.qualify(text, QualifyMode::ModuleQualified, QualifyOptions::STANDARD, scope);

    let return_type_name = qualify(decl.return_type.as_deref().unwrap_or("Void"));
    let parameters: Vec<MethodParameter> = decl
        .parameters
        .iter()
        .map(|p| {
            let type_name = qualify(&p.type_name);
            MethodParameter {
                label: p.label.clone(),
                name: p.name.clone(),
                has_self_constraint: mentions_self(&type_name),
                type_name,
            }
        })
        .collect();
    let generic_types = decl
        .generic_parameters
        .iter()
        .map(|g| generic_type(qualifier, g, scope))
        .collect();
    let where_clauses = decl
        .where_clauses
        .iter()
        .filter_map(|raw| qualifier.qualify_where_clause(raw, scope))
        .collect();
    let has_self_constraint =
        mentions_self(&return_type_name) || parameters.iter().any(|p| p.has_self_constraint);

    Some(Method {
        name: decl.name.clone(),
        short_name: short_name(&decl.name).to_string(),
        return_type_name,
        parameters,
        scope: decl.scope,
        access_level: decl.access_level,
        attributes,
        generic_types,
        where_clauses,
        is_initializer,
        is_designated_initializer: is_initializer && !attributes.contains(Attributes::CONVENIENCE),
        is_mockable,
        has_self_constraint,
        origin: origin.clone(),
    })
}

fn build_variable(
    qualifier: &NameQualifier<'_>,
    decl: &VariableDecl,
    partial: &PartialDeclaration,
    base_kind: DeclKind,
    scope: &QualifyScope,
    origin: &MemberOrigin,
) -> Option<Variable> {
    if !decl.scope.is_mockable_in(base_kind) {
        return None;
    }
    let attributes = Attributes::from_keywords(&decl.attributes);
    if attributes.contains(Attributes::FINAL) {
        return None;
    }
    let type_name = qualifier.qualify(
        &decl.type_name,
        QualifyMode::ModuleQualified,
        QualifyOptions::STANDARD,
        scope,
    );
    Some(Variable {
        name: decl.name.clone(),
        has_self_constraint: mentions_self(&type_name),
        type_name,
        scope: decl.scope,
        access_level: decl.access_level,
        attributes,
        is_mockable: decl
            .access_level
            .is_mockable_member(base_kind, partial.file.should_mock),
        origin: origin.clone(),
    })
}

/// Qualify one generic parameter or associated type declaration.
pub fn generic_type(
    qualifier: &NameQualifier<'_>,
    decl: &GenericParamDecl,
    scope: &QualifyScope,
) -> GenericType {
    let constraints: BTreeSet<String> = decl
        .constraints
        .iter()
        .map(|c| qualifier.qualify(c, QualifyMode::ModuleQualified, QualifyOptions::STANDARD, scope))
        .collect();
    let where_clauses: Vec<WhereClause> = decl
        .where_clauses
        .iter()
        .filter_map(|raw| qualifier.qualify_where_clause(raw, scope))
        .collect();
    let has_self_constraint = constraints.iter().any(|c| mentions_self(c))
        || where_clauses.iter().any(|w| w.has_self_constraint);
    GenericType {
        name: decl.name.clone(),
        constraints,
        where_clauses,
        has_self_constraint,
    }
}

// ============================================================================
// Inheritance
// ============================================================================

/// The inheriting side of one ancestor edge.
#[derive(Debug, Clone, Copy)]
pub struct InheritRules<'a> {
    pub base_kind: DeclKind,
    pub base_module: &'a str,
    /// The inheriting type declares its own designated initializer.
    pub defines_designated_initializer: bool,
}

impl InheritRules<'_> {
    /// Classes do not take members from the protocols they conform to.
    pub fn inherits_members_of(&self, ancestor: &ResolvedType) -> bool {
        self.base_kind == DeclKind::Protocol || ancestor.kind != DeclKind::Protocol
    }

    fn keeps_method(&self, ancestor: &ResolvedType, method: &Method) -> bool {
        let implicit = method.is_implicit();
        if !(self.inherits_members_of(ancestor) || implicit) {
            return false;
        }
        if !method.scope.is_mockable_in(self.base_kind) {
            return false;
        }
        let suppressed = self.base_kind != DeclKind::Protocol
            && !implicit
            && self.defines_designated_initializer
            && method.is_initializer;
        !suppressed
            && self.visible_across_modules(ancestor, method.access_level, method.is_initializer)
    }

    fn keeps_variable(&self, ancestor: &ResolvedType, variable: &Variable) -> bool {
        (self.inherits_members_of(ancestor) || variable.is_implicit())
            && variable.scope.is_mockable_in(self.base_kind)
            && self.visible_across_modules(ancestor, variable.access_level, false)
    }

    /// Class members must be `open` to be overridden from another module (initializers need
    /// only be `public`). Protocol requirements share their protocol's access level.
    fn visible_across_modules(
        &self,
        ancestor: &ResolvedType,
        access: AccessLevel,
        is_initializer: bool,
    ) -> bool {
        if ancestor.module_name == self.base_module {
            return true;
        }
        match ancestor.kind {
            DeclKind::Class => match access {
                AccessLevel::Open => true,
                AccessLevel::Public => is_initializer,
                _ => false,
            },
            _ => matches!(ancestor.access_level, AccessLevel::Open | AccessLevel::Public),
        }
    }
}

/// Re-qualifies inherited member text under one specialization edge.
pub struct Specializer<'q, 'a> {
    pub qualifier: &'q NameQualifier<'a>,
    pub visible: Arc<VisibleModules>,
    /// Generic context of the inheriting type, outermost first.
    pub base_generic_context: Vec<Vec<String>>,
    pub context: Arc<SpecializationContext>,
}

impl Specializer<'_, '_> {
    fn scope_for(&self, origin: &MemberOrigin, own_generics: &[String]) -> QualifyScope {
        let excluded: BTreeSet<String> = own_generics.iter().cloned().collect();
        let scope = QualifyScope::for_origin(origin, Arc::clone(&self.visible), &self.base_generic_context)
            .specialized(Arc::clone(&self.context), excluded);
        if own_generics.is_empty() {
            scope
        } else {
            scope.with_generic_level(own_generics.to_vec())
        }
    }

    fn qualify(&self, text: &str, scope: &QualifyScope) -> String {
        self.qualifier.qualify(
            text,
            QualifyMode::ModuleQualified,
            QualifyOptions::STANDARD | QualifyOptions::SPECIALIZE,
            scope,
        )
    }

    pub fn method(&self, method: &Method) -> Method {
        let own_generics: Vec<String> = method.generic_types.iter().map(|g| g.name.clone()).collect();
        let scope = self.scope_for(&method.origin, &own_generics);

        let mut specialized = method.clone();
        specialized.return_type_name = self.qualify(&method.return_type_name, &scope);
        for parameter in &mut specialized.parameters {
            parameter.type_name = self.qualify(&parameter.type_name, &scope);
            parameter.has_self_constraint = mentions_self(&parameter.type_name);
        }
        for generic in &mut specialized.generic_types {
            generic.constraints = generic
                .constraints
                .iter()
                .map(|c| self.qualify(c, &scope))
                .collect();
        }
        specialized.where_clauses = method
            .where_clauses
            .iter()
            .map(|w| {
                WhereClause::new(
                    &self.qualify(&w.constrained_type_name, &scope),
                    &self.qualify(&w.generic_constraint, &scope),
                    w.requirement,
                )
            })
            .collect();
        specialized.has_self_constraint = mentions_self(&specialized.return_type_name)
            || specialized.parameters.iter().any(|p| p.has_self_constraint);
        specialized
    }

    /// Re-qualify a name the ancestor itself inherits (`App.Box<U>` inside `Wrapper<U>`).
    pub fn inherited_name(&self, ancestor: &ResolvedType, name: &str) -> String {
        if !name.contains('<') {
            return name.to_string();
        }
        let origin = MemberOrigin {
            module_name: ancestor.module_name.clone(),
            containing_type_names: split_top_level(&strip_generics(&ancestor.fully_qualified_name), '.')
                .into_iter()
                .map(str::to_string)
                .collect(),
            generic_type_context: ancestor.generic_type_context.clone(),
        };
        self.qualify(name, &self.scope_for(&origin, &[]))
    }

    pub fn variable(&self, variable: &Variable) -> Variable {
        let scope = self.scope_for(&variable.origin, &[]);
        let mut specialized = variable.clone();
        specialized.type_name = self.qualify(&variable.type_name, &scope);
        specialized.has_self_constraint = mentions_self(&specialized.type_name);
        specialized
    }
}

/// Merge `ancestor`'s members into `members` under `rules`.
pub fn inherit_members(
    members: &mut MemberSet,
    ancestor: &ResolvedType,
    rules: &InheritRules<'_>,
    specializer: Option<&Specializer<'_, '_>>,
) {
    for method in ancestor.methods.iter().filter(|m| rules.keeps_method(ancestor, m)) {
        let method = match specializer {
            Some(specializer) => specializer.method(method),
            None => method.clone(),
        };
        members.insert_method(method);
    }
    for variable in ancestor
        .variables
        .iter()
        .filter(|v| rules.keeps_variable(ancestor, v))
    {
        let variable = match specializer {
            Some(specializer) => specializer.variable(variable),
            None => variable.clone(),
        };
        members.insert_variable(variable);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::AliasResolver;
    use crate::sink::DiagnosticSink;
    use crate::store::PartialStore;
    use crate::test_helpers::{
        class, file, method, method_with, project_store, protocol, variable, DeclarationExt,
    };
    use tugmock_core::decl::{ParsedFile, TypeScope};

    fn build(files: Vec<ParsedFile>, module: &str, name: &str) -> MemberSet {
        let store: PartialStore = project_store(files);
        let aliases = AliasResolver::new();
        let sink = DiagnosticSink::new();
        let qualifier = NameQualifier::new(&store, &aliases, &sink);
        let partials = store.lookup(name, module).unwrap();
        let modules: Vec<&str> = store.module_names().map(String::as_str).collect();
        declared_members(
            &qualifier,
            partials,
            partials[0].kind,
            &Arc::new(VisibleModules::of(&modules)),
        )
    }

    mod construction {
        use super::*;

        #[test]
        fn return_type_defaults_to_void() {
            let members = build(
                vec![file("App", "A.swift", vec![class("Service").with_methods(vec![method("run()")])])],
                "App",
                "Service",
            );
            let run = &members.methods()[0];
            assert_eq!(run.return_type_name, "Void");
            assert_eq!(run.short_name, "run");
            assert!(run.is_mockable);
        }

        #[test]
        fn deinit_final_and_static_class_members_are_skipped() {
            let mut stat = method("make()");
            stat.scope = TypeScope::Static;
            let mut fin = method("locked()");
            fin.attributes = vec!["final".to_string()];
            let service = class("Service").with_methods(vec![method("deinit"), stat, fin, method("ok()")]);
            let members = build(vec![file("App", "A.swift", vec![service])], "App", "Service");
            let names: Vec<&str> = members.methods().iter().map(|m| m.name.as_str()).collect();
            assert_eq!(names, vec!["ok()"]);
        }

        #[test]
        fn static_members_survive_in_protocols() {
            let mut stat = method("make()");
            stat.scope = TypeScope::Static;
            let members = build(
                vec![file("App", "A.swift", vec![protocol("Factory").with_methods(vec![stat])])],
                "App",
                "Factory",
            );
            assert_eq!(members.methods().len(), 1);
        }

        #[test]
        fn initializers_are_classified() {
            let mut convenience = method("init(name:)");
            convenience.attributes = vec!["convenience".to_string()];
            let members = build(
                vec![file(
                    "App",
                    "A.swift",
                    vec![class("Service").with_methods(vec![method("init()"), convenience])],
                )],
                "App",
                "Service",
            );
            let designated = members.methods().iter().find(|m| m.name == "init()").unwrap();
            assert!(designated.is_initializer && designated.is_designated_initializer);
            let convenience = members.methods().iter().find(|m| m.name == "init(name:)").unwrap();
            assert!(convenience.is_initializer && !convenience.is_designated_initializer);
            assert!(members.defines_designated_initializer());
        }

        #[test]
        fn self_references_mark_constraint() {
            let copy = method_with("copy(from:)", &[("from", "Self")], Some("Self"));
            let members = build(
                vec![file("App", "A.swift", vec![protocol("Copyable").with_methods(vec![copy])])],
                "App",
                "Copyable",
            );
            let copy = &members.methods()[0];
            assert_eq!(copy.return_type_name, "#Self#");
            assert!(copy.has_self_constraint);
            assert!(copy.parameters[0].has_self_constraint);
        }

        #[test]
        fn member_types_are_module_qualified() {
            let members = build(
                vec![file(
                    "App",
                    "A.swift",
                    vec![
                        class("User"),
                        class("Service")
                            .with_variables(vec![variable("current", "User?")])
                            .with_methods(vec![method_with("find(id:)", &[("id", "Int")], Some("[User]"))]),
                    ],
                )],
                "App",
                "Service",
            );
            assert_eq!(members.variables()[0].type_name, "App.User?");
            assert_eq!(members.methods()[0].return_type_name, "[App.User]");
        }

        #[test]
        fn method_generics_stay_local() {
            let mut fetch = method_with("fetch(_:)", &[("_", "T")], Some("T"));
            fetch.generic_parameters = vec![crate::test_helpers::generic("T")];
            let members = build(
                vec![file("App", "A.swift", vec![class("T"), class("Loader").with_methods(vec![fetch])])],
                "App",
                "Loader",
            );
            assert_eq!(members.methods()[0].return_type_name, "T");
        }

        #[test]
        fn extension_members_are_not_collected() {
            let ext = crate::test_helpers::extension("Service").with_methods(vec![method("helper()")]);
            let members = build(
                vec![file(
                    "App",
                    "A.swift",
                    vec![class("Service").with_methods(vec![method("run()")]), ext],
                )],
                "App",
                "Service",
            );
            assert_eq!(members.methods().len(), 1);
        }
    }

    mod member_set {
        use super::*;

        #[test]
        fn duplicates_keep_first() {
            let members = build(
                vec![file("App", "A.swift", vec![class("Service").with_methods(vec![method("run()")])])],
                "App",
                "Service",
            );
            let mut set = MemberSet::default();
            let original = members.methods()[0].clone();
            let mut shadow = original.clone();
            shadow.is_mockable = false;
            assert!(set.insert_method(original));
            assert!(!set.insert_method(shadow));
            assert!(set.methods()[0].is_mockable);
        }
    }
}
