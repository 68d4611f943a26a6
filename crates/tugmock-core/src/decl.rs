//! Declaration input model.
//!
//! The external parser hands us one [`ParsedFile`] per source file, each holding a tree of
//! [`DeclarationNode`]s. Before resolution every node is flattened into an immutable
//! [`PartialDeclaration`]: one occurrence (primary body or extension) of a type, carrying its
//! lexical scope so that later lookups can honor shadowing.
//!
//! Partials that share a fully-qualified name are *not* merged here. Merging is the job of the
//! flattening resolver, which sees every partial of a type at once.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::typeref::{split_top_level, strip_generics};
use crate::types::Location;

// ============================================================================
// Declaration Kinds and Access
// ============================================================================

/// Kind of a type-level declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclKind {
    Class,
    Protocol,
    Struct,
    Enum,
    Extension,
    #[serde(rename = "typealias")]
    TypeAlias,
}

impl DeclKind {
    /// Only classes and protocols can be mocked.
    pub fn is_mockable(self) -> bool {
        matches!(self, DeclKind::Class | DeclKind::Protocol)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeclKind::Class => "class",
            DeclKind::Protocol => "protocol",
            DeclKind::Struct => "struct",
            DeclKind::Enum => "enum",
            DeclKind::Extension => "extension",
            DeclKind::TypeAlias => "typealias",
        }
    }
}

/// Declared access level. Missing access defaults to `internal`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Open,
    Public,
    #[default]
    Internal,
    #[serde(rename = "fileprivate")]
    FilePrivate,
    Private,
}

impl AccessLevel {
    /// Whether a declaration with this access can be referenced from a generated mock at all.
    pub fn is_mockable(self) -> bool {
        !matches!(self, AccessLevel::FilePrivate | AccessLevel::Private)
    }

    /// Type-level rule: internal types are only visible when their module is a mock target.
    pub fn is_mockable_type(self, within_mocked_module: bool) -> bool {
        match self {
            AccessLevel::Open | AccessLevel::Public => true,
            AccessLevel::Internal => within_mocked_module,
            AccessLevel::FilePrivate | AccessLevel::Private => false,
        }
    }

    /// Member-level rule, relative to the kind of the type being mocked.
    pub fn is_mockable_member(self, context: DeclKind, within_mocked_module: bool) -> bool {
        match self {
            AccessLevel::Open => true,
            AccessLevel::Public => context == DeclKind::Protocol || within_mocked_module,
            AccessLevel::Internal => within_mocked_module,
            AccessLevel::FilePrivate | AccessLevel::Private => false,
        }
    }
}

/// Scope of a member declaration.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TypeScope {
    #[default]
    Instance,
    Static,
    Class,
}

impl TypeScope {
    /// Static members can only be redeclared as overridable requirements in protocols.
    pub fn is_mockable_in(self, kind: DeclKind) -> bool {
        match self {
            TypeScope::Instance | TypeScope::Class => true,
            TypeScope::Static => kind == DeclKind::Protocol,
        }
    }
}

bitflags! {
    /// Declaration attributes relevant to resolution.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    pub struct Attributes: u32 {
        const FINAL = 1 << 0;
        const REQUIRED = 1 << 1;
        const CONVENIENCE = 1 << 2;
        const OVERRIDE = 1 << 3;
        const WEAK = 1 << 4;
        const THROWS = 1 << 5;
        const RETHROWS = 1 << 6;
        const ASYNC = 1 << 7;
        const FAILABLE = 1 << 8;
        const UNWRAPPED_FAILABLE = 1 << 9;
        const READONLY = 1 << 10;
        const CONSTANT = 1 << 11;
        const OPTIONAL = 1 << 12;
        /// Synthesized by the compiler for a protocol requirement (e.g. `init(from:)`).
        const IMPLICIT = 1 << 13;
    }
}

impl Attributes {
    /// Map a source keyword to its flag. Unknown keywords are ignored by callers.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        let flag = match keyword.trim().trim_start_matches('@') {
            "final" => Attributes::FINAL,
            "required" => Attributes::REQUIRED,
            "convenience" => Attributes::CONVENIENCE,
            "override" => Attributes::OVERRIDE,
            "weak" => Attributes::WEAK,
            "throws" => Attributes::THROWS,
            "rethrows" => Attributes::RETHROWS,
            "async" => Attributes::ASYNC,
            "failable" | "init?" => Attributes::FAILABLE,
            "unwrapped_failable" | "init!" => Attributes::UNWRAPPED_FAILABLE,
            "readonly" => Attributes::READONLY,
            "let" | "constant" => Attributes::CONSTANT,
            "optional" => Attributes::OPTIONAL,
            "implicit" => Attributes::IMPLICIT,
            _ => return None,
        };
        Some(flag)
    }

    pub fn from_keywords<'a>(keywords: impl IntoIterator<Item = &'a String>) -> Self {
        keywords
            .into_iter()
            .filter_map(|k| Attributes::from_keyword(k))
            .fold(Attributes::empty(), |acc, flag| acc | flag)
    }
}

// ============================================================================
// Parser Output (serde input)
// ============================================================================

fn default_true() -> bool {
    true
}

/// Whole-project input: every parsed file plus the declared module dependency graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectInput {
    /// Module name to the modules it directly depends on.
    #[serde(default)]
    pub module_dependencies: BTreeMap<String, BTreeSet<String>>,
    #[serde(default)]
    pub files: Vec<ParsedFile>,
}

/// One parsed source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedFile {
    pub path: String,
    pub module_name: String,
    /// Whether types in this file are mock targets (as opposed to supporting sources).
    #[serde(default = "default_true")]
    pub should_mock: bool,
    #[serde(default)]
    pub imported_modules: Vec<String>,
    #[serde(default)]
    pub declarations: Vec<DeclarationNode>,
}

/// A type-level declaration as produced by the parser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclarationNode {
    pub kind: DeclKind,
    pub name: String,
    #[serde(default)]
    pub access_level: AccessLevel,
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub generic_parameters: Vec<GenericParamDecl>,
    /// Raw inherited/conformed type text, e.g. `Box<String>`.
    #[serde(default)]
    pub inherited_types: Vec<String>,
    /// Raw generic `where` requirements, e.g. `Self: UIView`, `Element == Int`.
    #[serde(default)]
    pub where_clauses: Vec<String>,
    /// Alias target text for `typealias` declarations.
    #[serde(default)]
    pub aliased_type: Option<String>,
    #[serde(default)]
    pub methods: Vec<MethodDecl>,
    #[serde(default)]
    pub variables: Vec<VariableDecl>,
    #[serde(default)]
    pub contained_types: Vec<DeclarationNode>,
    #[serde(default)]
    pub line: Option<u32>,
}

/// A generic parameter or protocol associated type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericParamDecl {
    pub name: String,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub where_clauses: Vec<String>,
    #[serde(default)]
    pub associated_type: bool,
}

/// A method, initializer, or subscript-like member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDecl {
    /// Full selector-style name, e.g. `fetch(id:completion:)`, `init(name:)`.
    pub name: String,
    #[serde(default)]
    pub return_type: Option<String>,
    #[serde(default)]
    pub parameters: Vec<ParameterDecl>,
    #[serde(default)]
    pub scope: TypeScope,
    #[serde(default)]
    pub access_level: AccessLevel,
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub generic_parameters: Vec<GenericParamDecl>,
    #[serde(default)]
    pub where_clauses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDecl {
    #[serde(default)]
    pub label: Option<String>,
    pub name: String,
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableDecl {
    pub name: String,
    pub type_name: String,
    #[serde(default)]
    pub scope: TypeScope,
    #[serde(default)]
    pub access_level: AccessLevel,
    #[serde(default)]
    pub attributes: Vec<String>,
}

// ============================================================================
// Partial Declarations
// ============================================================================

/// File-level context shared by every partial declared in one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: String,
    pub module_name: String,
    pub should_mock: bool,
    pub imported_modules: Vec<String>,
}

impl SourceFile {
    pub fn from_parsed(file: &ParsedFile) -> Self {
        SourceFile {
            path: file.path.clone(),
            module_name: file.module_name.clone(),
            should_mock: file.should_mock,
            imported_modules: file.imported_modules.clone(),
        }
    }
}

/// One parsed occurrence of a type, immutable once built.
#[derive(Debug, Clone)]
pub struct PartialDeclaration {
    pub name: String,
    /// Dotted name within the module, including containing types.
    pub fully_qualified_name: String,
    pub containing_type_names: Vec<String>,
    /// Generic parameter names declared by this partial.
    pub generic_type_names: Vec<String>,
    /// Generic parameter names declared by each containing type, outermost first.
    pub generic_type_context: Vec<Vec<String>>,
    pub generic_parameters: Vec<GenericParamDecl>,
    pub inherited_type_names: Vec<String>,
    /// Gathered from `where Self: A & B` requirements.
    pub self_conformance_type_names: Vec<String>,
    /// Typealias targets, split on top-level `&`.
    pub aliased_type_names: Vec<String>,
    pub where_clauses: Vec<String>,
    pub defined_in_extension: bool,
    pub kind: DeclKind,
    pub access_level: AccessLevel,
    pub attributes: Attributes,
    pub methods: Vec<MethodDecl>,
    pub variables: Vec<VariableDecl>,
    pub contained: Vec<Arc<PartialDeclaration>>,
    pub file: Arc<SourceFile>,
    pub line: Option<u32>,
}

impl PartialDeclaration {
    /// Build a partial (and its nested partials) from a parser node.
    pub fn from_node(
        node: &DeclarationNode,
        file: &Arc<SourceFile>,
        containing_type_names: &[String],
        generic_type_context: &[Vec<String>],
        in_extension: bool,
    ) -> Arc<Self> {
        let mut fqn_parts: Vec<String> = containing_type_names.to_vec();
        fqn_parts.push(node.name.clone());
        let fully_qualified_name = fqn_parts.join(".");

        let generic_type_names: Vec<String> = node
            .generic_parameters
            .iter()
            .filter(|g| !g.associated_type)
            .map(|g| g.name.clone())
            .collect();

        let aliased_type_names = match (&node.kind, &node.aliased_type) {
            (DeclKind::TypeAlias, Some(target)) => split_top_level(target, '&')
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            _ => Vec::new(),
        };

        let self_conformance_type_names = self_conformances(&node.where_clauses);

        let mut child_context = generic_type_context.to_vec();
        child_context.push(generic_type_names.clone());
        let child_in_extension = in_extension || node.kind == DeclKind::Extension;
        let contained = node
            .contained_types
            .iter()
            .map(|child| {
                PartialDeclaration::from_node(
                    child,
                    file,
                    &fqn_parts,
                    &child_context,
                    child_in_extension,
                )
            })
            .collect();

        Arc::new(PartialDeclaration {
            name: node.name.clone(),
            fully_qualified_name,
            containing_type_names: containing_type_names.to_vec(),
            generic_type_names,
            generic_type_context: generic_type_context.to_vec(),
            generic_parameters: node.generic_parameters.clone(),
            inherited_type_names: node
                .inherited_types
                .iter()
                .map(|s| s.trim().to_string())
                .collect(),
            self_conformance_type_names,
            aliased_type_names,
            where_clauses: node.where_clauses.clone(),
            defined_in_extension: in_extension,
            kind: node.kind,
            access_level: node.access_level,
            attributes: Attributes::from_keywords(&node.attributes),
            methods: node.methods.clone(),
            variables: node.variables.clone(),
            contained,
            file: Arc::clone(file),
            line: node.line,
        })
    }

    pub fn module_name(&self) -> &str {
        &self.file.module_name
    }

    /// Store key: fully-qualified name without generic arguments.
    pub fn lookup_name(&self) -> String {
        strip_generics(&self.fully_qualified_name)
    }

    /// `Module.Outer.Name`, unique across the project.
    pub fn fully_qualified_module_name(&self) -> String {
        format!("{}.{}", self.file.module_name, self.lookup_name())
    }

    pub fn is_contained_type(&self) -> bool {
        !self.containing_type_names.is_empty()
    }

    pub fn location(&self) -> Location {
        Location::new(self.file.path.clone(), self.line.unwrap_or(0))
    }

    /// Visit this partial and every nested partial, depth first.
    pub fn walk(self: &Arc<Self>, out: &mut Vec<Arc<PartialDeclaration>>) {
        out.push(Arc::clone(self));
        for child in &self.contained {
            child.walk(out);
        }
    }
}

/// Names constrained by `Self: X & Y` requirements.
fn self_conformances(where_clauses: &[String]) -> Vec<String> {
    let mut names = Vec::new();
    for clause in where_clauses {
        let Some((lhs, rhs)) = clause.split_once(':') else {
            continue;
        };
        if lhs.trim() != "Self" || rhs.starts_with(':') {
            continue;
        }
        for name in split_top_level(rhs, '&') {
            let name = name.trim();
            if !name.is_empty() && !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
    }
    names
}

impl ParsedFile {
    /// Every partial declared in this file, nested partials included.
    pub fn partials(&self) -> Vec<Arc<PartialDeclaration>> {
        let source = Arc::new(SourceFile::from_parsed(self));
        let mut out = Vec::new();
        for node in &self.declarations {
            let partial = PartialDeclaration::from_node(node, &source, &[], &[], false);
            partial.walk(&mut out);
        }
        out
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn node(kind: DeclKind, name: &str) -> DeclarationNode {
        DeclarationNode {
            kind,
            name: name.to_string(),
            access_level: AccessLevel::Internal,
            attributes: vec![],
            generic_parameters: vec![],
            inherited_types: vec![],
            where_clauses: vec![],
            aliased_type: None,
            methods: vec![],
            variables: vec![],
            contained_types: vec![],
            line: None,
        }
    }

    fn file(declarations: Vec<DeclarationNode>) -> ParsedFile {
        ParsedFile {
            path: "Sources/App/Models.swift".to_string(),
            module_name: "App".to_string(),
            should_mock: true,
            imported_modules: vec![],
            declarations,
        }
    }

    mod partials {
        use super::*;

        #[test]
        fn nested_types_carry_scope() {
            let mut outer = node(DeclKind::Class, "Outer");
            outer.generic_parameters.push(GenericParamDecl {
                name: "T".to_string(),
                constraints: vec![],
                where_clauses: vec![],
                associated_type: false,
            });
            outer.contained_types.push(node(DeclKind::Protocol, "Inner"));

            let partials = file(vec![outer]).partials();
            assert_eq!(partials.len(), 2);
            let inner = &partials[1];
            assert_eq!(inner.fully_qualified_name, "Outer.Inner");
            assert_eq!(inner.containing_type_names, vec!["Outer"]);
            assert_eq!(inner.generic_type_context, vec![vec!["T".to_string()]]);
            assert_eq!(inner.module_name(), "App");
            assert_eq!(inner.fully_qualified_module_name(), "App.Outer.Inner");
            assert!(!inner.defined_in_extension);
        }

        #[test]
        fn types_nested_in_extensions_are_flagged() {
            let mut ext = node(DeclKind::Extension, "Outer");
            ext.contained_types.push(node(DeclKind::Class, "Inner"));
            let partials = file(vec![ext]).partials();
            assert!(!partials[0].defined_in_extension);
            assert!(partials[1].defined_in_extension);
        }

        #[test]
        fn alias_compositions_split_at_top_level() {
            let mut alias = node(DeclKind::TypeAlias, "Both");
            alias.aliased_type = Some("A & B<C & D>".to_string());
            let partials = file(vec![alias]).partials();
            assert_eq!(partials[0].aliased_type_names, vec!["A", "B<C & D>"]);
        }

        #[test]
        fn self_constraints_become_conformances() {
            let mut proto = node(DeclKind::Protocol, "Drawable");
            proto.where_clauses = vec![
                "Self: UIView & Themed".to_string(),
                "Element == Int".to_string(),
            ];
            let partials = file(vec![proto]).partials();
            assert_eq!(
                partials[0].self_conformance_type_names,
                vec!["UIView", "Themed"]
            );
        }

        #[test]
        fn attributes_parse_from_keywords() {
            let mut class = node(DeclKind::Class, "Sealed");
            class.attributes = vec!["final".to_string(), "@objc".to_string()];
            let partials = file(vec![class]).partials();
            assert_eq!(partials[0].attributes, Attributes::FINAL);
        }
    }

    mod access {
        use super::*;

        #[test]
        fn internal_types_require_mocked_module() {
            assert!(AccessLevel::Internal.is_mockable_type(true));
            assert!(!AccessLevel::Internal.is_mockable_type(false));
            assert!(AccessLevel::Public.is_mockable_type(false));
            assert!(!AccessLevel::Private.is_mockable_type(true));
        }

        #[test]
        fn public_members_of_external_classes_are_not_mockable() {
            assert!(!AccessLevel::Public.is_mockable_member(DeclKind::Class, false));
            assert!(AccessLevel::Public.is_mockable_member(DeclKind::Protocol, false));
            assert!(AccessLevel::Open.is_mockable_member(DeclKind::Class, false));
        }

        #[test]
        fn static_scope_only_in_protocols() {
            assert!(TypeScope::Static.is_mockable_in(DeclKind::Protocol));
            assert!(!TypeScope::Static.is_mockable_in(DeclKind::Class));
            assert!(TypeScope::Class.is_mockable_in(DeclKind::Class));
        }
    }

    mod serde_input {
        use super::*;

        #[test]
        fn minimal_project_deserializes_with_defaults() {
            let json = r#"{
                "files": [{
                    "path": "a.swift",
                    "module_name": "App",
                    "declarations": [{"kind": "typealias", "name": "Id", "aliased_type": "String"}]
                }]
            }"#;
            let input: ProjectInput = serde_json::from_str(json).unwrap();
            assert!(input.module_dependencies.is_empty());
            let file = &input.files[0];
            assert!(file.should_mock);
            assert_eq!(file.declarations[0].kind, DeclKind::TypeAlias);
            assert_eq!(file.declarations[0].access_level, AccessLevel::Internal);
        }
    }
}
