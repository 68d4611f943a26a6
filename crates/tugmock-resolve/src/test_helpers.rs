//! Builders for declaration input used by unit and integration tests.
//!
//! Declaration nodes are plain data, so tests build them with small constructors and then
//! adjust fields directly or through the `with_*` helpers.

use tugmock_core::decl::{
    AccessLevel, DeclKind, DeclarationNode, GenericParamDecl, MethodDecl, ParameterDecl,
    ParsedFile, ProjectInput, TypeScope, VariableDecl,
};

use crate::context::ResolutionContext;
use crate::options::ResolveOptions;
use crate::store::PartialStore;

pub fn decl(kind: DeclKind, name: &str) -> DeclarationNode {
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
        line: Some(1),
    }
}

pub fn class(name: &str) -> DeclarationNode {
    decl(DeclKind::Class, name)
}

pub fn protocol(name: &str) -> DeclarationNode {
    decl(DeclKind::Protocol, name)
}

pub fn structure(name: &str) -> DeclarationNode {
    decl(DeclKind::Struct, name)
}

pub fn extension(name: &str) -> DeclarationNode {
    decl(DeclKind::Extension, name)
}

pub fn typealias(name: &str, target: &str) -> DeclarationNode {
    let mut node = decl(DeclKind::TypeAlias, name);
    node.aliased_type = Some(target.to_string());
    node
}

pub fn method(name: &str) -> MethodDecl {
    MethodDecl {
        name: name.to_string(),
        return_type: None,
        parameters: vec![],
        scope: TypeScope::Instance,
        access_level: AccessLevel::Internal,
        attributes: vec![],
        generic_parameters: vec![],
        where_clauses: vec![],
    }
}

/// A method whose parameters are `(label, type)` pairs; the parameter name repeats the label.
pub fn method_with(name: &str, params: &[(&str, &str)], returns: Option<&str>) -> MethodDecl {
    let mut m = method(name);
    m.parameters = params
        .iter()
        .map(|(label, ty)| ParameterDecl {
            label: Some(label.to_string()),
            name: label.to_string(),
            type_name: ty.to_string(),
        })
        .collect();
    m.return_type = returns.map(str::to_string);
    m
}

pub fn variable(name: &str, type_name: &str) -> VariableDecl {
    VariableDecl {
        name: name.to_string(),
        type_name: type_name.to_string(),
        scope: TypeScope::Instance,
        access_level: AccessLevel::Internal,
        attributes: vec![],
    }
}

pub fn generic(name: &str) -> GenericParamDecl {
    GenericParamDecl {
        name: name.to_string(),
        constraints: vec![],
        where_clauses: vec![],
        associated_type: false,
    }
}

pub fn file(module: &str, path: &str, declarations: Vec<DeclarationNode>) -> ParsedFile {
    ParsedFile {
        path: path.to_string(),
        module_name: module.to_string(),
        should_mock: true,
        imported_modules: vec![],
        declarations,
    }
}

/// A file from a module that is referenced but not mocked.
pub fn support_file(module: &str, path: &str, declarations: Vec<DeclarationNode>) -> ParsedFile {
    ParsedFile {
        should_mock: false,
        ..file(module, path, declarations)
    }
}

pub fn project(files: Vec<ParsedFile>) -> ProjectInput {
    ProjectInput {
        module_dependencies: Default::default(),
        files,
    }
}

pub fn project_store(files: Vec<ParsedFile>) -> PartialStore {
    let mut store = PartialStore::new();
    for parsed in &files {
        for partial in parsed.partials() {
            store.add_partial(partial);
        }
    }
    store
}

pub fn project_context(files: Vec<ParsedFile>) -> ResolutionContext {
    ResolutionContext::from_project(&project(files), ResolveOptions::default())
}

// ============================================================================
// Node Adjusters
// ============================================================================

pub trait DeclarationExt: Sized {
    fn inheriting(self, names: &[&str]) -> Self;
    fn with_methods(self, methods: Vec<MethodDecl>) -> Self;
    fn with_variables(self, variables: Vec<VariableDecl>) -> Self;
    fn with_generics(self, names: &[&str]) -> Self;
    fn with_access(self, access: AccessLevel) -> Self;
    fn with_attributes(self, attributes: &[&str]) -> Self;
    fn containing(self, children: Vec<DeclarationNode>) -> Self;
}

impl DeclarationExt for DeclarationNode {
    fn inheriting(mut self, names: &[&str]) -> Self {
        self.inherited_types = names.iter().map(|n| n.to_string()).collect();
        self
    }

    fn with_methods(mut self, methods: Vec<MethodDecl>) -> Self {
        self.methods = methods;
        self
    }

    fn with_variables(mut self, variables: Vec<VariableDecl>) -> Self {
        self.variables = variables;
        self
    }

    fn with_generics(mut self, names: &[&str]) -> Self {
        self.generic_parameters = names.iter().map(|n| generic(n)).collect();
        self
    }

    fn with_access(mut self, access: AccessLevel) -> Self {
        self.access_level = access;
        self
    }

    fn with_attributes(mut self, attributes: &[&str]) -> Self {
        self.attributes = attributes.iter().map(|a| a.to_string()).collect();
        self
    }

    fn containing(mut self, children: Vec<DeclarationNode>) -> Self {
        self.contained_types = children;
        self
    }
}
