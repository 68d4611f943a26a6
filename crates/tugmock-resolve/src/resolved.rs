//! Resolved types: one flattened view per mockable declaration.
//!
//! A [`ResolvedType`] merges every partial of a type and everything inherited from its
//! ancestors into a single member list. Ancestors and nested types are referenced by key
//! (`Module.Outer.Name`), so the resolved graph is a flat map and shared ancestors appear once.

use std::collections::BTreeSet;

use serde::Serialize;
use tugmock_core::decl::{AccessLevel, Attributes, DeclKind};
use tugmock_core::member::{GenericType, Method, Variable, WhereClause};
use tugmock_core::types::Location;

/// Whether a cached entry has had its nested types attached yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Completion {
    /// Members and ancestors are final; nested types are still being resolved.
    Preliminary,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedType {
    pub name: String,
    pub module_name: String,
    pub fully_qualified_name: String,
    /// Qualified spelling usable from generated code (shadowed module prefixes dropped).
    pub fully_qualified_module_name: String,
    /// `Module.Outer.Name`, unique across the project.
    pub key: String,
    pub kind: DeclKind,
    pub access_level: AccessLevel,
    pub attributes: Attributes,

    pub methods: Vec<Method>,
    pub variables: Vec<Variable>,

    /// Keys of the direct ancestors members were inherited from.
    pub inherited_types: Vec<String>,
    /// Transitive ancestor names, specialized where arguments were supplied, in discovery order.
    pub all_inherited_type_names: Vec<String>,
    /// Ancestor names that matched no declaration.
    pub opaque_inherited_type_names: BTreeSet<String>,
    /// Keys of types a conforming type must be (protocols only).
    pub self_conformance_types: Vec<String>,
    pub all_self_conformance_type_names: Vec<String>,
    /// Key of the class a conforming type must subclass, if any.
    pub primary_self_conformance_type: Option<String>,
    pub primary_self_conformance_type_name: Option<String>,

    pub generic_type_context: Vec<Vec<String>>,
    pub generic_types: Vec<GenericType>,
    pub where_clauses: Vec<WhereClause>,
    /// Keys of nested resolved types.
    pub contained_types: Vec<String>,

    pub should_mock: bool,
    pub is_contained_type: bool,
    pub is_in_generic_containing_type: bool,
    pub subclasses_external_type: bool,
    pub has_opaque_inherited_type: bool,
    pub has_self_constraint: bool,
    pub completion: Completion,
    pub location: Location,
}

impl ResolvedType {
    pub fn is_complete(&self) -> bool {
        self.completion == Completion::Complete
    }

    /// A class that subclasses across a module boundary can only be mocked through an
    /// accessible initializer.
    pub fn has_accessible_initializer(&self) -> bool {
        self.methods.iter().any(|m| m.is_initializer && m.is_mockable)
    }

    /// Whether any designated initializer is declared or inherited.
    pub fn declares_designated_initializer(&self) -> bool {
        self.methods.iter().any(|m| m.is_designated_initializer)
    }

    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }
}
