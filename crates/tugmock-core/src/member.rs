//! Resolved member model.
//!
//! Members of a resolved type carry fully-qualified type text. Each member remembers where it
//! was declared ([`MemberOrigin`]) so that when it is inherited through a specialized generic
//! ancestor its type text can be re-qualified from the declaring scope.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::decl::{AccessLevel, Attributes, TypeScope};

/// Token substituted for a bare `Self` reference.
pub const SELF_TOKEN: &str = "#Self#";
/// Marks text that depends on `Self` once tokenized.
pub const SELF_TOKEN_INDICATOR: char = '#';
/// Generator-created `Self` reference; does not affect generics.
pub const SYNTHETIC_SELF_TOKEN: &str = "%Self%";

/// Whether qualified type text depends on the conforming type.
pub fn mentions_self(text: &str) -> bool {
    text.contains(SELF_TOKEN_INDICATOR)
}

/// Declaring scope of a member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MemberOrigin {
    pub module_name: String,
    /// Containing types of the declaration site, ending with the declaring type itself.
    pub containing_type_names: Vec<String>,
    /// Generic parameter names per nesting level, ending with the declaring type's own.
    pub generic_type_context: Vec<Vec<String>>,
}

// ============================================================================
// Where Clauses and Generics
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    Conforms,
    Equals,
}

/// A generic requirement: `Element: Equatable` or `Key == String`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct WhereClause {
    pub constrained_type_name: String,
    pub generic_constraint: String,
    pub requirement: Requirement,
    pub has_self_constraint: bool,
}

impl WhereClause {
    /// Parse raw requirement text. Same-type requirements are normalized by sorting their sides.
    pub fn parse(text: &str) -> Option<WhereClause> {
        let (requirement, lhs, rhs) = if let Some((lhs, rhs)) = text.split_once("==") {
            (Requirement::Equals, lhs, rhs)
        } else if let Some((lhs, rhs)) = text.split_once(':') {
            (Requirement::Conforms, lhs, rhs)
        } else {
            return None;
        };
        let (lhs, rhs) = (lhs.trim(), rhs.trim());
        if lhs.is_empty() || rhs.is_empty() {
            return None;
        }
        Some(WhereClause::new(lhs, rhs, requirement))
    }

    pub fn new(constrained: &str, constraint: &str, requirement: Requirement) -> WhereClause {
        let mut sides = [constrained.to_string(), constraint.to_string()];
        if requirement == Requirement::Equals {
            sides.sort();
        }
        let [constrained_type_name, generic_constraint] = sides;
        let has_self_constraint =
            mentions_self(&constrained_type_name) || mentions_self(&generic_constraint);
        WhereClause {
            constrained_type_name,
            generic_constraint,
            requirement,
            has_self_constraint,
        }
    }
}

impl fmt::Display for WhereClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.requirement {
            Requirement::Conforms => {
                write!(f, "{}: {}", self.constrained_type_name, self.generic_constraint)
            }
            Requirement::Equals => {
                write!(f, "{} == {}", self.constrained_type_name, self.generic_constraint)
            }
        }
    }
}

/// A generic parameter or associated type with its qualified constraints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct GenericType {
    pub name: String,
    pub constraints: BTreeSet<String>,
    pub where_clauses: Vec<WhereClause>,
    pub has_self_constraint: bool,
}

// ============================================================================
// Methods and Variables
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MethodParameter {
    pub label: Option<String>,
    pub name: String,
    pub type_name: String,
    pub has_self_constraint: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Method {
    pub name: String,
    pub short_name: String,
    pub return_type_name: String,
    pub parameters: Vec<MethodParameter>,
    pub scope: TypeScope,
    pub access_level: AccessLevel,
    pub attributes: Attributes,
    pub generic_types: Vec<GenericType>,
    pub where_clauses: Vec<WhereClause>,
    pub is_initializer: bool,
    pub is_designated_initializer: bool,
    pub is_mockable: bool,
    pub has_self_constraint: bool,
    #[serde(skip)]
    pub origin: MemberOrigin,
}

/// Identity used to collapse the same member reached through several ancestors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberKey {
    pub name: String,
    pub type_name: String,
    pub scope: TypeScope,
    pub parameters: Vec<(Option<String>, String)>,
    pub unwrapped_failable: bool,
}

impl Method {
    pub fn key(&self) -> MemberKey {
        MemberKey {
            name: self.name.clone(),
            type_name: self.return_type_name.clone(),
            scope: self.scope,
            parameters: self
                .parameters
                .iter()
                .map(|p| (p.label.clone(), p.type_name.clone()))
                .collect(),
            unwrapped_failable: self.attributes.contains(Attributes::UNWRAPPED_FAILABLE),
        }
    }

    pub fn is_implicit(&self) -> bool {
        self.attributes.contains(Attributes::IMPLICIT)
    }

    /// Stable ordering key for output.
    pub fn sort_key(&self) -> (String, String, String) {
        let params: Vec<&str> = self.parameters.iter().map(|p| p.type_name.as_str()).collect();
        (
            self.name.clone(),
            params.join(","),
            self.return_type_name.clone(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variable {
    pub name: String,
    pub type_name: String,
    pub scope: TypeScope,
    pub access_level: AccessLevel,
    pub attributes: Attributes,
    pub is_mockable: bool,
    pub has_self_constraint: bool,
    #[serde(skip)]
    pub origin: MemberOrigin,
}

impl Variable {
    pub fn key(&self) -> MemberKey {
        MemberKey {
            name: self.name.clone(),
            type_name: self.type_name.clone(),
            scope: self.scope,
            parameters: Vec::new(),
            unwrapped_failable: false,
        }
    }

    pub fn is_implicit(&self) -> bool {
        self.attributes.contains(Attributes::IMPLICIT)
    }
}

/// `fetch(id:completion:)` becomes `fetch`.
pub fn short_name(name: &str) -> &str {
    match name.find('(') {
        Some(index) => name[..index].trim(),
        None => name.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn where_clause_parses_conformance() {
        let clause = WhereClause::parse("Element: Equatable").unwrap();
        assert_eq!(clause.requirement, Requirement::Conforms);
        assert_eq!(clause.constrained_type_name, "Element");
        assert_eq!(clause.generic_constraint, "Equatable");
        assert_eq!(clause.to_string(), "Element: Equatable");
    }

    #[test]
    fn same_type_requirements_are_commutative() {
        let a = WhereClause::parse("Key == String").unwrap();
        let b = WhereClause::parse("String == Key").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "Key == String");
    }

    #[test]
    fn self_token_marks_self_constraint() {
        let clause = WhereClause::new("Element", SELF_TOKEN, Requirement::Equals);
        assert!(clause.has_self_constraint);
        assert!(!WhereClause::parse("T: Hashable").unwrap().has_self_constraint);
    }

    #[test]
    fn short_names_drop_labels() {
        assert_eq!(short_name("fetch(id:completion:)"), "fetch");
        assert_eq!(short_name("count"), "count");
    }
}
