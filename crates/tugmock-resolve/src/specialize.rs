//! Generic specialization contexts.
//!
//! When a type inherits from a generic ancestor with concrete arguments (`class IntBox:
//! Box<Int>`), members inherited from the ancestor must be rewritten in terms of those
//! arguments. A [`SpecializationContext`] records the mapping from the ancestor's generic
//! parameter names to the supplied argument types.

use std::collections::BTreeMap;

use tugmock_core::decl::PartialDeclaration;
use tugmock_core::typeref::TypeRef;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecializationContext {
    /// Generic parameter name -> supplied argument.
    pub specializations: BTreeMap<String, TypeRef>,
    /// Supplied arguments in declaration order.
    pub type_list: Vec<TypeRef>,
}

impl SpecializationContext {
    /// Pair `ancestor`'s generic parameters with the arguments in `reference`.
    ///
    /// Returns `None` when the reference supplies no arguments or the ancestor declares no
    /// generic parameters. Extra arguments on either side are ignored.
    pub fn new(reference: &str, ancestor: &PartialDeclaration) -> Option<Self> {
        if ancestor.generic_type_names.is_empty() {
            return None;
        }
        let parsed = TypeRef::try_parse(reference)?;
        let args = parsed.generic_args();
        if args.is_empty() {
            return None;
        }
        let specializations = ancestor
            .generic_type_names
            .iter()
            .cloned()
            .zip(args.iter().cloned())
            .collect();
        Some(SpecializationContext {
            specializations,
            type_list: args.to_vec(),
        })
    }

    pub fn get(&self, generic_name: &str) -> Option<&TypeRef> {
        self.specializations.get(generic_name)
    }
}
