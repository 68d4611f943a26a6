//! Engine options.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A mockable substitute for a well-known unmockable ancestor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemapTarget {
    pub module_name: String,
    pub type_name: String,
}

/// Knobs that change resolution semantics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveOptions {
    /// Retry failed ancestor lookups against the referencing module's declared dependencies.
    pub relaxed_linking: bool,
    /// Protocol ancestors (by `Module.Name`) replaced with a mockable substitute.
    pub inheritance_remap: BTreeMap<String, RemapTarget>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        let mut inheritance_remap = BTreeMap::new();
        inheritance_remap.insert(
            "Foundation.NSObjectProtocol".to_string(),
            RemapTarget {
                module_name: "Foundation".to_string(),
                type_name: "NSObject".to_string(),
            },
        );
        ResolveOptions {
            relaxed_linking: true,
            inheritance_remap,
        }
    }
}
