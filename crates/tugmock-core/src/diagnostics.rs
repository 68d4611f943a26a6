//! Resolution diagnostics.
//!
//! Resolution never fails on unresolved input; it records a [`Diagnostic`] and carries on.
//! Every diagnostic is mirrored to `tracing` when it is recorded so that `--log-level` shows
//! problems as they happen, and the full list is returned with the resolved graph.

use std::fmt;

use serde::Serialize;

use crate::types::Location;

/// Stable diagnostic codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticCode {
    /// An inherited, conformed or self-constraint name matched no declaration.
    UnresolvedReference,
    /// An alias target matched no declaration.
    UnresolvedAlias,
    /// A module name collides with a declared type name.
    ModuleShadowing,
    /// A root type was dropped from the output.
    UnmockableRoot,
    /// A type reaches itself through its own ancestors.
    CyclicInheritance,
    /// A type nested in an extension whose extended type is unknown.
    UndefinedContainingType,
}

impl DiagnosticCode {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticCode::UnresolvedReference => "unresolved-reference",
            DiagnosticCode::UnresolvedAlias => "unresolved-alias",
            DiagnosticCode::ModuleShadowing => "module-shadowing",
            DiagnosticCode::UnmockableRoot => "unmockable-root",
            DiagnosticCode::CyclicInheritance => "cyclic-inheritance",
            DiagnosticCode::UndefinedContainingType => "undefined-containing-type",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Only interesting at verbose log levels.
    Debug,
    Warning,
}

/// A single non-fatal finding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    pub message: String,
    /// The type being resolved when the finding was made.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl Diagnostic {
    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Diagnostic {
            code,
            severity: Severity::Warning,
            message: message.into(),
            type_name: None,
            location: None,
        }
    }

    pub fn debug(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Debug,
            ..Diagnostic::warning(code, message)
        }
    }

    pub fn for_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Mirror this diagnostic to the tracing subscriber.
    pub fn log(&self) {
        let location = self
            .location
            .as_ref()
            .map(|l| l.to_string())
            .unwrap_or_default();
        match self.severity {
            Severity::Warning => {
                tracing::warn!(code = %self.code, %location, "{}", self.message)
            }
            Severity::Debug => {
                tracing::debug!(code = %self.code, %location, "{}", self.message)
            }
        }
    }
}
