//! CLI front door.
//!
//! The functions here do the work behind each `tugmock` subcommand and return a serializable
//! response body; `main.rs` only parses flags, sets up logging and prints. Keeping the commands
//! in the library lets tests drive them without spawning the binary.
//!
//! All functions return `Result<T, MockError>` so failures map to stable exit codes.

use std::fs;
use std::path::Path;

use serde::Serialize;
use tugmock_core::decl::ProjectInput;
use tugmock_core::diagnostics::Diagnostic;
use tugmock_core::error::MockError;
use tugmock_resolve::{resolve_project, ResolutionSummary, ResolvedGraph, ResolvedType};

use crate::config::ResolveConfig;

// ============================================================================
// Response Bodies
// ============================================================================

/// Body of `tugmock inspect`: one resolved type and the diagnostics that name it.
#[derive(Debug, Clone, Serialize)]
pub struct InspectBody {
    #[serde(rename = "type")]
    pub resolved: ResolvedType,
    pub is_root: bool,
    pub diagnostics: Vec<Diagnostic>,
    pub summary: ResolutionSummary,
}

// ============================================================================
// Input
// ============================================================================

/// Read and decode a parser-output JSON file.
pub fn load_project(path: &Path) -> Result<ProjectInput, MockError> {
    let path_text = path.display().to_string();
    if !path.exists() {
        return Err(MockError::file_not_found(path_text));
    }
    let content =
        fs::read_to_string(path).map_err(|e| MockError::invalid_input(&path_text, e.to_string()))?;
    let input: ProjectInput = serde_json::from_str(&content)
        .map_err(|e| MockError::invalid_input(&path_text, e.to_string()))?;
    tracing::debug!(
        path = %path_text,
        files = input.files.len(),
        modules = input.module_dependencies.len(),
        "loaded project input"
    );
    Ok(input)
}

// ============================================================================
// Commands
// ============================================================================

/// Resolve every root type in the project at `input`.
pub fn run_resolve(input: &Path, config: &ResolveConfig) -> Result<ResolvedGraph, MockError> {
    let project = load_project(input)?;
    Ok(resolve_project(&project, config.resolve_options(), config.jobs)?)
}

/// Resolve the project and return the single type named `type_name`.
///
/// The name may be bare (`Child`), module-local (`Outer.Inner`) or canonical (`App.Child`).
pub fn run_inspect(
    input: &Path,
    type_name: &str,
    config: &ResolveConfig,
) -> Result<InspectBody, MockError> {
    let graph = run_resolve(input, config)?;
    let resolved = graph
        .find(type_name)
        .cloned()
        .ok_or_else(|| MockError::type_not_found(type_name))?;
    let diagnostics = graph
        .diagnostics
        .iter()
        .filter(|d| d.type_name.as_deref() == Some(resolved.key.as_str()))
        .cloned()
        .collect();
    Ok(InspectBody {
        is_root: graph.roots.contains(&resolved.key),
        resolved,
        diagnostics,
        summary: graph.summary,
    })
}
