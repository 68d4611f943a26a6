//! Common types shared across tugmock crates.

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Location Type
// ============================================================================

/// Location of a declaration in a source file.
///
/// - `file`: path as reported by the parser (required)
/// - `line`: 1-indexed line number, `0` when unknown (required)
/// - `col`: 1-indexed column (optional)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location {
    /// File path.
    pub file: String,
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub col: Option<u32>,
}

impl Location {
    /// Create a new location without a column.
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Location {
            file: file.into(),
            line,
            col: None,
        }
    }

    /// Create a location with a column.
    pub fn with_col(file: impl Into<String>, line: u32, col: u32) -> Self {
        Location {
            file: file.into(),
            line,
            col: Some(col),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.col {
            Some(col) => write!(f, "{}:{}:{}", self.file, self.line, col),
            None => write!(f, "{}:{}", self.file, self.line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_column_when_known() {
        assert_eq!(Location::new("a.swift", 3).to_string(), "a.swift:3");
        assert_eq!(Location::with_col("a.swift", 3, 7).to_string(), "a.swift:3:7");
    }

    #[test]
    fn column_is_omitted_from_json_when_absent() {
        let json = serde_json::to_string(&Location::new("a.swift", 3)).unwrap();
        assert_eq!(json, r#"{"file":"a.swift","line":3}"#);
    }
}
