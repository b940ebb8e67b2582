use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf};

/// Well-known diagnostic codes the orchestrator emits itself.
pub mod codes {
    /// "File '{0}' not found."
    pub const FILE_NOT_FOUND: u32 = 6053;
    /// "Project references may not form a circular graph. Cycle detected: {0}"
    pub const PROJECT_REFERENCE_CYCLE: u32 = 6202;
    /// "Cannot read file '{0}'."
    pub const CANNOT_READ_FILE: u32 = 5012;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiagnosticCategory {
    #[default]
    Error,
    Warning,
    Message,
}

/// A single diagnostic produced by the compiler front end or the
/// orchestrator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub category: DiagnosticCategory,
    pub code: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    pub message: String,
}

impl Diagnostic {
    pub fn error(code: u32, message: impl Into<String>) -> Self {
        Self { category: DiagnosticCategory::Error, code, file: None, message: message.into() }
    }

    pub fn error_at(file: impl Into<PathBuf>, code: u32, message: impl Into<String>) -> Self {
        Self {
            category: DiagnosticCategory::Error,
            code,
            file: Some(file.into()),
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.category == DiagnosticCategory::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(file) = &self.file {
            write!(f, "{}: ", file.display())?;
        }
        let label = match self.category {
            DiagnosticCategory::Error => "error",
            DiagnosticCategory::Warning => "warning",
            DiagnosticCategory::Message => "message",
        };
        write!(f, "{label} TS{}: {}", self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_like_the_compiler() {
        let plain = Diagnostic::error(codes::PROJECT_REFERENCE_CYCLE, "cycle detected");
        assert_eq!(plain.to_string(), "error TS6202: cycle detected");

        let with_file = Diagnostic::error_at("/proj/a.ts", codes::FILE_NOT_FOUND, "not found");
        assert_eq!(with_file.to_string(), "/proj/a.ts: error TS6053: not found");
    }
}
