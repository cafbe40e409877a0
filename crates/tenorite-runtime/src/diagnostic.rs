//! Diagnostics for scan, parse, and compile errors
//!
//! All compile-time failures flow through the unified Diagnostic type,
//! ensuring consistent formatting across the scanner, parser, and compiler.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity level of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    /// Fatal error that prevents compilation
    Error,
    /// Warning that doesn't prevent compilation
    Warning,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticLevel::Error => write!(f, "error"),
            DiagnosticLevel::Warning => write!(f, "warning"),
        }
    }
}

/// A diagnostic message (error or warning)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity level
    pub level: DiagnosticLevel,
    /// Main diagnostic message
    pub message: String,
    /// Line number (1-based)
    pub line: u32,
    /// Offending lexeme, if known
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub lexeme: String,
}

impl Diagnostic {
    /// Create a new error diagnostic
    pub fn error(message: impl Into<String>, line: u32) -> Self {
        Self {
            level: DiagnosticLevel::Error,
            message: message.into(),
            line,
            lexeme: String::new(),
        }
    }

    /// Create a new warning diagnostic
    pub fn warning(message: impl Into<String>, line: u32) -> Self {
        Self {
            level: DiagnosticLevel::Warning,
            message: message.into(),
            line,
            lexeme: String::new(),
        }
    }

    /// Attach the offending lexeme
    pub fn with_lexeme(mut self, lexeme: impl Into<String>) -> Self {
        self.lexeme = lexeme.into();
        self
    }

    /// Format as human-readable string
    ///
    /// `line 3: at `foo´: No such name foo`
    pub fn to_human_string(&self) -> String {
        if self.lexeme.is_empty() {
            format!("line {}: {}: {}", self.line, self.level, self.message)
        } else {
            format!(
                "line {}: {}: at `{}´: {}",
                self.line, self.level, self.lexeme, self.message
            )
        }
    }

    /// Format as compact JSON string
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_human_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_format() {
        let diag = Diagnostic::error("No such name foo", 3).with_lexeme("foo");
        assert_eq!(diag.to_human_string(), "line 3: error: at `foo´: No such name foo");
    }

    #[test]
    fn test_human_format_without_lexeme() {
        let diag = Diagnostic::error("Unterminated string.", 7);
        assert_eq!(diag.to_human_string(), "line 7: error: Unterminated string.");
    }

    #[test]
    fn test_json_roundtrip() {
        let diag = Diagnostic::error("Unexpected character.", 1).with_lexeme("$");
        let json = diag.to_json_string().unwrap();
        let back: Diagnostic = serde_json::from_str(&json).unwrap();
        assert_eq!(back, diag);
    }
}
