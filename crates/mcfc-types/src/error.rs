//! Generation diagnostics: codes, categories and the collecting sink.

use crate::Site;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors kept in full; later ones only bump the count.
pub const MAX_ERRORS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Diagnostic family; the hundreds digit of the code selects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// Misplaced constructs: `elif` without a branch, `break` outside a loop.
    Syntax,
    /// Kind mismatches between values, operands or return types.
    Type,
    /// Bad literal values, argument counts, loop steps.
    Value,
    /// References to identities that are not live in the current frame.
    Name,
    /// Unknown components or library procedures.
    Component,
    /// Features not available for the targeted game version.
    Version,
}

/// `E<n>` diagnostic code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    // ── E1xx: construct placement ──
    pub const ELIF_WITHOUT_BRANCH: Self = Self(100);
    pub const ELSE_WITHOUT_BRANCH: Self = Self(101);
    pub const BREAK_OUTSIDE_LOOP: Self = Self(102);
    pub const CONTINUE_OUTSIDE_LOOP: Self = Self(103);
    pub const RETURN_OUTSIDE_FUNCTION: Self = Self(104);
    pub const REDECLARATION: Self = Self(105);
    pub const NESTED_FIELD_ACCESS: Self = Self(106);

    // ── E2xx: kinds ──
    pub const TYPE_MISMATCH: Self = Self(200);
    pub const RETURN_TYPE_MISMATCH: Self = Self(201);
    pub const NOT_A_CONDITION: Self = Self(202);
    pub const UNSUPPORTED_OPERATION: Self = Self(203);

    // ── E3xx: values and arguments ──
    pub const WRONG_ARG_COUNT: Self = Self(300);
    pub const INVALID_LITERAL: Self = Self(301);
    pub const ZERO_STEP: Self = Self(302);
    pub const INVALID_NAME: Self = Self(303);

    // ── E4xx: identities ──
    pub const UNKNOWN_IDENTITY: Self = Self(400);
    pub const UNKNOWN_FIELD: Self = Self(401);

    // ── E5xx: library components ──
    pub const UNKNOWN_COMPONENT: Self = Self(500);
    pub const UNKNOWN_PROCEDURE: Self = Self(501);

    // ── E6xx: game version ──
    pub const UNSUPPORTED_SELECTOR: Self = Self(600);
    pub const UNSUPPORTED_VERSION: Self = Self(601);

    pub fn category(self) -> ErrorCategory {
        match self.0 {
            100..=199 => ErrorCategory::Syntax,
            200..=299 => ErrorCategory::Type,
            300..=399 => ErrorCategory::Value,
            400..=499 => ErrorCategory::Name,
            500..=599 => ErrorCategory::Component,
            600..=699 => ErrorCategory::Version,
            _ => ErrorCategory::Syntax,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// A structured compile diagnostic.
///
/// Diagnostics never stop generation on their own: the builder records them
/// here and keeps lowering with placeholder values so that one run reports
/// as many problems as possible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McfError {
    pub code: ErrorCode,
    pub severity: Severity,
    /// Always `code.category()`.
    pub category: ErrorCategory,
    pub message: String,
    /// Where in the driving program the offending construct was built.
    pub site: Site,
    /// What to change, when there is an obvious fix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl McfError {
    pub fn new(code: ErrorCode, message: impl Into<String>, site: Site) -> Self {
        Self {
            code,
            severity: Severity::Error,
            category: code.category(),
            message: message.into(),
            site,
            suggestion: None,
        }
    }

    /// Same as [`McfError::new`] but non-fatal.
    pub fn warning(code: ErrorCode, message: impl Into<String>, site: Site) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::new(code, message, site)
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl fmt::Display for McfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} [{}] {}",
            self.site, self.code, self.category, self.message
        )?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, " (help: {suggestion})")?;
        }
        Ok(())
    }
}

impl std::error::Error for McfError {}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax => write!(f, "syntax"),
            Self::Type => write!(f, "type"),
            Self::Value => write!(f, "value"),
            Self::Name => write!(f, "name"),
            Self::Component => write!(f, "component"),
            Self::Version => write!(f, "version"),
        }
    }
}

/// Collected diagnostics of one compilation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompileErrors {
    pub errors: Vec<McfError>,
    pub warnings: Vec<McfError>,
    pub total_errors: usize,
    pub total_warnings: usize,
}

impl CompileErrors {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether `finish` must fail.
    pub fn has_errors(&self) -> bool {
        self.total_errors > 0
    }

    /// Record an error; past [`MAX_ERRORS`] only the total grows.
    pub fn push_error(&mut self, error: McfError) {
        if self.errors.len() < MAX_ERRORS {
            self.errors.push(error);
        }
        self.total_errors += 1;
    }

    pub fn push_warning(&mut self, warning: McfError) {
        self.warnings.push(warning);
        self.total_warnings += 1;
    }

    /// Route a diagnostic by its severity.
    pub fn push(&mut self, diagnostic: McfError) {
        match diagnostic.severity {
            Severity::Error => self.push_error(diagnostic),
            Severity::Warning => self.push_warning(diagnostic),
        }
    }

    /// Serialize to the structured JSON report.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

impl fmt::Display for CompileErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for error in &self.errors {
            writeln!(f, "{error}")?;
        }
        if self.total_errors > self.errors.len() {
            writeln!(
                f,
                "... and {} more errors",
                self.total_errors - self.errors.len()
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_category() {
        assert_eq!(
            ErrorCode::ELIF_WITHOUT_BRANCH.category(),
            ErrorCategory::Syntax
        );
        assert_eq!(ErrorCode::TYPE_MISMATCH.category(), ErrorCategory::Type);
        assert_eq!(ErrorCode::ZERO_STEP.category(), ErrorCategory::Value);
        assert_eq!(ErrorCode::UNKNOWN_IDENTITY.category(), ErrorCategory::Name);
        assert_eq!(
            ErrorCode::UNKNOWN_COMPONENT.category(),
            ErrorCategory::Component
        );
        assert_eq!(
            ErrorCode::UNSUPPORTED_SELECTOR.category(),
            ErrorCategory::Version
        );
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(format!("{}", ErrorCode::TYPE_MISMATCH), "E200");
        assert_eq!(format!("{}", ErrorCode::BREAK_OUTSIDE_LOOP), "E102");
    }

    #[test]
    fn test_error_display_includes_site_and_suggestion() {
        let err = McfError::new(
            ErrorCode::BREAK_OUTSIDE_LOOP,
            "'break' outside of a loop",
            Site::new("main.rs", 4, 9),
        )
        .with_suggestion("move the statement into a loop body");
        assert_eq!(
            err.to_string(),
            "main.rs:4:9: E102 [syntax] 'break' outside of a loop (help: move the statement into a loop body)"
        );
    }

    #[test]
    fn test_max_errors_limit() {
        let mut errors = CompileErrors::empty();
        for i in 0..25 {
            errors.push_error(McfError::new(
                ErrorCode::TYPE_MISMATCH,
                format!("error {i}"),
                Site::new("main.rs", i + 1, 1),
            ));
        }
        assert_eq!(errors.errors.len(), MAX_ERRORS);
        assert_eq!(errors.total_errors, 25);
        assert!(errors.to_string().contains("and 5 more errors"));
    }

    #[test]
    fn test_push_routes_warnings() {
        let mut errors = CompileErrors::empty();
        errors.push(McfError::warning(
            ErrorCode::UNSUPPORTED_VERSION,
            "old version",
            Site::synthetic(),
        ));
        assert!(!errors.has_errors());
        assert_eq!(errors.total_warnings, 1);
    }

    #[test]
    fn test_json_serialization() {
        let mut errors = CompileErrors::empty();
        errors.push_error(McfError::new(
            ErrorCode::UNKNOWN_FIELD,
            "class 'Fib' has no field 'a3'",
            Site::new("main.rs", 10, 3),
        ));
        let json: serde_json::Value = serde_json::from_str(&errors.to_json()).unwrap();
        assert_eq!(json["total_errors"], 1);
        assert_eq!(json["errors"][0]["code"], 401);
        assert_eq!(json["errors"][0]["category"], "name");
        assert_eq!(json["errors"][0]["site"]["line"], 10);
        assert!(json["errors"][0].get("suggestion").is_none());
    }
}
