use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::Location;

/// Location in the driving program where a construct was built.
///
/// Line and column values are 1-based. Every public builder entry point
/// captures the site of its caller so that diagnostics point at user code
/// rather than at the compiler internals.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Site {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl Site {
    /// Create a new site.
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }

    /// Site of the caller of the enclosing `#[track_caller]` function.
    #[track_caller]
    pub fn caller() -> Self {
        let location = Location::caller();
        Self::new(location.file(), location.line(), location.column())
    }

    /// Placeholder for synthesized constructs with no user-visible origin.
    pub fn synthetic() -> Self {
        Self::new("<generated>", 0, 0)
    }

    pub fn is_synthetic(&self) -> bool {
        self.line == 0
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[track_caller]
    fn captured() -> Site {
        Site::caller()
    }

    #[test]
    fn test_caller_points_at_call_expression() {
        let expected_line = line!() + 1;
        let site = captured();
        assert_eq!(site.line, expected_line);
        assert!(site.file.ends_with("site.rs"));
    }

    #[test]
    fn test_display() {
        let site = Site::new("demo.rs", 12, 5);
        assert_eq!(site.to_string(), "demo.rs:12:5");
    }

    #[test]
    fn test_synthetic() {
        assert!(Site::synthetic().is_synthetic());
        assert!(!Site::new("a.rs", 1, 1).is_synthetic());
    }
}
