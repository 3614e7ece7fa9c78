//! Shared types for the mcfc compiler.
//!
//! This crate defines the diagnostics, call-site locations and project
//! configuration used across all compiler stages.

mod config;
mod error;
mod site;

pub use config::{is_valid_namespace, Config, ConfigError, DEFAULT_NAMESPACE, DEFAULT_VERSION, MIN_VERSION};
pub use error::{CompileErrors, ErrorCategory, ErrorCode, McfError, Severity, MAX_ERRORS};
pub use site::Site;

/// Result type used for diagnostics throughout the mcfc compiler.
pub type Result<T> = std::result::Result<T, McfError>;
