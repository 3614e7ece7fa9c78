//! Project configuration.
//!
//! A project is configured by a small JSON document:
//!
//! ```json
//! { "namespace": "demo", "version": 1204, "gc": true }
//! ```
//!
//! Every field is optional and falls back to its default.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "mcf";

/// Target game version used when none is configured (1.20.4).
pub const DEFAULT_VERSION: u32 = 1204;

/// Oldest game version whose command set covers the generated code
/// (function macros and `return`).
pub const MIN_VERSION: u32 = 1202;

/// First version that uses singular resource directories (`function/`).
const SINGULAR_DIRS_VERSION: u32 = 1210;

/// Errors raised while loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid namespace '{0}': expected a non-empty name of [a-z0-9_.-]")]
    InvalidNamespace(String),

    #[error("game version {0} is older than the minimum supported {MIN_VERSION}")]
    UnsupportedVersion(u32),
}

/// Compiler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Namespace of every generated procedure, storage and objective.
    pub namespace: String,
    /// Target game version as `major*100 + minor`, e.g. 1204 for 1.20.4.
    pub version: u32,
    /// Release values automatically when their scope closes.
    pub gc: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            version: DEFAULT_VERSION,
            gc: true,
        }
    }
}

impl Config {
    /// Configuration with the given namespace and defaults elsewhere.
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_namespace(&self.namespace) {
            return Err(ConfigError::InvalidNamespace(self.namespace.clone()));
        }
        if self.version < MIN_VERSION {
            return Err(ConfigError::UnsupportedVersion(self.version));
        }
        Ok(())
    }

    /// Name of the function directory inside a data pack namespace.
    pub fn function_dir(&self) -> &'static str {
        if self.version >= SINGULAR_DIRS_VERSION {
            "function"
        } else {
            "functions"
        }
    }
}

/// Namespaces are non-empty and limited to `[a-z0-9_.-]`.
pub fn is_valid_namespace(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '_' | '.' | '-'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.namespace, "mcf");
        assert_eq!(config.version, 1204);
        assert!(config.gc);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let config = Config::from_json_str(r#"{ "namespace": "demo" }"#).unwrap();
        assert_eq!(config.namespace, "demo");
        assert_eq!(config.version, DEFAULT_VERSION);
        assert!(config.gc);
    }

    #[test]
    fn test_invalid_namespace_rejected() {
        let err = Config::from_json_str(r#"{ "namespace": "Demo Pack" }"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNamespace(ref ns) if ns == "Demo Pack"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = Config::from_json_str(r#"{ "namespce": "demo" }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_old_version_rejected() {
        let err = Config::from_json_str(r#"{ "version": 1193 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedVersion(1193)));
    }

    #[test]
    fn test_function_dir_by_version() {
        let mut config = Config::default();
        assert_eq!(config.function_dir(), "functions");
        config.version = 1210;
        assert_eq!(config.function_dir(), "function");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "namespace": "fib", "gc": false }}"#).unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.namespace, "fib");
        assert!(!config.gc);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/mcfc.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
