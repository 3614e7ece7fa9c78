//! Component manifests (`component.json`).

use crate::error::{LinkError, LinkResult};
use serde::{Deserialize, Serialize};

/// Namespace assumed by a manifest that does not declare one.
pub const LOCAL_NAMESPACE: &str = "local";

/// Declared metadata of one component.
///
/// ```json
/// {
///   "namespace": "float",
///   "requires": ["math.int"],
///   "onInitialize": "init",
///   "copy": [{ "from": "table.json", "to": "data/__ns__/table.json" }]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentManifest {
    /// Namespace the component's sources use to refer to their own procedures.
    #[serde(default = "local_namespace")]
    pub namespace: String,
    /// Components that must be linked alongside this one.
    #[serde(default)]
    pub requires: Vec<String>,
    /// Procedure (relative dotted path) run once when the pack loads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_initialize: Option<String>,
    /// Static resources copied into the output tree.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub copy: Vec<CopyRule>,
}

/// One static resource copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyRule {
    /// Path relative to the component directory.
    pub from: String,
    /// Path relative to the output root; macro tokens are substituted.
    pub to: String,
    /// Apply the component's token substitution to the contents.
    #[serde(default = "enabled")]
    pub substitute: bool,
}

fn local_namespace() -> String {
    LOCAL_NAMESPACE.to_string()
}

fn enabled() -> bool {
    true
}

impl Default for ComponentManifest {
    fn default() -> Self {
        Self {
            namespace: local_namespace(),
            requires: Vec::new(),
            on_initialize: None,
            copy: Vec::new(),
        }
    }
}

impl ComponentManifest {
    /// Parse a manifest; any failure names the offending component.
    pub fn parse(component: &str, text: &str) -> LinkResult<Self> {
        let malformed = |reason: String| LinkError::MalformedManifest {
            component: component.to_string(),
            reason,
        };
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| malformed(e.to_string()))?;
        if !value.is_object() {
            return Err(malformed("expected a JSON object".to_string()));
        }
        let manifest: Self = serde_json::from_value(value).map_err(|e| malformed(e.to_string()))?;
        for rule in &manifest.copy {
            for path in [&rule.from, &rule.to] {
                if !is_relative_inside(path) {
                    return Err(malformed(format!(
                        "copy path '{path}' must be relative and stay inside its root"
                    )));
                }
            }
        }
        Ok(manifest)
    }
}

/// `path` is non-empty, relative and has no `..` component.
pub fn is_relative_inside(path: &str) -> bool {
    let mut parts = path.split(['/', '\\']);
    let first = parts.next().unwrap_or_default();
    !path.is_empty()
        && !first.is_empty()
        && !first.contains(':')
        && std::iter::once(first).chain(parts).all(|part| part != "..")
}
