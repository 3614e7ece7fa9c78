//! Link-time error types.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors raised while reading or linking components.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The component id is not present in the database.
    #[error("unknown component '{0}'")]
    UnknownComponent(String),

    /// `component.json` is not a JSON object or has wrongly typed fields.
    #[error("component '{component}': malformed manifest: {reason}")]
    MalformedManifest { component: String, reason: String },

    /// A manifest lists a requirement the database does not know.
    #[error("component '{component}' requires unknown component '{required}'")]
    UnknownRequirement { component: String, required: String },

    /// Requirements form a cycle.
    #[error("dependency cycle between components: {0}")]
    DependencyCycle(String),

    /// A manifest names an initializer or resource the component lacks.
    #[error("component '{component}' has no procedure or resource '{item}'")]
    UnknownProcedure { component: String, item: String },

    /// A linked procedure or copy target still holds a `__name__` token.
    #[error("component '{component}': '{item}' uses unbound macro {token}")]
    UnboundMacro {
        component: String,
        item: String,
        token: String,
    },

    /// Generated code references a library procedure that does not exist.
    #[error("reference to unknown library procedure '{0}'")]
    UnresolvedReference(String),

    #[error("component '{component}': failed to read '{}': {source}", path.display())]
    Io {
        component: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience result type for link operations.
pub type LinkResult<T> = Result<T, LinkError>;
