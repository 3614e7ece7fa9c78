//! Component registry: which components exist and which are in use.

use crate::database::ComponentSource;
use crate::error::{LinkError, LinkResult};
use indexmap::{IndexMap, IndexSet};
use std::collections::BTreeSet;
use tracing::debug;

/// Directory (under the project's function directory) that relocated
/// library procedures live in.
pub const LIB_DIR: &str = "lib";

/// Declared and activated components of one compilation.
#[derive(Debug, Clone)]
pub struct ComponentRegistry {
    namespace: String,
    declared: BTreeSet<String>,
    /// Activated components in activation order, with their macro bindings.
    pub(crate) loaded: IndexMap<String, IndexMap<String, String>>,
    /// Library procedures referenced from generated code.
    pub(crate) referenced: IndexSet<String>,
}

impl ComponentRegistry {
    /// Empty registry relocating libraries into `namespace`.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            declared: BTreeSet::new(),
            loaded: IndexMap::new(),
            referenced: IndexSet::new(),
        }
    }

    /// Registry declaring every component a database offers.
    pub fn from_source(namespace: impl Into<String>, source: &dyn ComponentSource) -> LinkResult<Self> {
        let mut registry = Self::new(namespace);
        for id in source.list_available_components()? {
            registry.declare_component(&id);
        }
        Ok(registry)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Register a component without activating it. Returns `false` if it
    /// was already declared.
    pub fn declare_component(&mut self, id: &str) -> bool {
        self.declared.insert(id.to_string())
    }

    pub fn is_declared(&self, id: &str) -> bool {
        self.declared.contains(id)
    }

    pub fn is_loaded(&self, id: &str) -> bool {
        self.loaded.contains_key(id)
    }

    /// Activated component ids in activation order.
    pub fn loaded(&self) -> impl Iterator<Item = &str> {
        self.loaded.keys().map(String::as_str)
    }

    /// Macro bindings recorded for an activated component.
    pub fn bindings(&self, id: &str) -> Option<&IndexMap<String, String>> {
        self.loaded.get(id)
    }

    /// Activate a component. Activating twice keeps the first bindings.
    pub fn use_component(&mut self, id: &str, bindings: IndexMap<String, String>) -> LinkResult<()> {
        if !self.declared.contains(id) {
            return Err(LinkError::UnknownComponent(id.to_string()));
        }
        if !self.loaded.contains_key(id) {
            debug!(component = id, bindings = bindings.len(), "component activated");
            self.loaded.insert(id.to_string(), bindings);
        }
        Ok(())
    }

    /// Final signature of a library procedure given by dotted id
    /// (`math.float.add` → `<ns>:lib/math/float/add`).
    pub fn signature_of(&self, procedure: &str) -> String {
        format!("{}:{}", self.namespace, Self::relative_path_of(procedure))
    }

    /// Path of a library procedure relative to the function directory.
    pub fn relative_path_of(procedure: &str) -> String {
        format!("{LIB_DIR}/{}", procedure.replace('.', "/"))
    }

    /// Declared component owning a dotted procedure id (longest prefix).
    pub fn owner_of<'a>(&self, procedure: &'a str) -> Option<&'a str> {
        procedure
            .char_indices()
            .filter(|&(_, c)| c == '.')
            .map(|(i, _)| &procedure[..i])
            .filter(|prefix| self.declared.contains(*prefix))
            .last()
    }

    /// Reference a library procedure from generated code. The owning
    /// component must be active; existence is verified when linking.
    pub fn reference(&mut self, procedure: &str) -> LinkResult<String> {
        let owner = self
            .owner_of(procedure)
            .ok_or_else(|| LinkError::UnresolvedReference(procedure.to_string()))?;
        if !self.loaded.contains_key(owner) {
            return Err(LinkError::UnknownComponent(owner.to_string()));
        }
        self.referenced.insert(procedure.to_string());
        Ok(self.signature_of(procedure))
    }

    /// Library procedures referenced so far.
    pub fn referenced(&self) -> impl Iterator<Item = &str> {
        self.referenced.iter().map(String::as_str)
    }
}
