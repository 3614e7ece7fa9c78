//! Component databases.
//!
//! A database is a directory tree per targeted game version:
//!
//! ```text
//! libs/1204/
//!   db.json                     selector allow-list (JSON array)
//!   math/float/component.json   manifest of component `math.float`
//!   math/float/add.mcfunction   procedure `math.float.add`
//! ```
//!
//! [`DirDatabase`] reads such a tree from disk; [`MemoryDatabase`] holds the
//! same information in memory for tests and embedders.

use crate::error::{LinkError, LinkResult};
use crate::manifest::ComponentManifest;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

pub const MANIFEST_FILE: &str = "component.json";
pub const DATABASE_FILE: &str = "db.json";
pub const PROCEDURE_EXTENSION: &str = "mcfunction";

/// Selectors every supported version understands.
pub const DEFAULT_SELECTORS: &[&str] = &["@p", "@r", "@a", "@e", "@s"];

const DATABASE_ID: &str = "<database>";

/// Source text of one library procedure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureSource {
    /// Path relative to the component, `/`-separated, without extension.
    pub rel_path: String,
    pub text: String,
}

impl ProcedureSource {
    pub fn new(rel_path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            rel_path: rel_path.into(),
            text: text.into(),
        }
    }

    /// Dotted form of the relative path (`say/main` → `say.main`).
    pub fn dotted(&self) -> String {
        self.rel_path.replace('/', ".")
    }
}

/// Read access to a component database.
pub trait ComponentSource {
    /// Ids of every component in the database, sorted.
    fn list_available_components(&self) -> LinkResult<Vec<String>>;

    fn read_component_manifest(&self, id: &str) -> LinkResult<ComponentManifest>;

    /// Procedure sources of one component, sorted by relative path.
    fn read_component_procedure_sources(&self, id: &str) -> LinkResult<Vec<ProcedureSource>>;

    /// Raw contents of a static resource inside a component.
    fn read_component_resource(&self, id: &str, rel_path: &str) -> LinkResult<String>;

    /// Target selectors the game version understands.
    fn selectors(&self) -> LinkResult<Vec<String>>;
}

// ══════════════════════════════════════════════════════════════════════════════
// On-disk database
// ══════════════════════════════════════════════════════════════════════════════

/// Database rooted at `<libs>/<version>`.
#[derive(Debug, Clone)]
pub struct DirDatabase {
    root: PathBuf,
}

impl DirDatabase {
    /// Open the database directory for a game version.
    pub fn open(libs: &Path, version: u32) -> LinkResult<Self> {
        let root = libs.join(version.to_string());
        if !root.is_dir() {
            return Err(LinkError::Io {
                component: DATABASE_ID.to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no component database for version {version}"),
                ),
                path: root,
            });
        }
        debug!(root = %root.display(), "opened component database");
        Ok(Self { root })
    }

    /// Use `root` directly as the database directory.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn component_dir(&self, id: &str) -> PathBuf {
        id.split('.').fold(self.root.clone(), |dir, part| dir.join(part))
    }

    fn existing_component_dir(&self, id: &str) -> LinkResult<PathBuf> {
        let dir = self.component_dir(id);
        if dir.join(MANIFEST_FILE).is_file() {
            Ok(dir)
        } else {
            Err(LinkError::UnknownComponent(id.to_string()))
        }
    }
}

fn read_file(component: &str, path: &Path) -> LinkResult<String> {
    std::fs::read_to_string(path).map_err(|source| LinkError::Io {
        component: component.to_string(),
        path: path.to_path_buf(),
        source,
    })
}

fn walk_error(component: &str, err: walkdir::Error) -> LinkError {
    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
    LinkError::Io {
        component: component.to_string(),
        path,
        source: err.into(),
    }
}

/// Relative path with `/` separators regardless of platform.
fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

impl ComponentSource for DirDatabase {
    fn list_available_components(&self) -> LinkResult<Vec<String>> {
        let mut ids = Vec::new();
        for entry in WalkDir::new(&self.root) {
            let entry = entry.map_err(|e| walk_error(DATABASE_ID, e))?;
            if entry.file_name() != MANIFEST_FILE {
                continue;
            }
            let Some(dir) = entry.path().parent() else {
                continue;
            };
            let Ok(rel) = dir.strip_prefix(&self.root) else {
                continue;
            };
            if rel.as_os_str().is_empty() {
                continue;
            }
            ids.push(slash_path(rel).replace('/', "."));
        }
        ids.sort();
        Ok(ids)
    }

    fn read_component_manifest(&self, id: &str) -> LinkResult<ComponentManifest> {
        let dir = self.existing_component_dir(id)?;
        let text = read_file(id, &dir.join(MANIFEST_FILE))?;
        ComponentManifest::parse(id, &text)
    }

    fn read_component_procedure_sources(&self, id: &str) -> LinkResult<Vec<ProcedureSource>> {
        let dir = self.existing_component_dir(id)?;
        let walker = WalkDir::new(&dir).into_iter().filter_entry(|entry| {
            // Nested components own their own procedures.
            entry.depth() == 0
                || !(entry.file_type().is_dir() && entry.path().join(MANIFEST_FILE).is_file())
        });
        let mut sources = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| walk_error(id, e))?;
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().map_or(true, |ext| ext != PROCEDURE_EXTENSION)
            {
                continue;
            }
            let Ok(rel) = path.with_extension("").strip_prefix(&dir).map(slash_path) else {
                continue;
            };
            sources.push(ProcedureSource::new(rel, read_file(id, path)?));
        }
        sources.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
        Ok(sources)
    }

    fn read_component_resource(&self, id: &str, rel_path: &str) -> LinkResult<String> {
        let path = self.existing_component_dir(id)?.join(rel_path);
        if !path.is_file() {
            return Err(LinkError::UnknownProcedure {
                component: id.to_string(),
                item: rel_path.to_string(),
            });
        }
        read_file(id, &path)
    }

    fn selectors(&self) -> LinkResult<Vec<String>> {
        let path = self.root.join(DATABASE_FILE);
        if !path.is_file() {
            return Ok(DEFAULT_SELECTORS.iter().map(|s| s.to_string()).collect());
        }
        let text = read_file(DATABASE_ID, &path)?;
        serde_json::from_str(&text).map_err(|e| LinkError::MalformedManifest {
            component: DATABASE_ID.to_string(),
            reason: e.to_string(),
        })
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// In-memory database
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default)]
struct MemoryComponent {
    manifest: String,
    procedures: BTreeMap<String, String>,
    resources: BTreeMap<String, String>,
}

/// Database held in memory, built with chained calls.
///
/// ```
/// use mcfc_linker::{ComponentSource, MemoryDatabase};
///
/// let db = MemoryDatabase::new()
///     .component("display", r#"{ "namespace": "display" }"#)
///     .procedure("display", "say", "say hi");
/// assert_eq!(db.list_available_components().unwrap(), vec!["display"]);
/// ```
#[derive(Debug, Clone)]
pub struct MemoryDatabase {
    components: BTreeMap<String, MemoryComponent>,
    selectors: Vec<String>,
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self {
            components: BTreeMap::new(),
            selectors: DEFAULT_SELECTORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_selectors<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selectors = selectors.into_iter().map(Into::into).collect();
        self
    }

    /// Add a component with its raw `component.json` text.
    pub fn component(mut self, id: &str, manifest: &str) -> Self {
        self.components.entry(id.to_string()).or_default().manifest = manifest.to_string();
        self
    }

    pub fn procedure(mut self, id: &str, rel_path: &str, text: &str) -> Self {
        self.components
            .entry(id.to_string())
            .or_default()
            .procedures
            .insert(rel_path.to_string(), text.to_string());
        self
    }

    pub fn resource(mut self, id: &str, rel_path: &str, text: &str) -> Self {
        self.components
            .entry(id.to_string())
            .or_default()
            .resources
            .insert(rel_path.to_string(), text.to_string());
        self
    }

    fn get(&self, id: &str) -> LinkResult<&MemoryComponent> {
        self.components
            .get(id)
            .ok_or_else(|| LinkError::UnknownComponent(id.to_string()))
    }
}

impl ComponentSource for MemoryDatabase {
    fn list_available_components(&self) -> LinkResult<Vec<String>> {
        Ok(self.components.keys().cloned().collect())
    }

    fn read_component_manifest(&self, id: &str) -> LinkResult<ComponentManifest> {
        ComponentManifest::parse(id, &self.get(id)?.manifest)
    }

    fn read_component_procedure_sources(&self, id: &str) -> LinkResult<Vec<ProcedureSource>> {
        Ok(self
            .get(id)?
            .procedures
            .iter()
            .map(|(rel, text)| ProcedureSource::new(rel.as_str(), text.as_str()))
            .collect())
    }

    fn read_component_resource(&self, id: &str, rel_path: &str) -> LinkResult<String> {
        self.get(id)?
            .resources
            .get(rel_path)
            .cloned()
            .ok_or_else(|| LinkError::UnknownProcedure {
                component: id.to_string(),
                item: rel_path.to_string(),
            })
    }

    fn selectors(&self) -> LinkResult<Vec<String>> {
        Ok(self.selectors.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dotted_path() {
        assert_eq!(ProcedureSource::new("say/main", "").dotted(), "say.main");
    }

    #[test]
    fn test_memory_unknown_component() {
        let db = MemoryDatabase::new();
        assert!(matches!(
            db.read_component_manifest("nope"),
            Err(LinkError::UnknownComponent(ref id)) if id == "nope"
        ));
    }

    #[test]
    fn test_memory_default_selectors() {
        let db = MemoryDatabase::new();
        assert_eq!(db.selectors().unwrap().len(), DEFAULT_SELECTORS.len());
    }

    #[test]
    fn test_memory_procedures_sorted() {
        let db = MemoryDatabase::new()
            .component("c", "{}")
            .procedure("c", "b", "say b")
            .procedure("c", "a", "say a");
        let sources = db.read_component_procedure_sources("c").unwrap();
        assert_eq!(sources[0].rel_path, "a");
        assert_eq!(sources[1].rel_path, "b");
    }
}
