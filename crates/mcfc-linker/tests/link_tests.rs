//! Integration tests for component activation and linking.
//!
//! Uses an in-memory database for the link semantics and a temporary
//! directory for the on-disk database layout.

use indexmap::IndexMap;
use mcfc_linker::{
    ComponentRegistry, ComponentSource, DirDatabase, LinkError, MemoryDatabase,
};
use std::fs;
use tempfile::tempdir;

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn float_db() -> MemoryDatabase {
    MemoryDatabase::new()
        .component("math.int", r#"{ "namespace": "int", "onInitialize": "init" }"#)
        .procedure("math.int", "init", "scoreboard players set __cst__ __sys__ 10")
        .procedure("math.int", "pow10", "# powers of ten\nscoreboard players operation __buf1__ __sys__ *= __cst__ __sys__")
        .component(
            "math.float",
            r#"{
                "namespace": "float",
                "requires": ["math.int"],
                "onInitialize": "setup",
                "copy": [{ "from": "digits.json", "to": "data/__ns__/digits.json" }]
            }"#,
        )
        .procedure("math.float", "setup", "data modify storage __st__ digits set value []")
        .procedure(
            "math.float",
            "add",
            "\n# add two floats\nfunction float:normalize\nfunction int:pow10\nfunction float:add_exact",
        )
        .procedure("math.float", "add_exact", "say exact")
        .procedure("math.float", "normalize", "say __st__")
        .resource("math.float", "digits.json", r#"{ "storage": "__st__" }"#)
}

fn bindings(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Bindings covering every token `float_db` uses.
fn runtime() -> IndexMap<String, String> {
    bindings(&[
        ("ns", "demo"),
        ("st", "demo:mcf"),
        ("sys", "demo.sys"),
        ("cst", "#const"),
        ("buf1", "#buf1"),
    ])
}

fn registry(db: &dyn ComponentSource) -> ComponentRegistry {
    ComponentRegistry::from_source("demo", db).unwrap()
}

// ══════════════════════════════════════════════════════════════════════════════
// Link semantics
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_requirements_activated_and_ordered_first() {
    let db = float_db();
    let mut registry = registry(&db);
    registry
        .use_component("math.float", runtime())
        .unwrap();
    let output = registry.link(&db).unwrap();
    assert_eq!(output.order, vec!["math.int", "math.float"]);
    assert!(registry.is_loaded("math.int"));
    assert_eq!(
        output.init_calls,
        vec!["demo:lib/math/int/init", "demo:lib/math/float/setup"]
    );
}

#[test]
fn test_references_and_macros_rewritten() {
    let db = float_db();
    let mut registry = registry(&db);
    registry
        .use_component("math.float", runtime())
        .unwrap();
    let output = registry.link(&db).unwrap();
    let add = output
        .procedures
        .iter()
        .find(|p| p.id == "math.float.add")
        .unwrap();
    assert_eq!(add.signature, "demo:lib/math/float/add");
    assert_eq!(add.path, "lib/math/float/add");
    assert_eq!(
        add.lines,
        vec![
            "function demo:lib/math/float/normalize",
            "function demo:lib/math/int/pow10",
            "function demo:lib/math/float/add_exact",
        ]
    );
    let normalize = output
        .procedures
        .iter()
        .find(|p| p.id == "math.float.normalize")
        .unwrap();
    assert_eq!(normalize.lines, vec!["say demo:mcf"]);
}

#[test]
fn test_requirements_inherit_bindings() {
    let db = float_db();
    let mut registry = registry(&db);
    registry.use_component("math.float", runtime()).unwrap();
    let output = registry.link(&db).unwrap();
    let pow10 = output
        .procedures
        .iter()
        .find(|p| p.id == "math.int.pow10")
        .unwrap();
    // Comment stripped, tokens bound through math.float.
    assert_eq!(
        pow10.lines,
        vec!["scoreboard players operation #buf1 demo.sys *= #const demo.sys"]
    );
    assert_eq!(registry.bindings("math.int").unwrap()["cst"], "#const");
}

#[test]
fn test_unbound_macro_fails_link() {
    let db = float_db();
    let mut registry = registry(&db);
    registry
        .use_component("math.float", bindings(&[("st", "demo:mcf"), ("ns", "demo")]))
        .unwrap();
    let err = registry.link(&db).unwrap_err();
    assert!(matches!(
        err,
        LinkError::UnboundMacro { ref component, ref token, .. }
            if component == "math.int" && token == "__cst__"
    ));
}

#[test]
fn test_static_resources_copied_with_substitution() {
    let db = float_db();
    let mut registry = registry(&db);
    registry
        .use_component("math.float", runtime())
        .unwrap();
    let output = registry.link(&db).unwrap();
    assert_eq!(output.resources.len(), 1);
    assert_eq!(output.resources[0].path, "data/demo/digits.json");
    assert_eq!(output.resources[0].contents, r#"{ "storage": "demo:mcf" }"#);
}

#[test]
fn test_link_twice_is_idempotent() {
    let db = float_db();
    let mut registry = registry(&db);
    registry
        .use_component("math.float", runtime())
        .unwrap();
    let first = registry.link(&db).unwrap();
    let second = registry.link(&db).unwrap();
    assert_eq!(first, second);
    let mut signatures: Vec<_> = second.procedures.iter().map(|p| &p.signature).collect();
    let total = signatures.len();
    signatures.dedup();
    assert_eq!(signatures.len(), total);
}

#[test]
fn test_nothing_loaded_links_nothing() {
    let db = float_db();
    let mut registry = registry(&db);
    let output = registry.link(&db).unwrap();
    assert!(output.procedures.is_empty());
    assert!(output.init_calls.is_empty());
}

// ══════════════════════════════════════════════════════════════════════════════
// Failures
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_malformed_manifest_names_component() {
    let db = MemoryDatabase::new().component("broken", r#""just a string""#);
    let mut registry = registry(&db);
    registry.use_component("broken", IndexMap::new()).unwrap();
    let err = registry.link(&db).unwrap_err();
    assert!(matches!(err, LinkError::MalformedManifest { ref component, .. } if component == "broken"));
}

#[test]
fn test_unknown_requirement() {
    let db = MemoryDatabase::new().component("a", r#"{ "requires": ["ghost"] }"#);
    let mut registry = registry(&db);
    registry.use_component("a", IndexMap::new()).unwrap();
    let err = registry.link(&db).unwrap_err();
    assert_eq!(err.to_string(), "component 'a' requires unknown component 'ghost'");
}

#[test]
fn test_missing_initializer() {
    let db = MemoryDatabase::new().component("a", r#"{ "onInitialize": "boot" }"#);
    let mut registry = registry(&db);
    registry.use_component("a", IndexMap::new()).unwrap();
    assert!(matches!(
        registry.link(&db),
        Err(LinkError::UnknownProcedure { ref item, .. }) if item == "boot"
    ));
}

#[test]
fn test_unresolved_reference() {
    let db = float_db();
    let mut registry = registry(&db);
    registry.use_component("math.float", IndexMap::new()).unwrap();
    registry.reference("math.float.sub").unwrap();
    assert!(matches!(
        registry.link(&db),
        Err(LinkError::UnresolvedReference(ref id)) if id == "math.float.sub"
    ));
}

// ══════════════════════════════════════════════════════════════════════════════
// On-disk database
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_dir_database_layout() {
    let libs = tempdir().unwrap();
    let root = libs.path().join("1204");
    fs::create_dir_all(root.join("display/say")).unwrap();
    fs::create_dir_all(root.join("display/fancy")).unwrap();
    fs::write(root.join("db.json"), r#"["@a", "@s"]"#).unwrap();
    fs::write(root.join("display/component.json"), r#"{ "namespace": "display" }"#).unwrap();
    fs::write(root.join("display/say/main.mcfunction"), "say __msg__\n").unwrap();
    fs::write(root.join("display/fancy/component.json"), "{}").unwrap();
    fs::write(root.join("display/fancy/glow.mcfunction"), "say glow\n").unwrap();

    let db = DirDatabase::open(libs.path(), 1204).unwrap();
    assert_eq!(
        db.list_available_components().unwrap(),
        vec!["display", "display.fancy"]
    );
    assert_eq!(db.selectors().unwrap(), vec!["@a", "@s"]);

    let sources = db.read_component_procedure_sources("display").unwrap();
    assert_eq!(sources.len(), 1, "nested component files must not leak");
    assert_eq!(sources[0].rel_path, "say/main");

    let mut registry = registry(&db);
    registry
        .use_component("display", bindings(&[("msg", "hello")]))
        .unwrap();
    let output = registry.link(&db).unwrap();
    assert_eq!(output.procedures[0].signature, "demo:lib/display/say/main");
    assert_eq!(output.procedures[0].lines, vec!["say hello"]);
}

#[test]
fn test_dir_database_missing_version() {
    let libs = tempdir().unwrap();
    assert!(matches!(
        DirDatabase::open(libs.path(), 1210),
        Err(LinkError::Io { .. })
    ));
}
