//! Runtime helper procedures and component access.
//!
//! Helpers are small macro procedures generated on first use and shared
//! by every call site of one compilation. Library routines come from
//! components and are resolved by the linker.

use crate::cmd;
use crate::compiler::Compiler;
use crate::emit::ProcKind;
use crate::types::{Layout, Register, CACHE, MEM, REGISTER};
use indexmap::IndexMap;
use mcfc_types::{ErrorCode, Site};
use tracing::{debug, info};

/// Macro helper procedures.
///
/// | Helper         | Arguments (`call.*`) | Effect                               |
/// |----------------|----------------------|--------------------------------------|
/// | `Concat`       | `a`, `b`             | `register = "<a><b>"`                |
/// | `ListGet`      | `list`, `index`      | `register = mem.<list>[<index>]`     |
/// | `ListSet`      | `list`, `index`      | `mem.<list>[<index>] = cache.elem`   |
/// | `FloatExtract` | `sign`, `m`, `p`     | `register = <sign><m>e<p>d`          |
/// | `RunAs`        | `target`, `proc`     | run `proc` as each `target`          |
/// | `RunAsAt`      | `target`, `proc`     | same, also at the target's position  |
/// | `RunPositioned`| `pos`, `proc`        | run `proc` positioned at `pos`       |
/// | `IsBlock`      | `pos`, `block`       | `#general = 1` if `pos` holds `block`|
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Helper {
    Concat,
    ListGet,
    ListSet,
    FloatExtract,
    RunAs,
    RunAsAt,
    RunPositioned,
    IsBlock,
}

impl Helper {
    pub fn name(self) -> &'static str {
        match self {
            Helper::Concat => "concat",
            Helper::ListGet => "list_get",
            Helper::ListSet => "list_set",
            Helper::FloatExtract => "float_extract",
            Helper::RunAs => "run_as",
            Helper::RunAsAt => "run_as_at",
            Helper::RunPositioned => "run_positioned",
            Helper::IsBlock => "is_block",
        }
    }

    fn lines(self, l: &Layout) -> Vec<String> {
        let st = &l.storage;
        let line = match self {
            Helper::Concat => {
                format!("$data modify storage {st} {REGISTER} set value \"$(a)$(b)\"")
            }
            Helper::ListGet => format!(
                "$data modify storage {st} {REGISTER} set from storage {st} {MEM}.$(list)[$(index)]"
            ),
            Helper::ListSet => format!(
                "$data modify storage {st} {MEM}.$(list)[$(index)] set from storage {st} {CACHE}.elem"
            ),
            Helper::FloatExtract => {
                format!("$data modify storage {st} {REGISTER} set value $(sign)$(m)e$(p)d")
            }
            Helper::RunAs => "$execute as $(target) run function $(proc)".to_string(),
            Helper::RunAsAt => "$execute as $(target) at @s run function $(proc)".to_string(),
            Helper::RunPositioned => "$execute positioned $(pos) run function $(proc)".to_string(),
            Helper::IsBlock => format!(
                "$execute store success score {} if block $(pos) $(block)",
                l.sys(Register::General)
            ),
        };
        vec![line]
    }
}

impl Compiler {
    // ══════════════════════════════════════════════════════════════════════
    // Helpers
    // ══════════════════════════════════════════════════════════════════════

    /// Signature of `helper`, generating it on first use.
    pub(crate) fn helper(&mut self, helper: Helper) -> String {
        if let Some(signature) = self.helpers.get(&helper) {
            return signature.clone();
        }
        let path = format!("mcf/{}", helper.name());
        let Some(proc) = self.emitter.named_procedure(
            &path,
            ProcKind::Helper,
            Site::synthetic(),
            Some(helper.name().to_string()),
        ) else {
            let signature = self.layout.signature(&path);
            self.helpers.insert(helper, signature.clone());
            return signature;
        };
        let lines = helper.lines(&self.layout);
        self.forward(proc);
        self.emit_all(lines);
        self.rewind();
        let signature = self.signature(proc);
        debug!(helper = helper.name(), "runtime helper generated");
        self.helpers.insert(helper, signature.clone());
        signature
    }

    // ══════════════════════════════════════════════════════════════════════
    // Components
    // ══════════════════════════════════════════════════════════════════════

    /// Macro bindings handed to every component activated by the engine.
    ///
    /// `__ns__`, `__st__`, `__var__`, `__sys__` name the namespace, the
    /// storage and the two objectives; `__gen__`, `__cst__` and
    /// `__buf1__`..`__buf6__` name scratch registers.
    pub fn runtime_bindings(&self) -> IndexMap<String, String> {
        let l = &self.layout;
        let mut bindings = IndexMap::new();
        bindings.insert("ns".to_string(), l.namespace.clone());
        bindings.insert("st".to_string(), l.storage.clone());
        bindings.insert("var".to_string(), l.var_objective.clone());
        bindings.insert("sys".to_string(), l.sys_objective.clone());
        bindings.insert("gen".to_string(), Register::General.holder());
        bindings.insert("cst".to_string(), Register::Const.holder());
        for n in 1..=6 {
            bindings.insert(format!("buf{n}"), Register::Buffer(n).holder());
        }
        bindings
    }

    /// Activate component `id` with the runtime bindings.
    #[track_caller]
    pub fn use_component(&mut self, id: &str) -> bool {
        let site = Site::caller();
        self.activate(id, &site)
    }

    fn activate(&mut self, id: &str, site: &Site) -> bool {
        if self.components.is_loaded(id) {
            return true;
        }
        let bindings = self.runtime_bindings();
        match self.components.use_component(id, bindings) {
            Ok(()) => {
                info!(component = id, "component activated");
                true
            }
            Err(err) => {
                self.report(ErrorCode::UNKNOWN_COMPONENT, err.to_string(), site);
                false
            }
        }
    }

    /// Signature of library procedure `procedure` (dotted), activating
    /// its component.
    pub(crate) fn library(&mut self, procedure: &str, site: &Site) -> Option<String> {
        let Some(owner) = self.components.owner_of(procedure) else {
            self.report(
                ErrorCode::UNKNOWN_COMPONENT,
                format!("no component provides '{procedure}'"),
                site,
            );
            return None;
        };
        if !self.activate(owner, site) {
            return None;
        }
        match self.components.reference(procedure) {
            Ok(signature) => Some(signature),
            Err(err) => {
                self.report(ErrorCode::UNKNOWN_PROCEDURE, err.to_string(), site);
                None
            }
        }
    }

    /// Invoke a library procedure such as `display.banner.show`.
    #[track_caller]
    pub fn call_library(&mut self, procedure: &str) {
        let site = Site::caller();
        if let Some(signature) = self.library(procedure, &site) {
            self.emit(cmd::call(&signature));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcfc_linker::MemoryDatabase;
    use mcfc_types::Config;

    #[test]
    fn test_helper_generated_once() {
        let mut cx = Compiler::new(Config::with_namespace("t"));
        cx.entry("main", |cx| {
            let a = cx.text("a");
            let b = cx.text("b");
            cx.concat(&a, &b);
            cx.concat(&b, &a);
        });
        let out = cx.finish().unwrap();
        let helpers: Vec<_> = out.procedures_of_kind(ProcKind::Helper).collect();
        assert_eq!(helpers.len(), 1);
        assert_eq!(helpers[0].signature, "t:mcf/concat");
        assert_eq!(
            helpers[0].lines,
            [r#"$data modify storage t:mcf register set value "$(a)$(b)""#]
        );
    }

    #[test]
    fn test_library_call_activates_component() {
        let db = MemoryDatabase::new()
            .component("fx", r#"{"namespace": "fx"}"#)
            .procedure("fx", "boom", "say __ns__");
        let mut cx = Compiler::with_database(Config::with_namespace("t"), &db).unwrap();
        cx.entry("main", |cx| cx.call_library("fx.boom"));
        let out = cx.finish().unwrap();
        assert!(out.components.is_loaded("fx"));
        let main = out.procedure("t:main").unwrap();
        assert_eq!(main.lines.last().unwrap(), "function t:lib/fx/boom");
    }

    #[test]
    fn test_unknown_library_is_reported() {
        let mut cx = Compiler::new(Config::with_namespace("t"));
        cx.entry("main", |cx| cx.call_library("nowhere.x"));
        let failure = cx.finish().unwrap_err();
        assert_eq!(failure.errors.errors[0].code, ErrorCode::UNKNOWN_COMPONENT);
    }
}
