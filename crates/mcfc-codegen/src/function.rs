//! Function call convention.
//!
//! A function owns two procedures. The *entry* constructs the parameters
//! from the macro arguments, resets the signal registers and calls the
//! *body*. Both are generated on the first call; every call site emits
//!
//! ```text
//! push_frame
//! call.m<i> = "<argument id>"
//! function <entry> with storage <st> call
//! pop_frame
//! <alias argument i> ← alias.a<i>
//! <result> ← ret
//! ```
//!
//! Parameter identities are pinned, so a recursive call reuses them; the
//! caller's copies are saved in its frame record and restored on pop.

use crate::cmd;
use crate::compiler::Compiler;
use crate::emit::{ProcId, ProcKind};
use crate::frame::Control;
use crate::types::{Register, CALL, RET};
use crate::value::{Capabilities, Kind, Value};
use mcfc_types::{ErrorCode, Site};
use tracing::{debug, info};

/// Handle of a declared function or method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(pub(crate) usize);

/// How an argument reaches the callee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// The callee gets a copy, released when it returns.
    Value,
    /// The callee's final value is written back into the argument.
    Alias,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Param {
    pub kind: Kind,
    pub pass: Pass,
}

impl Param {
    pub fn value(kind: Kind) -> Self {
        Self { kind, pass: Pass::Value }
    }

    pub fn alias(kind: Kind) -> Self {
        Self { kind, pass: Pass::Alias }
    }
}

pub(crate) type FunctionBody = Box<dyn FnOnce(&mut Compiler, &[Value])>;

pub(crate) struct FunctionDef {
    pub name: String,
    pub params: Vec<Param>,
    pub ret: Option<Kind>,
    /// Parameter values as seen by the body.
    pub inputs: Vec<Value>,
    pub entry: ProcId,
    pub body_proc: ProcId,
    /// Taken when the function is generated.
    pub body: Option<FunctionBody>,
    pub exported: bool,
}

impl Compiler {
    // ══════════════════════════════════════════════════════════════════════
    // Declaration
    // ══════════════════════════════════════════════════════════════════════

    /// Declare a function. Nothing is generated until the first call, so
    /// the body may call the function itself.
    #[track_caller]
    pub fn function(
        &mut self,
        name: &str,
        params: &[Param],
        ret: Option<Kind>,
        body: impl FnOnce(&mut Compiler, &[Value]) + 'static,
    ) -> FunctionId {
        let site = Site::caller();
        if self.functions.iter().any(|f| f.name == name) {
            self.report(
                ErrorCode::REDECLARATION,
                format!("function '{name}' is already defined"),
                &site,
            );
        }
        self.declare(name, params, ret, ProcKind::FunctionEntry, &site, Box::new(body))
    }

    pub(crate) fn declare(
        &mut self,
        name: &str,
        params: &[Param],
        ret: Option<Kind>,
        entry_kind: ProcKind,
        site: &Site,
        body: FunctionBody,
    ) -> FunctionId {
        let entry = self.new_procedure(entry_kind, site);
        let body_proc = self.new_procedure(ProcKind::FunctionBody, site);
        self.emitter.set_label(entry, name);
        self.emitter.set_label(body_proc, format!("{name}/body"));
        let inputs = params
            .iter()
            .map(|p| Value::new(self.ids.new_pinned(), p.kind))
            .collect();
        let id = FunctionId(self.functions.len());
        self.functions.push(FunctionDef {
            name: name.to_string(),
            params: params.to_vec(),
            ret,
            inputs,
            entry,
            body_proc,
            body: Some(body),
            exported: false,
        });
        debug!(function = name, params = params.len(), "function declared");
        id
    }

    /// The function whose body is being generated.
    pub fn current_function(&self) -> Option<FunctionId> {
        self.frame.function()
    }

    pub fn function_name(&self, id: FunctionId) -> Option<&str> {
        self.functions.get(id.0).map(|f| f.name.as_str())
    }

    // ══════════════════════════════════════════════════════════════════════
    // Calls
    // ══════════════════════════════════════════════════════════════════════

    /// Call `function`. Returns the result when it declares a return kind.
    #[track_caller]
    pub fn call(&mut self, function: FunctionId, args: &[&Value]) -> Option<Value> {
        let site = Site::caller();
        self.invoke(function, args, &site)
    }

    pub(crate) fn invoke(
        &mut self,
        function: FunctionId,
        args: &[&Value],
        site: &Site,
    ) -> Option<Value> {
        let Some(def) = self.functions.get(function.0) else {
            self.report(
                ErrorCode::UNKNOWN_IDENTITY,
                format!("unknown function #{}", function.0),
                site,
            );
            return None;
        };
        let name = def.name.clone();
        let params = def.params.clone();
        let ret = def.ret;
        let entry = def.entry;

        let mut valid = true;
        if args.len() != params.len() {
            self.report(
                ErrorCode::WRONG_ARG_COUNT,
                format!(
                    "'{name}' takes {} argument(s), {} given",
                    params.len(),
                    args.len()
                ),
                site,
            );
            valid = false;
        } else {
            for (arg, param) in args.iter().zip(&params) {
                valid &= self.check_live(arg, site) && self.check_kind(arg, param.kind, site);
            }
        }
        if !valid {
            return ret.map(|kind| self.placeholder(kind));
        }

        let l = self.layout.clone();
        self.push_frame();
        for (i, arg) in args.iter().enumerate() {
            self.emit(cmd::set_value(&l.call_arg(i), &cmd::quote(arg.id().as_str())));
        }
        self.export(function);
        let signature = self.signature(entry);
        if params.is_empty() {
            self.emit(cmd::call(&signature));
        } else {
            self.emit(cmd::call_with(&signature, &l.at(CALL)));
        }
        self.pop_frame();

        for (i, (arg, param)) in args.iter().zip(&params).enumerate() {
            if param.pass == Pass::Alias {
                let lines = arg.collect_in(&l, &l.alias_slot(i));
                self.emit_all(lines);
            }
        }
        let result = ret.map(|kind| {
            let value = self.alloc(kind);
            let lines = value.collect_in(&l, &l.at(RET));
            self.emit_all(lines);
            value
        });
        self.frame.after_branch = false;
        result
    }

    /// Generate entry and body on first use.
    fn export(&mut self, function: FunctionId) {
        let Some(def) = self.functions.get_mut(function.0) else {
            return;
        };
        if def.exported {
            return;
        }
        def.exported = true;
        let Some(body) = def.body.take() else {
            return;
        };
        let entry = def.entry;
        let body_proc = def.body_proc;
        let inputs = def.inputs.clone();
        let params = def.params.clone();
        info!(function = %def.name, "exporting function");

        let l = self.layout.clone();
        let caller = std::mem::take(&mut self.frame);

        self.forward(entry);
        for (i, input) in inputs.iter().enumerate() {
            let lines = input.macro_construct(&l, &format!("m{i}"));
            self.emit_all(lines);
        }
        let owned: Vec<(Value, bool)> = inputs
            .iter()
            .zip(&params)
            .map(|(v, p)| (v.clone(), p.pass == Pass::Value))
            .collect();
        self.open_new_frame(&owned);
        let body_sig = self.signature(body_proc);
        self.emit(cmd::call(&body_sig));

        self.forward(body_proc);
        self.frame.controls.push(Control::Function { id: function });
        self.open_scope();
        body(self, &inputs);
        self.close_scope();
        self.store_aliases(function);
        self.close_scope();
        self.frame.controls.pop();
        self.rewind();
        self.rewind();

        self.frame = caller;
    }

    /// Write every by-alias parameter to its alias slot.
    fn store_aliases(&mut self, function: FunctionId) {
        let Some(def) = self.functions.get(function.0) else {
            return;
        };
        let l = self.layout.clone();
        let lines: Vec<String> = def
            .inputs
            .iter()
            .zip(&def.params)
            .enumerate()
            .filter(|(_, (_, p))| p.pass == Pass::Alias)
            .flat_map(|(i, (input, _))| input.move_out(&l, &l.alias_slot(i)))
            .collect();
        self.emit_all(lines);
    }

    // ══════════════════════════════════════════════════════════════════════
    // Return
    // ══════════════════════════════════════════════════════════════════════

    /// Leave the enclosing function, optionally with a result.
    #[track_caller]
    pub fn return_(&mut self, value: Option<&Value>) {
        let site = Site::caller();
        let Some(function) = self.frame.function() else {
            self.report(
                ErrorCode::RETURN_OUTSIDE_FUNCTION,
                "return outside of a function",
                &site,
            );
            return;
        };
        let expected = self.functions.get(function.0).and_then(|f| f.ret);
        let found = value.map(Value::kind);
        if expected != found {
            let describe = |k: Option<Kind>| k.map_or("nothing", |k| k.name());
            self.report(
                ErrorCode::RETURN_TYPE_MISMATCH,
                format!(
                    "function returns {}, found {}",
                    describe(expected),
                    describe(found)
                ),
                &site,
            );
            return;
        }
        let l = self.layout.clone();
        if let Some(value) = value {
            if !self.check_live(value, &site) {
                return;
            }
            let lines = value.move_out(&l, &l.at(RET));
            self.emit_all(lines);
        }
        self.emit(cmd::set(&l.sys(Register::Terminate), 1));
        self.store_open_fields();
        self.store_aliases(function);
        self.release_scopes_from(0);
        self.emit(cmd::ret(0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcfc_types::Config;

    #[test]
    fn test_uncalled_function_is_not_generated() {
        let mut cx = Compiler::new(Config::with_namespace("t"));
        cx.function("unused", &[], None, |cx, _| {
            cx.int(1);
        });
        cx.entry("main", |_| {});
        let out = cx.finish().unwrap();
        assert_eq!(out.procedures_of_kind(ProcKind::FunctionBody).count(), 0);
    }

    #[test]
    fn test_body_generated_once() {
        let mut cx = Compiler::new(Config::with_namespace("t"));
        let f = cx.function("inc", &[Param::value(Kind::Integer)], Some(Kind::Integer), |cx, p| {
            let r = cx.add(&p[0], 1);
            cx.return_(Some(&r));
        });
        cx.entry("main", |cx| {
            let a = cx.int(1);
            let b = cx.call(f, &[&a]).unwrap();
            cx.call(f, &[&b]);
        });
        let out = cx.finish().unwrap();
        let entries: Vec<_> = out.procedures_of_kind(ProcKind::FunctionEntry).collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].lines[0], "$scoreboard players operation v0 t.var = $(m0) t.var");
        let main = out.procedure("t:main").unwrap();
        let calls = main
            .lines
            .iter()
            .filter(|l| l.starts_with("function t:mcf/p0 with storage t:mcf call"))
            .count();
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_argument_count_checked() {
        let mut cx = Compiler::new(Config::with_namespace("t"));
        let f = cx.function("one", &[Param::value(Kind::Integer)], None, |_, _| {});
        cx.entry("main", |cx| {
            cx.call(f, &[]);
        });
        let failure = cx.finish().unwrap_err();
        assert_eq!(failure.errors.errors[0].code, ErrorCode::WRONG_ARG_COUNT);
    }

    #[test]
    fn test_return_kind_checked() {
        let mut cx = Compiler::new(Config::with_namespace("t"));
        let f = cx.function("f", &[], Some(Kind::Integer), |cx, _| {
            let t = cx.text("x");
            cx.return_(Some(&t));
        });
        cx.entry("main", |cx| {
            cx.call(f, &[]);
        });
        let failure = cx.finish().unwrap_err();
        assert_eq!(failure.errors.errors[0].code, ErrorCode::RETURN_TYPE_MISMATCH);
    }

    #[test]
    fn test_return_outside_function() {
        let mut cx = Compiler::new(Config::with_namespace("t"));
        cx.entry("main", |cx| cx.return_(None));
        let failure = cx.finish().unwrap_err();
        assert_eq!(
            failure.errors.errors[0].code,
            ErrorCode::RETURN_OUTSIDE_FUNCTION
        );
    }

    #[test]
    fn test_duplicate_function_name() {
        let mut cx = Compiler::new(Config::with_namespace("t"));
        cx.function("f", &[], None, |_, _| {});
        cx.function("f", &[], None, |_, _| {});
        let failure = cx.finish().unwrap_err();
        assert_eq!(failure.errors.errors[0].code, ErrorCode::REDECLARATION);
    }
}
