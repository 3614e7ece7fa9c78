//! Stack-frame emulation.
//!
//! The target has no call stack. Before a nested call the caller copies
//! every live value and the signal registers into `frame`, appends it to
//! `stack` and starts the callee with an empty context. After the call
//! the record is read back from `stack[-1]` and removed.
//!
//! ```text
//! push:  frame.m<i> ← value i       pop:  frame ← stack[-1]
//!        frame.term/exit/cont/cond        remove stack[-1]
//!        stack += frame                    registers ← frame.*
//!        frame ← {}                        value i ← frame.m<i>
//!                                          frame ← {}
//! ```

use crate::cmd;
use crate::compiler::Compiler;
use crate::emit::ValueId;
use crate::error::CodegenError;
use crate::function::FunctionId;
use crate::types::{Register, FRAME, LOOP_SIGNALS, SIGNALS, STACK};
use crate::value::{Capabilities, ShapeId, Value};
use indexmap::IndexMap;
use tracing::trace;

/// A value registered in the generation-time context.
#[derive(Debug, Clone)]
pub(crate) struct Slot {
    pub value: Value,
    /// Released automatically at scope exit and on return.
    pub owned: bool,
}

/// Open control construct in the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Control {
    /// A loop main body. `scope_depth` is the index of its body scope and
    /// `fields_depth` the number of instances open when it started.
    Loop {
        scope_depth: usize,
        fields_depth: usize,
    },
    /// A function body.
    Function { id: FunctionId },
}

/// Generation-time state of one procedure tree.
#[derive(Debug, Default)]
pub(crate) struct FrameState {
    /// Live values in creation order.
    pub context: IndexMap<ValueId, Slot>,
    pub scopes: Vec<Vec<ValueId>>,
    pub controls: Vec<Control>,
    /// Objects whose fields are collected into the shared field slots.
    pub open_fields: Vec<(Value, ShapeId)>,
    /// The last construct was an if or elif branch.
    pub after_branch: bool,
}

impl FrameState {
    pub fn in_loop(&self) -> bool {
        self.controls
            .iter()
            .any(|c| matches!(c, Control::Loop { .. }))
    }

    pub fn in_function(&self) -> bool {
        self.controls
            .iter()
            .any(|c| matches!(c, Control::Function { .. }))
    }

    /// Scope depth and open-instance depth of the innermost loop.
    pub fn innermost_loop(&self) -> Option<(usize, usize)> {
        self.controls.iter().rev().find_map(|c| match c {
            Control::Loop {
                scope_depth,
                fields_depth,
            } => Some((*scope_depth, *fields_depth)),
            Control::Function { .. } => None,
        })
    }

    pub fn function(&self) -> Option<FunctionId> {
        self.controls.iter().rev().find_map(|c| match c {
            Control::Function { id } => Some(*id),
            Control::Loop { .. } => None,
        })
    }
}

impl Compiler {
    // ══════════════════════════════════════════════════════════════════════
    // Call frames
    // ══════════════════════════════════════════════════════════════════════

    /// Save the live context and signal registers, then start an empty
    /// generation-time frame for the callee.
    pub(crate) fn push_frame(&mut self) {
        let l = self.layout.clone();
        let saved: Vec<Value> = self.frame.context.values().map(|s| s.value.clone()).collect();
        for (i, value) in saved.iter().enumerate() {
            let lines = value.move_out(&l, &l.frame_slot(i));
            self.emit_all(lines);
        }
        for register in SIGNALS {
            self.emit(cmd::store_score(
                &l.at(FRAME).child(register.frame_key()),
                "byte",
                &l.sys(register),
            ));
        }
        self.emit(cmd::append_from(&l.at(STACK), &l.at(FRAME)));
        self.emit(cmd::set_value(&l.at(FRAME), "{}"));

        let outer = std::mem::take(&mut self.frame);
        self.saved_frames.push(outer);
        self.frames_pushed += 1;
        trace!(values = saved.len(), depth = self.saved_frames.len(), "frame pushed");
    }

    /// Reset the signal registers and register `params` as the new context.
    pub(crate) fn open_new_frame(&mut self, params: &[(Value, bool)]) {
        let l = self.layout.clone();
        for register in SIGNALS {
            self.emit(cmd::set(&l.sys(register), 0));
        }
        self.open_scope();
        for (value, owned) in params {
            self.adopt(value, *owned);
        }
    }

    /// Restore the caller's frame, registers and values.
    pub(crate) fn pop_frame(&mut self) {
        let Some(outer) = self.saved_frames.pop() else {
            self.fail(CodegenError::Internal("frame stack underflow".into()));
            return;
        };
        self.frame = outer;
        self.frames_popped += 1;

        let l = self.layout.clone();
        let top = l.at(STACK).index(-1);
        self.emit(cmd::set_from(&l.at(FRAME), &top));
        self.emit(cmd::remove(&top));
        for register in SIGNALS {
            self.emit(cmd::load_score(
                &l.sys(register),
                &l.at(FRAME).child(register.frame_key()),
            ));
        }
        let saved: Vec<Value> = self.frame.context.values().map(|s| s.value.clone()).collect();
        for (i, value) in saved.iter().enumerate() {
            let lines = value.collect_in(&l, &l.frame_slot(i));
            self.emit_all(lines);
        }
        self.emit(cmd::set_value(&l.at(FRAME), "{}"));
        trace!(values = saved.len(), depth = self.saved_frames.len(), "frame popped");
    }

    // ══════════════════════════════════════════════════════════════════════
    // Loop records
    // ══════════════════════════════════════════════════════════════════════

    /// Save and reset the loop flags.
    pub(crate) fn push_loop_record(&mut self) {
        let l = self.layout.clone();
        for register in LOOP_SIGNALS {
            self.emit(cmd::store_score(
                &l.at(FRAME).child(register.frame_key()),
                "byte",
                &l.sys(register),
            ));
        }
        self.emit(cmd::append_from(&l.at(STACK), &l.at(FRAME)));
        self.emit(cmd::set_value(&l.at(FRAME), "{}"));
        for register in LOOP_SIGNALS {
            self.emit(cmd::set(&l.sys(register), 0));
        }
        self.frames_pushed += 1;
    }

    pub(crate) fn pop_loop_record(&mut self) {
        let l = self.layout.clone();
        let top = l.at(STACK).index(-1);
        self.emit(cmd::set_from(&l.at(FRAME), &top));
        self.emit(cmd::remove(&top));
        for register in LOOP_SIGNALS {
            self.emit(cmd::load_score(
                &l.sys(register),
                &l.at(FRAME).child(register.frame_key()),
            ));
        }
        self.emit(cmd::set_value(&l.at(FRAME), "{}"));
        self.frames_popped += 1;
    }

    // ══════════════════════════════════════════════════════════════════════
    // Signal forwarding
    // ══════════════════════════════════════════════════════════════════════

    /// Checks emitted right after a nested invocation: stop this
    /// procedure when a return, break or continue is unwinding.
    pub(crate) fn forward_signals(&mut self) {
        let l = self.layout.clone();
        let stop = cmd::ret(0);
        if self.frame.in_function() {
            self.emit(cmd::when(&l.sys(Register::Terminate), "1", &stop));
        }
        if self.frame.in_loop() {
            self.emit(cmd::when(&l.sys(Register::LoopExit), "1", &stop));
            self.emit(cmd::when(&l.sys(Register::LoopCont), "1", &stop));
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::Compiler;
    use mcfc_types::Config;

    #[test]
    fn test_push_pop_saves_context_in_order() {
        let mut cx = Compiler::new(Config::with_namespace("t"));
        cx.entry("main", |cx| {
            let a = cx.int(1);
            let _b = cx.text("x");
            cx.push_frame();
            assert!(cx.frame.context.is_empty());
            cx.pop_frame();
            assert!(cx.frame.context.contains_key(a.id()));
        });
        let out = cx.finish().unwrap();
        let main = out.procedure("t:main").unwrap();
        assert!(main.lines.contains(
            &"execute store result storage t:mcf frame.m0 int 1 run scoreboard players get v0 t.var"
                .to_string()
        ));
        assert!(main
            .lines
            .contains(&"data modify storage t:mcf frame.m1 set from storage t:mcf mem.v1".to_string()));
        assert!(main
            .lines
            .contains(&"data modify storage t:mcf frame set from storage t:mcf stack[-1]".to_string()));
    }

    #[test]
    fn test_unbalanced_frames_fail_finish() {
        let mut cx = Compiler::new(Config::with_namespace("t"));
        cx.entry("main", |cx| cx.push_frame());
        let failure = cx.finish().unwrap_err();
        assert!(!failure.internal.is_empty());
    }
}
