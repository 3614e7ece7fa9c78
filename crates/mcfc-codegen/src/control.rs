//! Control-flow lowering.
//!
//! Branch bodies and loop bodies become procedures invoked under
//! `execute if`. A chain of branches keeps its outcome markers on
//! `cond_stack` so nested chains cannot clobber them:
//!
//! ```text
//! if c1:   marker = c1          elif c2: run = !#cond_last && c2
//!          push marker                   marker = #cond_last || run
//!          if c1 → body                  push marker
//!          #cond_last = pop              if run → body
//!                                        #cond_last = pop
//! else:    run = !#cond_last; if run → body
//! ```
//!
//! A loop is a control procedure (advance, test, dispatch) and a main
//! procedure (body, then tail-call control). Iteration is recursion, so
//! the number of iterations is bounded by the runtime's call depth.

use crate::cmd;
use crate::compiler::Compiler;
use crate::emit::ProcKind;
use crate::frame::Control;
use crate::ops::{CmpOp, Operand};
use crate::types::{Register, Score, COND_STACK, REGISTER};
use crate::value::{Capabilities, Kind, Value};
use mcfc_types::{ErrorCode, Site};
use tracing::debug;

impl Compiler {
    // ══════════════════════════════════════════════════════════════════════
    // Branches
    // ══════════════════════════════════════════════════════════════════════

    fn branch_condition(&mut self, cond: &Value, site: &Site) -> bool {
        if !self.check_live(cond, site) {
            return false;
        }
        if cond.kind() != Kind::Condition {
            self.report(
                ErrorCode::NOT_A_CONDITION,
                format!("branch condition is {}, not a condition", cond.kind().name()),
                site,
            );
            return false;
        }
        true
    }

    /// Generate a branch body in its own procedure and scope.
    pub(crate) fn branch_body(
        &mut self,
        site: &Site,
        body: impl FnOnce(&mut Compiler),
    ) -> String {
        let proc = self.new_procedure(ProcKind::Branch, site);
        self.forward(proc);
        self.frame.after_branch = false;
        self.open_scope();
        body(self);
        self.close_scope();
        self.rewind();
        self.signature(proc)
    }

    /// Pop the chain marker into `#cond_last` and forward signals.
    fn leave_branch(&mut self) {
        let l = self.layout.clone();
        let top = l.at(COND_STACK).index(-1);
        self.emit(cmd::load_score(&l.sys(Register::CondLast), &top));
        self.emit(cmd::remove(&top));
        self.forward_signals();
        self.frame.after_branch = true;
    }

    #[track_caller]
    pub fn if_(&mut self, cond: &Value, body: impl FnOnce(&mut Compiler)) {
        let site = Site::caller();
        let valid = self.branch_condition(cond, &site);
        let signature = self.branch_body(&site, body);
        if !valid {
            self.frame.after_branch = true;
            return;
        }
        let l = self.layout.clone();
        let score = l.var(cond.id());
        self.emit(cmd::store_score(&l.at(REGISTER), "byte", &score));
        self.emit(cmd::append_from(&l.at(COND_STACK), &l.at(REGISTER)));
        self.emit(cmd::when(&score, "1", &cmd::call(&signature)));
        self.leave_branch();
    }

    #[track_caller]
    pub fn elif(&mut self, cond: &Value, body: impl FnOnce(&mut Compiler)) {
        let site = Site::caller();
        let chained = self.frame.after_branch;
        if !chained {
            self.report(
                ErrorCode::ELIF_WITHOUT_BRANCH,
                "elif must directly follow an if or elif",
                &site,
            );
        }
        let valid = self.branch_condition(cond, &site);
        let signature = self.branch_body(&site, body);
        if !chained || !valid {
            self.frame.after_branch = chained;
            return;
        }
        let l = self.layout.clone();
        let general = l.sys(Register::General);
        let last = l.sys(Register::CondLast);
        self.emit(cmd::set(&general, 0));
        self.emit(format!(
            "execute if score {last} matches 0 if score {} matches 1 run {}",
            l.var(cond.id()),
            cmd::set(&general, 1)
        ));
        self.emit(cmd::store_score(&l.at(REGISTER), "byte", &general));
        self.emit(cmd::when(
            &last,
            "1",
            &cmd::set_value(&l.at(REGISTER), "1b"),
        ));
        self.emit(cmd::append_from(&l.at(COND_STACK), &l.at(REGISTER)));
        self.emit(cmd::when(&general, "1", &cmd::call(&signature)));
        self.leave_branch();
    }

    #[track_caller]
    pub fn else_(&mut self, body: impl FnOnce(&mut Compiler)) {
        let site = Site::caller();
        let chained = self.frame.after_branch;
        if !chained {
            self.report(
                ErrorCode::ELSE_WITHOUT_BRANCH,
                "else must directly follow an if or elif",
                &site,
            );
        }
        let signature = self.branch_body(&site, body);
        self.frame.after_branch = false;
        if !chained {
            return;
        }
        let l = self.layout.clone();
        let general = l.sys(Register::General);
        self.emit(cmd::set(&general, 0));
        self.emit(cmd::when(
            &l.sys(Register::CondLast),
            "0",
            &cmd::set(&general, 1),
        ));
        self.emit(cmd::when(&general, "1", &cmd::call(&signature)));
        self.forward_signals();
    }

    // ══════════════════════════════════════════════════════════════════════
    // Loops
    // ══════════════════════════════════════════════════════════════════════

    /// Call `control` inside a loop record, then forward signals.
    fn run_loop(&mut self, control: &str) {
        self.push_loop_record();
        self.emit(cmd::call(control));
        self.pop_loop_record();
        self.forward_signals();
        self.frame.after_branch = false;
    }

    /// Generate the main procedure: body, scope release, tail call.
    fn loop_main(
        &mut self,
        main: crate::emit::ProcId,
        control: &str,
        body: impl FnOnce(&mut Compiler),
    ) {
        self.forward(main);
        self.frame.after_branch = false;
        let scope_depth = self.frame.scopes.len();
        let fields_depth = self.frame.open_fields.len();
        self.frame.controls.push(Control::Loop {
            scope_depth,
            fields_depth,
        });
        self.open_scope();
        body(self);
        self.close_scope();
        self.frame.controls.pop();
        self.emit(cmd::call(control));
        self.rewind();
    }

    /// `while cond() { body }`. `cond` is generated inside the control
    /// procedure and re-evaluated before every iteration.
    #[track_caller]
    pub fn while_(
        &mut self,
        cond: impl FnOnce(&mut Compiler) -> Value,
        body: impl FnOnce(&mut Compiler),
    ) {
        let site = Site::caller();
        let control = self.new_procedure(ProcKind::LoopControl, &site);
        let main = self.new_procedure(ProcKind::LoopBody, &site);
        let control_sig = self.signature(control);
        let main_sig = self.signature(main);
        let l = self.layout.clone();
        debug!(control = %control_sig, "lowering while loop");

        self.forward(control);
        self.emit(cmd::set(&l.sys(Register::LoopCont), 0));
        self.open_scope();
        let c = cond(self);
        if self.branch_condition(&c, &site) {
            self.emit(cmd::when(&l.var(c.id()), "1", &cmd::call(&main_sig)));
        }
        self.emit(cmd::when(
            &l.sys(Register::LoopCont),
            "1",
            &cmd::call(&control_sig),
        ));
        self.close_scope();
        self.rewind();

        self.loop_main(main, &control_sig, body);
        self.run_loop(&control_sig);
    }

    /// `for i in start..stop step step { body(i) }` with `stop` exclusive.
    #[track_caller]
    pub fn for_range<'a, 'b>(
        &mut self,
        start: impl Into<Operand<'a>>,
        stop: impl Into<Operand<'b>>,
        step: i32,
        body: impl FnOnce(&mut Compiler, &Value),
    ) {
        let site = Site::caller();
        let (start, stop) = (start.into(), stop.into());
        if step == 0 {
            self.report(ErrorCode::ZERO_STEP, "range step must not be zero", &site);
            return;
        }
        for operand in [start, stop] {
            if let Operand::Value(v) = operand {
                if !self.check_live(v, &site) || !self.check_kind(v, Kind::Integer, &site) {
                    return;
                }
            }
        }

        let l = self.layout.clone();
        self.open_scope();
        let index = self.alloc(Kind::Integer);
        let index_score = l.var(index.id());
        match start {
            Operand::Literal(n) => match n.checked_sub(step) {
                Some(first) => self.emit(cmd::set(&index_score, first)),
                None => {
                    self.emit(cmd::set(&index_score, n));
                    self.shift(&index_score, step, true);
                }
            },
            Operand::Value(v) => {
                let lines = index.assign_value(&l, v);
                self.emit_all(lines);
                self.shift(&index_score, step, true);
            }
        }
        let bound = match stop {
            Operand::Value(v) => {
                let bound = self.alloc(Kind::Integer);
                let lines = bound.assign_value(&l, v);
                self.emit_all(lines);
                Some(bound)
            }
            Operand::Literal(_) => None,
        };

        let control = self.new_procedure(ProcKind::LoopControl, &site);
        let main = self.new_procedure(ProcKind::LoopBody, &site);
        let control_sig = self.signature(control);
        let main_sig = self.signature(main);
        debug!(control = %control_sig, step, "lowering range loop");

        self.forward(control);
        self.emit(cmd::set(&l.sys(Register::LoopCont), 0));
        self.shift(&index_score, step, false);
        let cmp = if step > 0 { CmpOp::Lt } else { CmpOp::Gt };
        let dispatch = cmd::call(&main_sig);
        match (&bound, stop) {
            (Some(bound), _) => {
                let op = if step > 0 { "<" } else { ">" };
                self.emit(cmd::when_compare(&index_score, op, &l.var(bound.id()), &dispatch));
            }
            (None, Operand::Literal(n)) => {
                let range = match cmp {
                    CmpOp::Lt => n.checked_sub(1).map(|m| format!("..{m}")),
                    _ => n.checked_add(1).map(|m| format!("{m}..")),
                };
                if let Some(range) = range {
                    self.emit(cmd::when(&index_score, &range, &dispatch));
                }
            }
            (None, Operand::Value(_)) => {}
        }
        self.emit(cmd::when(
            &l.sys(Register::LoopCont),
            "1",
            &cmd::call(&control_sig),
        ));
        self.rewind();

        let loop_index = index.clone();
        self.loop_main(main, &control_sig, |cx| body(cx, &loop_index));
        self.run_loop(&control_sig);
        self.close_scope();
    }

    /// Add `amount` to `score`, or subtract it when `backwards`. Amounts a
    /// `scoreboard players add` cannot carry go through `#const`.
    fn shift(&mut self, score: &Score, amount: i32, backwards: bool) {
        let delta = if backwards { amount.checked_neg() } else { Some(amount) };
        match delta.filter(|d| *d != i32::MIN) {
            Some(delta) => self.emit(cmd::add(score, delta)),
            None => {
                let constant = self.layout.sys(Register::Const);
                let op = if backwards { "-=" } else { "+=" };
                self.emit(cmd::set(&constant, amount));
                self.emit(cmd::operation(score, op, &constant));
            }
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Early exits
    // ══════════════════════════════════════════════════════════════════════

    #[track_caller]
    pub fn break_(&mut self) {
        let site = Site::caller();
        self.loop_exit(Register::LoopExit, ErrorCode::BREAK_OUTSIDE_LOOP, "break", &site);
    }

    #[track_caller]
    pub fn continue_(&mut self) {
        let site = Site::caller();
        self.loop_exit(
            Register::LoopCont,
            ErrorCode::CONTINUE_OUTSIDE_LOOP,
            "continue",
            &site,
        );
    }

    fn loop_exit(&mut self, flag: Register, code: ErrorCode, what: &str, site: &Site) {
        let Some((scope_depth, fields_depth)) = self.frame.innermost_loop() else {
            self.report(code, format!("{what} outside of a loop"), site);
            return;
        };
        let l = self.layout.clone();
        self.emit(cmd::set(&l.sys(flag), 1));
        self.store_open_fields_from(fields_depth);
        self.release_scopes_from(scope_depth);
        self.emit(cmd::ret(0));
    }
}
