//! Operations on values.
//!
//! Integer arithmetic maps directly onto scoreboard operations.
//! Conditions are 0/1 scores, so `and`/`or` are min/max. Float
//! arithmetic and comparison call into the `math.float` component.

use crate::cmd;
use crate::compiler::Compiler;
use crate::runtime::Helper;
use crate::types::{Loc, Register, CACHE, CALL, REGISTER};
use crate::value::{Capabilities, DecimalFloat, Element, Kind, Literal, Value};
use mcfc_types::{ErrorCode, Site};

/// Right-hand side of an operation: an integer literal or a value.
#[derive(Debug, Clone, Copy)]
pub enum Operand<'a> {
    Literal(i32),
    Value(&'a Value),
}

impl From<i32> for Operand<'_> {
    fn from(n: i32) -> Self {
        Operand::Literal(n)
    }
}

impl<'a> From<&'a Value> for Operand<'a> {
    fn from(value: &'a Value) -> Self {
        Operand::Value(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl ArithOp {
    fn operator(self) -> &'static str {
        match self {
            ArithOp::Add => "+=",
            ArithOp::Sub => "-=",
            ArithOp::Mul => "*=",
            ArithOp::Div => "/=",
            ArithOp::Rem => "%=",
        }
    }

    fn float_procedure(self) -> Option<&'static str> {
        match self {
            ArithOp::Add => Some("math.float.add"),
            ArithOp::Sub => Some("math.float.sub"),
            ArithOp::Mul => Some("math.float.mul"),
            ArithOp::Div => Some("math.float.div"),
            ArithOp::Rem => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    /// Scoreboard comparison operator; `Ne` is lowered as a negated `=`.
    fn operator(self) -> &'static str {
        match self {
            CmpOp::Eq | CmpOp::Ne => "=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }

    /// Range matching `x <op> n`, or `None` when no integer matches.
    fn literal_range(self, n: i32) -> Option<String> {
        match self {
            CmpOp::Eq | CmpOp::Ne => Some(n.to_string()),
            CmpOp::Lt => n.checked_sub(1).map(|m| format!("..{m}")),
            CmpOp::Le => Some(format!("..{n}")),
            CmpOp::Gt => n.checked_add(1).map(|m| format!("{m}..")),
            CmpOp::Ge => Some(format!("{n}..")),
        }
    }

    /// Range of the three-way indicator (-1, 0, 1) for which `op` holds.
    fn three_way_range(self) -> &'static str {
        match self {
            CmpOp::Eq | CmpOp::Ne => "0",
            CmpOp::Lt => "-1",
            CmpOp::Le => "..0",
            CmpOp::Gt => "1",
            CmpOp::Ge => "0..",
        }
    }
}

impl Compiler {
    // ══════════════════════════════════════════════════════════════════════
    // Arithmetic
    // ══════════════════════════════════════════════════════════════════════

    /// `lhs <op> rhs` as a fresh value.
    #[track_caller]
    pub fn arith<'a>(&mut self, op: ArithOp, lhs: &Value, rhs: impl Into<Operand<'a>>) -> Value {
        self.arith_at(op, lhs, rhs.into(), &Site::caller())
    }

    #[track_caller]
    pub fn add<'a>(&mut self, lhs: &Value, rhs: impl Into<Operand<'a>>) -> Value {
        self.arith_at(ArithOp::Add, lhs, rhs.into(), &Site::caller())
    }

    #[track_caller]
    pub fn sub<'a>(&mut self, lhs: &Value, rhs: impl Into<Operand<'a>>) -> Value {
        self.arith_at(ArithOp::Sub, lhs, rhs.into(), &Site::caller())
    }

    #[track_caller]
    pub fn mul<'a>(&mut self, lhs: &Value, rhs: impl Into<Operand<'a>>) -> Value {
        self.arith_at(ArithOp::Mul, lhs, rhs.into(), &Site::caller())
    }

    #[track_caller]
    pub fn div<'a>(&mut self, lhs: &Value, rhs: impl Into<Operand<'a>>) -> Value {
        self.arith_at(ArithOp::Div, lhs, rhs.into(), &Site::caller())
    }

    #[track_caller]
    pub fn rem<'a>(&mut self, lhs: &Value, rhs: impl Into<Operand<'a>>) -> Value {
        self.arith_at(ArithOp::Rem, lhs, rhs.into(), &Site::caller())
    }

    /// `target <op>= rhs` in place.
    #[track_caller]
    pub fn arith_assign<'a>(&mut self, op: ArithOp, target: &Value, rhs: impl Into<Operand<'a>>) {
        let site = Site::caller();
        if !self.check_live(target, &site) {
            return;
        }
        match target.kind() {
            Kind::Integer => self.apply_int(op, target, rhs.into(), &site),
            Kind::Float => {
                if self.float_binary(op, target, rhs.into(), &site) {
                    let l = self.layout.clone();
                    self.emit(cmd::set_from(&l.mem(target.id()), &l.at(REGISTER)));
                }
            }
            other => self.unsupported("arithmetic", other, &site),
        }
    }

    #[track_caller]
    pub fn add_assign<'a>(&mut self, target: &Value, rhs: impl Into<Operand<'a>>) {
        self.arith_assign(ArithOp::Add, target, rhs)
    }

    #[track_caller]
    pub fn sub_assign<'a>(&mut self, target: &Value, rhs: impl Into<Operand<'a>>) {
        self.arith_assign(ArithOp::Sub, target, rhs)
    }

    #[track_caller]
    pub fn mul_assign<'a>(&mut self, target: &Value, rhs: impl Into<Operand<'a>>) {
        self.arith_assign(ArithOp::Mul, target, rhs)
    }

    #[track_caller]
    pub fn div_assign<'a>(&mut self, target: &Value, rhs: impl Into<Operand<'a>>) {
        self.arith_assign(ArithOp::Div, target, rhs)
    }

    #[track_caller]
    pub fn rem_assign<'a>(&mut self, target: &Value, rhs: impl Into<Operand<'a>>) {
        self.arith_assign(ArithOp::Rem, target, rhs)
    }

    fn arith_at(&mut self, op: ArithOp, lhs: &Value, rhs: Operand<'_>, site: &Site) -> Value {
        if !self.check_live(lhs, site) {
            return self.placeholder(lhs.kind());
        }
        match lhs.kind() {
            Kind::Integer => {
                let result = self.alloc(Kind::Integer);
                let lines = result.assign_value(&self.layout, lhs);
                self.emit_all(lines);
                self.apply_int(op, &result, rhs, site);
                result
            }
            Kind::Float => {
                let result = self.alloc(Kind::Float);
                if self.float_binary(op, lhs, rhs, site) {
                    let l = self.layout.clone();
                    self.emit(cmd::set_from(&l.mem(result.id()), &l.at(REGISTER)));
                }
                result
            }
            other => {
                self.unsupported("arithmetic", other, site);
                self.placeholder(other)
            }
        }
    }

    fn apply_int(&mut self, op: ArithOp, target: &Value, rhs: Operand<'_>, site: &Site) {
        let l = self.layout.clone();
        let score = l.var(target.id());
        match rhs {
            Operand::Literal(n) => {
                if n == 0 && matches!(op, ArithOp::Div | ArithOp::Rem) {
                    self.warn(
                        ErrorCode::INVALID_LITERAL,
                        "division by zero leaves the value unchanged",
                        site,
                    );
                }
                match op {
                    ArithOp::Add if n != i32::MIN => self.emit(cmd::add(&score, n)),
                    ArithOp::Sub if n != i32::MIN => self.emit(cmd::add(&score, -n)),
                    _ => {
                        let constant = l.sys(Register::Const);
                        self.emit(cmd::set(&constant, n));
                        self.emit(cmd::operation(&score, op.operator(), &constant));
                    }
                }
            }
            Operand::Value(v) => {
                if self.check_live(v, site) && self.check_kind(v, Kind::Integer, site) {
                    self.emit(cmd::operation(&score, op.operator(), &l.var(v.id())));
                }
            }
        }
    }

    /// Negated integer.
    #[track_caller]
    pub fn neg(&mut self, value: &Value) -> Value {
        let site = Site::caller();
        if !self.check_live(value, &site) || !self.check_kind(value, Kind::Integer, &site) {
            return self.placeholder(Kind::Integer);
        }
        let l = self.layout.clone();
        let result = self.alloc(Kind::Integer);
        self.emit(cmd::set(&l.var(result.id()), 0));
        self.emit(cmd::operation(&l.var(result.id()), "-=", &l.var(value.id())));
        result
    }

    /// Absolute value of an integer.
    #[track_caller]
    pub fn abs(&mut self, value: &Value) -> Value {
        let site = Site::caller();
        if !self.check_live(value, &site) || !self.check_kind(value, Kind::Integer, &site) {
            return self.placeholder(Kind::Integer);
        }
        let l = self.layout.clone();
        let result = self.alloc(Kind::Integer);
        let score = l.var(result.id());
        let constant = l.sys(Register::Const);
        self.emit(cmd::operation(&score, "=", &l.var(value.id())));
        self.emit(cmd::set(&constant, -1));
        self.emit(cmd::when(
            &score,
            "..-1",
            &cmd::operation(&score, "*=", &constant),
        ));
        result
    }

    // ══════════════════════════════════════════════════════════════════════
    // Comparison
    // ══════════════════════════════════════════════════════════════════════

    /// `lhs <op> rhs` as a condition.
    #[track_caller]
    pub fn compare<'a>(&mut self, op: CmpOp, lhs: &Value, rhs: impl Into<Operand<'a>>) -> Value {
        self.compare_at(op, lhs, rhs.into(), &Site::caller())
    }

    #[track_caller]
    pub fn eq<'a>(&mut self, lhs: &Value, rhs: impl Into<Operand<'a>>) -> Value {
        self.compare_at(CmpOp::Eq, lhs, rhs.into(), &Site::caller())
    }

    #[track_caller]
    pub fn ne<'a>(&mut self, lhs: &Value, rhs: impl Into<Operand<'a>>) -> Value {
        self.compare_at(CmpOp::Ne, lhs, rhs.into(), &Site::caller())
    }

    #[track_caller]
    pub fn lt<'a>(&mut self, lhs: &Value, rhs: impl Into<Operand<'a>>) -> Value {
        self.compare_at(CmpOp::Lt, lhs, rhs.into(), &Site::caller())
    }

    #[track_caller]
    pub fn le<'a>(&mut self, lhs: &Value, rhs: impl Into<Operand<'a>>) -> Value {
        self.compare_at(CmpOp::Le, lhs, rhs.into(), &Site::caller())
    }

    #[track_caller]
    pub fn gt<'a>(&mut self, lhs: &Value, rhs: impl Into<Operand<'a>>) -> Value {
        self.compare_at(CmpOp::Gt, lhs, rhs.into(), &Site::caller())
    }

    #[track_caller]
    pub fn ge<'a>(&mut self, lhs: &Value, rhs: impl Into<Operand<'a>>) -> Value {
        self.compare_at(CmpOp::Ge, lhs, rhs.into(), &Site::caller())
    }

    fn compare_at(&mut self, op: CmpOp, lhs: &Value, rhs: Operand<'_>, site: &Site) -> Value {
        if !self.check_live(lhs, site) {
            return self.placeholder(Kind::Condition);
        }
        if let Operand::Value(v) = rhs {
            if !self.check_live(v, site) || !self.check_kind(v, lhs.kind(), site) {
                return self.placeholder(Kind::Condition);
            }
        }
        match lhs.kind() {
            Kind::Integer | Kind::Condition => self.compare_scores(op, lhs, rhs),
            Kind::Float => self.compare_floats(op, lhs, rhs, site),
            kind => match (op, rhs) {
                (CmpOp::Eq | CmpOp::Ne, Operand::Value(v)) => self.compare_stored(op, lhs, v),
                _ => {
                    self.unsupported("ordering comparison", kind, site);
                    self.placeholder(Kind::Condition)
                }
            },
        }
    }

    fn compare_scores(&mut self, op: CmpOp, lhs: &Value, rhs: Operand<'_>) -> Value {
        let l = self.layout.clone();
        let result = self.alloc(Kind::Condition);
        let out = l.var(result.id());
        let (initial, hit) = if op == CmpOp::Ne { (1, 0) } else { (0, 1) };
        self.emit(cmd::set(&out, initial));
        let lhs_score = l.var(lhs.id());
        match rhs {
            Operand::Literal(n) => {
                if let Some(range) = op.literal_range(n) {
                    self.emit(cmd::when(&lhs_score, &range, &cmd::set(&out, hit)));
                }
            }
            Operand::Value(v) => self.emit(cmd::when_compare(
                &lhs_score,
                op.operator(),
                &l.var(v.id()),
                &cmd::set(&out, hit),
            )),
        }
        result
    }

    /// Equality of storage-backed values through a scratch copy: writing
    /// `rhs` over a copy of `lhs` succeeds only when they differ.
    fn compare_stored(&mut self, op: CmpOp, lhs: &Value, rhs: &Value) -> Value {
        let l = self.layout.clone();
        let scratch = l.at(CACHE).child("cmp");
        let general = l.sys(Register::General);
        let result = self.alloc(Kind::Condition);
        let out = l.var(result.id());
        self.emit(cmd::set_from(&scratch, &l.mem(lhs.id())));
        self.emit(cmd::store_success(&general, &cmd::set_from(&scratch, &l.mem(rhs.id()))));
        self.emit(cmd::set(&out, 0));
        let differs = if op == CmpOp::Eq { "0" } else { "1" };
        self.emit(cmd::when(&general, differs, &cmd::set(&out, 1)));
        result
    }

    // ══════════════════════════════════════════════════════════════════════
    // Conditions
    // ══════════════════════════════════════════════════════════════════════

    fn check_condition(&mut self, value: &Value, site: &Site) -> bool {
        if !self.check_live(value, site) {
            return false;
        }
        if value.kind() != Kind::Condition {
            self.report(
                ErrorCode::NOT_A_CONDITION,
                format!("expected a condition, found {}", value.kind().name()),
                site,
            );
            return false;
        }
        true
    }

    #[track_caller]
    pub fn and(&mut self, a: &Value, b: &Value) -> Value {
        self.logic("<", a, b, &Site::caller())
    }

    #[track_caller]
    pub fn or(&mut self, a: &Value, b: &Value) -> Value {
        self.logic(">", a, b, &Site::caller())
    }

    fn logic(&mut self, operator: &str, a: &Value, b: &Value, site: &Site) -> Value {
        if !self.check_condition(a, site) || !self.check_condition(b, site) {
            return self.placeholder(Kind::Condition);
        }
        let l = self.layout.clone();
        let result = self.alloc(Kind::Condition);
        let out = l.var(result.id());
        self.emit(cmd::operation(&out, "=", &l.var(a.id())));
        self.emit(cmd::operation(&out, operator, &l.var(b.id())));
        result
    }

    #[track_caller]
    pub fn not(&mut self, a: &Value) -> Value {
        let site = Site::caller();
        if !self.check_condition(a, &site) {
            return self.placeholder(Kind::Condition);
        }
        let l = self.layout.clone();
        let result = self.alloc(Kind::Condition);
        let out = l.var(result.id());
        self.emit(cmd::set(&out, 1));
        self.emit(cmd::operation(&out, "-=", &l.var(a.id())));
        result
    }

    // ══════════════════════════════════════════════════════════════════════
    // Text and lists
    // ══════════════════════════════════════════════════════════════════════

    /// Concatenation of two texts. Texts containing `"` cannot be
    /// concatenated by the macro helper.
    #[track_caller]
    pub fn concat(&mut self, a: &Value, b: &Value) -> Value {
        let site = Site::caller();
        let ok = self.check_live(a, &site)
            && self.check_live(b, &site)
            && self.check_kind(a, Kind::Text, &site)
            && self.check_kind(b, Kind::Text, &site);
        if !ok {
            return self.placeholder(Kind::Text);
        }
        let l = self.layout.clone();
        let call = l.at(CALL);
        self.emit(cmd::set_from(&call.child("a"), &l.mem(a.id())));
        self.emit(cmd::set_from(&call.child("b"), &l.mem(b.id())));
        let helper = self.helper(Helper::Concat);
        self.emit(cmd::call_with(&helper, &call));
        let result = self.alloc(Kind::Text);
        self.emit(cmd::set_from(&l.mem(result.id()), &l.at(REGISTER)));
        result
    }

    /// Length of a text or list.
    #[track_caller]
    pub fn len(&mut self, value: &Value) -> Value {
        let site = Site::caller();
        if !self.check_live(value, &site) {
            return self.placeholder(Kind::Integer);
        }
        if !matches!(value.kind(), Kind::Text | Kind::List(_)) {
            self.unsupported("length", value.kind(), &site);
            return self.placeholder(Kind::Integer);
        }
        let l = self.layout.clone();
        let result = self.alloc(Kind::Integer);
        self.emit(cmd::load_score(&l.var(result.id()), &l.mem(value.id())));
        result
    }

    fn list_element(&mut self, list: &Value, site: &Site) -> Option<Element> {
        if !self.check_live(list, site) {
            return None;
        }
        match list.kind() {
            Kind::List(element) => Some(element),
            other => {
                self.report(
                    ErrorCode::TYPE_MISMATCH,
                    format!("expected a list, found {}", other.name()),
                    site,
                );
                None
            }
        }
    }

    #[track_caller]
    pub fn list_push(&mut self, list: &Value, item: &Value) {
        let site = Site::caller();
        let Some(element) = self.list_element(list, &site) else {
            return;
        };
        if !self.check_live(item, &site) || !self.check_kind(item, element.into(), &site) {
            return;
        }
        let l = self.layout.clone();
        let scratch = l.at(CACHE).child("elem");
        let lines = item.move_out(&l, &scratch);
        self.emit_all(lines);
        self.emit(cmd::append_from(&l.mem(list.id()), &scratch));
    }

    /// Element at `index`; negative literals count from the end.
    #[track_caller]
    pub fn list_get<'a>(&mut self, list: &Value, index: impl Into<Operand<'a>>) -> Value {
        let site = Site::caller();
        self.list_get_at(list, index.into(), &site)
    }

    fn list_get_at(&mut self, list: &Value, index: Operand<'_>, site: &Site) -> Value {
        let Some(element) = self.list_element(list, site) else {
            return self.placeholder(Kind::Integer);
        };
        let Some(src) = self.element_loc(list, index, site) else {
            return self.placeholder(element.into());
        };
        let result = self.alloc(element.into());
        let lines = result.collect_in(&self.layout, &src);
        self.emit_all(lines);
        result
    }

    /// Where element `index` of `list` can be read. Dynamic indices go
    /// through the list helper, which copies the element to `register`.
    fn element_loc(&mut self, list: &Value, index: Operand<'_>, site: &Site) -> Option<Loc> {
        let l = self.layout.clone();
        match index {
            Operand::Literal(i) => Some(l.mem(list.id()).index(i)),
            Operand::Value(i) => {
                if !self.check_live(i, site) || !self.check_kind(i, Kind::Integer, site) {
                    return None;
                }
                self.export_index(list, i);
                let helper = self.helper(Helper::ListGet);
                self.emit(cmd::call_with(&helper, &l.at(CALL)));
                Some(l.at(REGISTER))
            }
        }
    }

    fn export_index(&mut self, list: &Value, index: &Value) {
        let l = self.layout.clone();
        let call = l.at(CALL);
        self.emit(cmd::set_value(&call.child("list"), &cmd::quote(list.id().as_str())));
        self.emit(cmd::store_score(&call.child("index"), "int", &l.var(index.id())));
    }

    #[track_caller]
    pub fn list_set<'a>(&mut self, list: &Value, index: impl Into<Operand<'a>>, item: &Value) {
        let site = Site::caller();
        let Some(element) = self.list_element(list, &site) else {
            return;
        };
        if !self.check_live(item, &site) || !self.check_kind(item, element.into(), &site) {
            return;
        }
        let l = self.layout.clone();
        match index.into() {
            Operand::Literal(i) => {
                let lines = item.move_out(&l, &l.mem(list.id()).index(i));
                self.emit_all(lines);
            }
            Operand::Value(i) => {
                if !self.check_live(i, &site) || !self.check_kind(i, Kind::Integer, &site) {
                    return;
                }
                let lines = item.move_out(&l, &l.at(CACHE).child("elem"));
                self.emit_all(lines);
                self.export_index(list, i);
                let helper = self.helper(Helper::ListSet);
                self.emit(cmd::call_with(&helper, &l.at(CALL)));
            }
        }
    }

    /// Remove and return the last element.
    #[track_caller]
    pub fn list_pop(&mut self, list: &Value) -> Value {
        let site = Site::caller();
        let item = self.list_get_at(list, Operand::Literal(-1), &site);
        if matches!(list.kind(), Kind::List(_)) && self.frame.context.contains_key(list.id()) {
            let l = self.layout.clone();
            self.emit(cmd::remove(&l.mem(list.id()).index(-1)));
        }
        item
    }

    // ══════════════════════════════════════════════════════════════════════
    // Floats
    // ══════════════════════════════════════════════════════════════════════

    /// Literal float written into an existing float value.
    #[track_caller]
    pub fn set_float(&mut self, target: &Value, literal: &str) {
        let site = Site::caller();
        match DecimalFloat::parse(literal) {
            Ok(f) => {
                if self.check_live(target, &site) && self.check_kind(target, Kind::Float, &site) {
                    let lines = target.assign_literal(&self.layout, &Literal::Float(f));
                    self.emit_all(lines);
                }
            }
            Err(err) => self.report(ErrorCode::INVALID_LITERAL, err.to_string(), &site),
        }
    }

    /// Float equal to an integer value.
    #[track_caller]
    pub fn to_float(&mut self, value: &Value) -> Value {
        let site = Site::caller();
        if !self.check_live(value, &site) || !self.check_kind(value, Kind::Integer, &site) {
            return self.placeholder(Kind::Float);
        }
        let Some(signature) = self.library("math.float.from_int", &site) else {
            return self.placeholder(Kind::Float);
        };
        let l = self.layout.clone();
        self.emit(cmd::store_score(&l.at(CALL).child("x"), "int", &l.var(value.id())));
        self.emit(cmd::call(&signature));
        let result = self.alloc(Kind::Float);
        self.emit(cmd::set_from(&l.mem(result.id()), &l.at(REGISTER)));
        result
    }

    /// Resolve a float operand, materializing integer literals.
    fn float_operand<'v>(&mut self, rhs: Operand<'v>, site: &Site) -> Option<FloatOperand<'v>> {
        match rhs {
            Operand::Literal(n) => Some(FloatOperand::Literal(DecimalFloat::from_i32(n))),
            Operand::Value(v) => {
                (self.check_live(v, site) && self.check_kind(v, Kind::Float, site))
                    .then_some(FloatOperand::Value(v))
            }
        }
    }

    /// Load `call.a`/`call.b` and call a float routine. The result is
    /// left in `register` (or `#general` for comparisons).
    fn float_call(&mut self, procedure: &str, lhs: &Value, rhs: Operand<'_>, site: &Site) -> bool {
        let Some(rhs) = self.float_operand(rhs, site) else {
            return false;
        };
        let Some(signature) = self.library(procedure, site) else {
            return false;
        };
        let l = self.layout.clone();
        let call = l.at(CALL);
        self.emit(cmd::set_from(&call.child("a"), &l.mem(lhs.id())));
        match rhs {
            FloatOperand::Literal(f) => self.emit(cmd::set_value(&call.child("b"), &f.to_snbt())),
            FloatOperand::Value(v) => self.emit(cmd::set_from(&call.child("b"), &l.mem(v.id()))),
        }
        self.emit(cmd::call(&signature));
        true
    }

    fn float_binary(&mut self, op: ArithOp, lhs: &Value, rhs: Operand<'_>, site: &Site) -> bool {
        let Some(procedure) = op.float_procedure() else {
            self.unsupported("remainder", Kind::Float, site);
            return false;
        };
        self.float_call(procedure, lhs, rhs, site)
    }

    fn compare_floats(&mut self, op: CmpOp, lhs: &Value, rhs: Operand<'_>, site: &Site) -> Value {
        if !self.float_call("math.float.compare", lhs, rhs, site) {
            return self.placeholder(Kind::Condition);
        }
        let l = self.layout.clone();
        let result = self.alloc(Kind::Condition);
        let out = l.var(result.id());
        let general = l.sys(Register::General);
        let (initial, hit) = if op == CmpOp::Ne { (1, 0) } else { (0, 1) };
        self.emit(cmd::set(&out, initial));
        self.emit(cmd::when(&general, op.three_way_range(), &cmd::set(&out, hit)));
        result
    }

    /// Write a float as a plain double: `<sign><m>e<e-7>d` through the
    /// float helper.
    pub(crate) fn extract_float(&mut self, value: &Value, dest: &Loc) {
        let l = self.layout.clone();
        let call = l.at(CALL);
        let general = l.sys(Register::General);
        let mem = l.mem(value.id());
        self.emit(cmd::set_from(&call.child("m"), &mem.child("m")));
        self.emit(cmd::load_score(&general, &mem.child("e")));
        self.emit(cmd::add(&general, -7));
        self.emit(cmd::store_score(&call.child("p"), "int", &general));
        self.emit(cmd::set_value(&call.child("sign"), &cmd::quote("")));
        self.emit(cmd::load_score(&general, &mem.child("s")));
        self.emit(cmd::when(
            &general,
            "1",
            &cmd::set_value(&call.child("sign"), &cmd::quote("-")),
        ));
        let helper = self.helper(Helper::FloatExtract);
        self.emit(cmd::call_with(&helper, &call));
        self.emit(cmd::set_from(dest, &l.at(REGISTER)));
    }

    /// Build a float from a plain number stored at `src`.
    pub(crate) fn construct_float(&mut self, src: &Loc, site: &Site) -> Value {
        let Some(signature) = self.library("math.float.construct", site) else {
            return self.placeholder(Kind::Float);
        };
        let l = self.layout.clone();
        self.emit(cmd::set_from(&l.at(CALL).child("x"), src));
        self.emit(cmd::call(&signature));
        let result = self.alloc(Kind::Float);
        self.emit(cmd::set_from(&l.mem(result.id()), &l.at(REGISTER)));
        result
    }

    pub(crate) fn unsupported(&mut self, what: &str, kind: Kind, site: &Site) {
        self.report(
            ErrorCode::UNSUPPORTED_OPERATION,
            format!("{what} is not supported on {} values", kind.name()),
            site,
        );
    }
}

enum FloatOperand<'a> {
    Literal(DecimalFloat),
    Value(&'a Value),
}
