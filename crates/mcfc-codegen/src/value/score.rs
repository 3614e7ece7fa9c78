//! Lowering of scoreboard-backed kinds (integer, condition).

use super::{Literal, Value};
use crate::cmd;
use crate::types::{Layout, Loc};

pub(super) fn assign_value(l: &Layout, v: &Value, other: &Value) -> Vec<String> {
    vec![cmd::operation(&l.var(v.id()), "=", &l.var(other.id()))]
}

pub(super) fn assign_literal(l: &Layout, v: &Value, literal: &Literal) -> Vec<String> {
    let n = match literal {
        Literal::Bool(b) => i32::from(*b),
        Literal::Int(n) => *n,
        _ => 0,
    };
    vec![cmd::set(&l.var(v.id()), n)]
}

pub(super) fn move_out(l: &Layout, v: &Value, dest: &Loc) -> Vec<String> {
    vec![cmd::store_score(dest, v.kind().store_type(), &l.var(v.id()))]
}

pub(super) fn collect_in(l: &Layout, v: &Value, src: &Loc) -> Vec<String> {
    vec![cmd::load_score(&l.var(v.id()), src)]
}

pub(super) fn macro_construct(l: &Layout, v: &Value, slot: &str) -> Vec<String> {
    vec![format!(
        "$scoreboard players operation {} = $({slot}) {}",
        l.var(v.id()),
        l.var_objective
    )]
}

pub(super) fn release(l: &Layout, v: &Value) -> Vec<String> {
    vec![cmd::reset(&l.var(v.id()))]
}
