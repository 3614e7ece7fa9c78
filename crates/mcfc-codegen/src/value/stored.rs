//! Lowering of storage-backed kinds (float, text, list, object and the
//! game handles).

use super::{Kind, Literal, Value};
use crate::cmd;
use crate::types::{Layout, Loc, MEM};

pub(super) fn assign_value(l: &Layout, v: &Value, other: &Value) -> Vec<String> {
    vec![cmd::set_from(&l.mem(v.id()), &l.mem(other.id()))]
}

pub(super) fn assign_literal(l: &Layout, v: &Value, literal: &Literal) -> Vec<String> {
    let snbt = match literal {
        Literal::Bool(b) => format!("{}b", u8::from(*b)),
        Literal::Int(n) => n.to_string(),
        Literal::Float(f) => f.to_snbt(),
        Literal::Text(text) if v.kind() == Kind::Block => format!("{{src:{}}}", cmd::quote(text)),
        Literal::Text(text) => cmd::quote(text),
        Literal::Snbt(raw) => raw.clone(),
    };
    vec![cmd::set_value(&l.mem(v.id()), &snbt)]
}

pub(super) fn move_out(l: &Layout, v: &Value, dest: &Loc) -> Vec<String> {
    vec![cmd::set_from(dest, &l.mem(v.id()))]
}

pub(super) fn collect_in(l: &Layout, v: &Value, src: &Loc) -> Vec<String> {
    vec![cmd::set_from(&l.mem(v.id()), src)]
}

pub(super) fn macro_construct(l: &Layout, v: &Value, slot: &str) -> Vec<String> {
    vec![format!(
        "$data modify {} set from storage {} {MEM}.$({slot})",
        l.mem(v.id()),
        l.storage
    )]
}

pub(super) fn release(l: &Layout, v: &Value) -> Vec<String> {
    vec![cmd::remove(&l.mem(v.id()))]
}
