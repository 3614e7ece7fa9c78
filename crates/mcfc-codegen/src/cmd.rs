//! Instruction text builders.
//!
//! Every command the engine emits is spelled here, so the generated
//! dialect is defined in one place.

use crate::types::{Loc, Score};

// ── Scoreboard ───────────────────────────────────────────────────────────────

pub fn add_objective(name: &str) -> String {
    format!("scoreboard objectives add {name} dummy")
}

pub fn set(score: &Score, value: i32) -> String {
    format!("scoreboard players set {score} {value}")
}

/// Add a constant; negative amounts become `remove`.
pub fn add(score: &Score, amount: i32) -> String {
    if amount < 0 {
        format!("scoreboard players remove {score} {}", amount.unsigned_abs())
    } else {
        format!("scoreboard players add {score} {amount}")
    }
}

pub fn reset(score: &Score) -> String {
    format!("scoreboard players reset {score}")
}

pub fn operation(target: &Score, op: &str, source: &Score) -> String {
    format!("scoreboard players operation {target} {op} {source}")
}

// ── Structured store ─────────────────────────────────────────────────────────

pub fn set_value(target: &Loc, snbt: &str) -> String {
    format!("data modify {target} set value {snbt}")
}

pub fn set_from(target: &Loc, source: &Loc) -> String {
    format!("data modify {target} set from {source}")
}

pub fn append_from(target: &Loc, source: &Loc) -> String {
    format!("data modify {target} append from {source}")
}

pub fn remove(target: &Loc) -> String {
    format!("data remove {target}")
}

/// Copy a score into storage as `ty` (`byte`, `int`).
pub fn store_score(target: &Loc, ty: &str, source: &Score) -> String {
    format!("execute store result {target} {ty} 1 run scoreboard players get {source}")
}

/// Copy a stored number into a score.
pub fn load_score(target: &Score, source: &Loc) -> String {
    format!("execute store result score {target} run data get {source}")
}

pub fn store_result(target: &Score, command: &str) -> String {
    format!("execute store result score {target} run {command}")
}

pub fn store_success(target: &Score, command: &str) -> String {
    format!("execute store success score {target} run {command}")
}

// ── Control ──────────────────────────────────────────────────────────────────

pub fn call(signature: &str) -> String {
    format!("function {signature}")
}

pub fn call_with(signature: &str, args: &Loc) -> String {
    format!("function {signature} with {args}")
}

/// Run `command` when `score` lies in `range` (`1`, `..4`, `2..`).
pub fn when(score: &Score, range: &str, command: &str) -> String {
    format!("execute if score {score} matches {range} run {command}")
}

/// Run `command` when `a <op> b` holds (`=`, `<`, `<=`, `>`, `>=`).
pub fn when_compare(a: &Score, op: &str, b: &Score, command: &str) -> String {
    format!("execute if score {a} {op} {b} run {command}")
}

pub fn ret(value: i32) -> String {
    format!("return {value}")
}

// ── Literals ─────────────────────────────────────────────────────────────────

/// Quote a string for SNBT and JSON text.
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score() -> Score {
        Score {
            holder: "v1".into(),
            objective: "t.var".into(),
        }
    }

    #[test]
    fn test_negative_add_becomes_remove() {
        assert_eq!(add(&score(), -3), "scoreboard players remove v1 t.var 3");
        assert_eq!(add(&score(), 3), "scoreboard players add v1 t.var 3");
    }

    #[test]
    fn test_store_score() {
        let loc = Loc {
            storage: "t:mcf".into(),
            path: "frame.m0".into(),
        };
        assert_eq!(
            store_score(&loc, "int", &score()),
            "execute store result storage t:mcf frame.m0 int 1 run scoreboard players get v1 t.var"
        );
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote(r#"a"b\c"#), r#""a\"b\\c""#);
    }
}
