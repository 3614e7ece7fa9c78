//! Command interpreter.
//!
//! Covers the command subset generated code and component libraries use:
//! `scoreboard`, `data`, `execute`, `function`, `return`, `say`, `tellraw`.

use crate::error::{VmError, VmResult};
use crate::machine::{Machine, Outcome, Step};
use crate::nbt::Nbt;
use crate::path::NbtPath;

// ══════════════════════════════════════════════════════════════════════════════
// Tokenizer
// ══════════════════════════════════════════════════════════════════════════════

struct Words<'a> {
    line: &'a str,
    rest: &'a str,
}

impl<'a> Words<'a> {
    fn new(line: &'a str) -> Self {
        Self {
            line,
            rest: line.trim(),
        }
    }

    fn error(&self, reason: impl Into<String>) -> VmError {
        VmError::Parse {
            line: self.line.to_string(),
            reason: reason.into(),
        }
    }

    fn next_opt(&mut self) -> Option<&'a str> {
        let trimmed = self.rest.trim_start();
        if trimmed.is_empty() {
            self.rest = trimmed;
            return None;
        }
        let end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
        let (word, rest) = trimmed.split_at(end);
        self.rest = rest;
        Some(word)
    }

    fn next(&mut self) -> VmResult<&'a str> {
        self.next_opt().ok_or_else(|| self.error("unexpected end of command"))
    }

    fn expect(&mut self, word: &str) -> VmResult<()> {
        let got = self.next()?;
        if got == word {
            Ok(())
        } else {
            Err(self.error(format!("expected '{word}', found '{got}'")))
        }
    }

    fn int(&mut self) -> VmResult<i32> {
        let word = self.next()?;
        word.parse()
            .map_err(|_| self.error(format!("expected an integer, found '{word}'")))
    }

    fn path(&mut self) -> VmResult<NbtPath> {
        NbtPath::parse(self.next()?)
    }

    /// Everything left on the line.
    fn rest(&mut self) -> &'a str {
        let rest = self.rest.trim();
        self.rest = "";
        rest
    }

    fn is_empty(&self) -> bool {
        self.rest.trim().is_empty()
    }
}

/// `N`, `N..`, `..N` or `N..M`.
fn in_range(value: i32, range: &str) -> Option<bool> {
    match range.split_once("..") {
        None => Some(value == range.parse::<i32>().ok()?),
        Some((lo, hi)) => {
            let lo = if lo.is_empty() { i32::MIN } else { lo.parse().ok()? };
            let hi = if hi.is_empty() { i32::MAX } else { hi.parse().ok()? };
            Some(lo <= value && value <= hi)
        }
    }
}

fn floor_div(a: i32, b: i32) -> i32 {
    let q = a.wrapping_div(b);
    if a % b != 0 && ((a < 0) != (b < 0)) {
        q - 1
    } else {
        q
    }
}

fn floor_mod(a: i32, b: i32) -> i32 {
    a.wrapping_sub(floor_div(a, b).wrapping_mul(b))
}

/// Destination of an `execute store` clause.
enum Store {
    Score { holder: String, objective: String },
    Storage { id: String, path: NbtPath, kind: String, scale: f64 },
}

struct StoreClause {
    success: bool,
    target: Store,
}

// ══════════════════════════════════════════════════════════════════════════════
// Dispatch
// ══════════════════════════════════════════════════════════════════════════════

impl Machine {
    pub(crate) fn execute(&mut self, command: &str) -> VmResult<Step> {
        let mut words = Words::new(command);
        let head = words.next()?;
        let outcome = match head {
            "scoreboard" => self.scoreboard(&mut words)?,
            "data" => self.data_command(&mut words)?,
            "execute" => return self.execute_chain(&mut words),
            "function" => self.function(&mut words)?,
            "return" => return self.return_command(&mut words),
            "say" => {
                self.output.push(words.rest().to_string());
                Outcome::ok(1)
            }
            "tellraw" => {
                words.next()?;
                let text = self.render_text(words.rest())?;
                self.output.push(text);
                Outcome::ok(1)
            }
            "tag" => {
                words.rest();
                Outcome::ok(1)
            }
            _ => return Err(VmError::UnsupportedCommand(command.to_string())),
        };
        Ok(Step::Next(outcome))
    }

    // ── scoreboard ───────────────────────────────────────────────────────

    fn scoreboard(&mut self, words: &mut Words<'_>) -> VmResult<Outcome> {
        match words.next()? {
            "objectives" => {
                words.expect("add")?;
                let name = words.next()?;
                words.rest();
                Ok(Outcome::flag(self.scores.add_objective(name)))
            }
            "players" => self.players(words),
            other => Err(words.error(format!("unknown scoreboard action '{other}'"))),
        }
    }

    fn players(&mut self, words: &mut Words<'_>) -> VmResult<Outcome> {
        let action = words.next()?;
        let holder = words.next()?;
        if action == "reset" {
            let removed = match words.next_opt() {
                Some(objective) => self.scores.reset(holder, objective),
                None => self.scores.reset_all(holder),
            };
            return Ok(Outcome::flag(removed));
        }
        let objective = words.next()?;
        match action {
            "set" | "add" | "remove" => {
                let amount = words.int()?;
                let current = self.scores.get(holder, objective).unwrap_or(0);
                let value = match action {
                    "set" => amount,
                    "add" => current.wrapping_add(amount),
                    _ => current.wrapping_sub(amount),
                };
                Ok(if self.scores.set(holder, objective, value) {
                    Outcome::ok(value)
                } else {
                    Outcome::fail()
                })
            }
            "get" => Ok(match self.scores.get(holder, objective) {
                Some(value) => Outcome::ok(value),
                None => Outcome::fail(),
            }),
            "operation" => {
                let op = words.next()?;
                let source = words.next()?;
                let source_objective = words.next()?;
                self.operation(holder, objective, op, source, source_objective, words)
            }
            other => Err(words.error(format!("unknown players action '{other}'"))),
        }
    }

    fn operation(
        &mut self,
        holder: &str,
        objective: &str,
        op: &str,
        source: &str,
        source_objective: &str,
        words: &Words<'_>,
    ) -> VmResult<Outcome> {
        let Some(b) = self.scores.get(source, source_objective) else {
            return Ok(Outcome::fail());
        };
        if !self.scores.has_objective(objective) {
            return Ok(Outcome::fail());
        }
        let current = self.scores.get(holder, objective);
        let a = current.unwrap_or(0);
        let value = match op {
            "=" => b,
            "+=" => a.wrapping_add(b),
            "-=" => a.wrapping_sub(b),
            "*=" => a.wrapping_mul(b),
            "/=" if b == 0 => return Ok(Outcome::fail()),
            "/=" => floor_div(a, b),
            "%=" if b == 0 => return Ok(Outcome::fail()),
            "%=" => floor_mod(a, b),
            "<" => a.min(b),
            ">" => a.max(b),
            "><" => {
                self.scores.set(source, source_objective, a);
                b
            }
            other => return Err(words.error(format!("unknown operation '{other}'"))),
        };
        self.scores.set(holder, objective, value);
        Ok(Outcome::ok(value))
    }

    // ── data ─────────────────────────────────────────────────────────────

    fn storage_root(&mut self, id: &str) -> &mut Nbt {
        self.storages.entry(id.to_string()).or_insert_with(Nbt::compound)
    }

    fn read(&self, id: &str, path: &NbtPath) -> Option<Nbt> {
        path.get(self.storages.get(id)?).cloned()
    }

    fn data_command(&mut self, words: &mut Words<'_>) -> VmResult<Outcome> {
        match words.next()? {
            "get" => {
                words.expect("storage")?;
                let id = words.next()?;
                let path = words.path()?;
                let scale = match words.next_opt() {
                    Some(word) => word
                        .parse::<f64>()
                        .map_err(|_| words.error("bad scale"))?,
                    None => 1.0,
                };
                Ok(match self.read(id, &path) {
                    Some(value) => Outcome::ok((value.magnitude() * scale).floor() as i32),
                    None => Outcome::fail(),
                })
            }
            "remove" => {
                words.expect("storage")?;
                let id = words.next()?;
                let path = words.path()?;
                Ok(Outcome::flag(path.remove(self.storage_root(id))))
            }
            "modify" => self.modify(words),
            other => Err(words.error(format!("unknown data action '{other}'"))),
        }
    }

    /// Source of a `data modify` command.
    fn modify_source(&self, words: &mut Words<'_>) -> VmResult<Option<Nbt>> {
        match words.next()? {
            "value" => Nbt::parse(words.rest()).map(Some),
            "from" => {
                words.expect("storage")?;
                let id = words.next()?;
                let path = words.path()?;
                Ok(self.read(id, &path))
            }
            "string" => {
                words.expect("storage")?;
                let id = words.next()?;
                let path = words.path()?;
                let start = words.next_opt().map(str::parse::<i32>).transpose();
                let end = words.next_opt().map(str::parse::<i32>).transpose();
                let (Ok(start), Ok(end)) = (start, end) else {
                    return Err(words.error("bad string bounds"));
                };
                let Some(text) = self.read(id, &path).map(|v| v.macro_text()) else {
                    return Ok(None);
                };
                let chars: Vec<char> = text.chars().collect();
                let len = chars.len() as i32;
                let clamp = |i: i32| (if i < 0 { len + i } else { i }).clamp(0, len) as usize;
                let from = clamp(start.unwrap_or(0));
                let to = clamp(end.unwrap_or(len)).max(from);
                Ok(Some(Nbt::String(chars[from..to].iter().collect())))
            }
            other => Err(words.error(format!("unknown data source '{other}'"))),
        }
    }

    fn modify(&mut self, words: &mut Words<'_>) -> VmResult<Outcome> {
        words.expect("storage")?;
        let id = words.next()?;
        let path = words.path()?;
        let action = words.next()?;
        let index = if action == "insert" {
            Some(words.int()?)
        } else {
            None
        };
        let Some(value) = self.modify_source(words)? else {
            return Ok(Outcome::fail());
        };
        let root = self.storage_root(id);
        let changed = match action {
            "set" => path.set(root, value),
            "append" | "prepend" | "insert" => path.list_mut(root).map(|items| {
                let at = match (action, index) {
                    ("append", _) => items.len(),
                    ("prepend", _) => 0,
                    (_, Some(i)) if i < 0 => (items.len() as i32 + i + 1).max(0) as usize,
                    (_, Some(i)) => (i as usize).min(items.len()),
                    _ => items.len(),
                };
                items.insert(at, value);
                true
            }),
            "merge" => match value {
                Nbt::Compound(entries) => path.compound_mut(root).map(|map| {
                    let mut changed = false;
                    for (key, value) in entries {
                        changed |= map.get(&key) != Some(&value);
                        map.insert(key, value);
                    }
                    changed
                }),
                _ => None,
            },
            other => return Err(words.error(format!("unknown modify action '{other}'"))),
        };
        Ok(Outcome::flag(changed.unwrap_or(false)))
    }

    // ── execute ──────────────────────────────────────────────────────────

    fn execute_chain(&mut self, words: &mut Words<'_>) -> VmResult<Step> {
        let mut stores: Vec<StoreClause> = Vec::new();
        loop {
            let Some(word) = words.next_opt() else {
                let outcome = Outcome::ok(1);
                self.apply_stores(&stores, outcome);
                return Ok(Step::Next(outcome));
            };
            match word {
                "if" | "unless" => {
                    let holds = self.condition(words)?;
                    if holds != (word == "if") {
                        let outcome = Outcome::fail();
                        self.apply_stores(&stores, outcome);
                        return Ok(Step::Next(outcome));
                    }
                }
                "store" => {
                    let success = match words.next()? {
                        "result" => false,
                        "success" => true,
                        other => return Err(words.error(format!("unknown store mode '{other}'"))),
                    };
                    let target = match words.next()? {
                        "score" => Store::Score {
                            holder: words.next()?.to_string(),
                            objective: words.next()?.to_string(),
                        },
                        "storage" => {
                            let id = words.next()?.to_string();
                            let path = words.path()?;
                            let kind = words.next()?.to_string();
                            let scale = words
                                .next()?
                                .parse()
                                .map_err(|_| words.error("bad store scale"))?;
                            Store::Storage {
                                id,
                                path,
                                kind,
                                scale,
                            }
                        }
                        other => return Err(words.error(format!("unknown store target '{other}'"))),
                    };
                    stores.push(StoreClause { success, target });
                }
                "as" | "at" => {
                    words.next()?;
                }
                // The machine has no world; positions only need to parse.
                "positioned" => {
                    for _ in 0..3 {
                        words.next()?;
                    }
                }
                "run" => {
                    let command = words.rest();
                    return match self.execute(command)? {
                        Step::Return(value) => Ok(Step::Return(value)),
                        Step::Next(outcome) => {
                            self.apply_stores(&stores, outcome);
                            Ok(Step::Next(outcome))
                        }
                    };
                }
                other => return Err(words.error(format!("unknown execute clause '{other}'"))),
            }
        }
    }

    fn condition(&mut self, words: &mut Words<'_>) -> VmResult<bool> {
        match words.next()? {
            "score" => {
                let holder = words.next()?;
                let objective = words.next()?;
                let op = words.next()?;
                let value = self.scores.get(holder, objective);
                if op == "matches" {
                    let range = words.next()?;
                    let Some(value) = value else {
                        return Ok(false);
                    };
                    return in_range(value, range).ok_or_else(|| words.error("bad range"));
                }
                let other = self.scores.get(words.next()?, words.next()?);
                let (Some(a), Some(b)) = (value, other) else {
                    return Ok(false);
                };
                match op {
                    "=" => Ok(a == b),
                    "<" => Ok(a < b),
                    "<=" => Ok(a <= b),
                    ">" => Ok(a > b),
                    ">=" => Ok(a >= b),
                    other => Err(words.error(format!("unknown comparison '{other}'"))),
                }
            }
            "data" => {
                words.expect("storage")?;
                let id = words.next()?;
                let path = words.path()?;
                Ok(self.read(id, &path).is_some())
            }
            other => Err(words.error(format!("unknown condition '{other}'"))),
        }
    }

    fn apply_stores(&mut self, stores: &[StoreClause], outcome: Outcome) {
        for clause in stores {
            let value = if clause.success {
                outcome.success as i32
            } else {
                outcome.result
            };
            match &clause.target {
                Store::Score { holder, objective } => {
                    self.scores.set(holder, objective, value);
                }
                Store::Storage {
                    id,
                    path,
                    kind,
                    scale,
                } => {
                    let scaled = value as f64 * scale;
                    let typed = match kind.as_str() {
                        "byte" => Nbt::Byte(scaled as i64 as i8),
                        "short" => Nbt::Short(scaled as i64 as i16),
                        "long" => Nbt::Long(scaled as i64),
                        "float" => Nbt::Float(scaled as f32),
                        "double" => Nbt::Double(scaled),
                        _ => Nbt::Int(scaled as i64 as i32),
                    };
                    path.set(self.storage_root(id), typed);
                }
            }
        }
    }

    // ── function / return ────────────────────────────────────────────────

    fn function(&mut self, words: &mut Words<'_>) -> VmResult<Outcome> {
        let signature = words.next()?;
        if words.is_empty() {
            let value = self.call(signature, None)?;
            return Ok(Outcome::ok(value.unwrap_or(0)));
        }
        words.expect("with")?;
        words.expect("storage")?;
        let id = words.next()?;
        let args = match words.next_opt() {
            Some(path) => self.read(id, &NbtPath::parse(path)?),
            None => self.storages.get(id).cloned(),
        };
        match args {
            Some(Nbt::Compound(args)) => {
                let value = self.call(signature, Some(&args))?;
                Ok(Outcome::ok(value.unwrap_or(0)))
            }
            _ => Err(words.error("macro arguments must be a compound")),
        }
    }

    fn return_command(&mut self, words: &mut Words<'_>) -> VmResult<Step> {
        match words.next()? {
            "fail" => Ok(Step::Return(0)),
            "run" => match self.execute(words.rest())? {
                Step::Return(value) => Ok(Step::Return(value)),
                Step::Next(outcome) => Ok(Step::Return(outcome.result)),
            },
            word => word
                .parse()
                .map(Step::Return)
                .map_err(|_| words.error(format!("bad return value '{word}'"))),
        }
    }

    // ── tellraw ──────────────────────────────────────────────────────────

    fn render_text(&self, json: &str) -> VmResult<String> {
        let component: serde_json::Value =
            serde_json::from_str(json).map_err(|e| VmError::Parse {
                line: json.to_string(),
                reason: e.to_string(),
            })?;
        let mut out = String::new();
        self.render_component(&component, &mut out);
        Ok(out)
    }

    fn render_component(&self, component: &serde_json::Value, out: &mut String) {
        use serde_json::Value;
        match component {
            Value::String(s) => out.push_str(s),
            Value::Array(parts) => {
                for part in parts {
                    self.render_component(part, out);
                }
            }
            Value::Object(map) => {
                if let Some(Value::String(text)) = map.get("text") {
                    out.push_str(text);
                }
                if let Some(score) = map.get("score") {
                    let name = score["name"].as_str().unwrap_or_default();
                    let objective = score["objective"].as_str().unwrap_or_default();
                    if let Some(value) = self.scores.get(name, objective) {
                        out.push_str(&value.to_string());
                    }
                }
                if let (Some(Value::String(id)), Some(Value::String(path))) =
                    (map.get("storage"), map.get("nbt"))
                {
                    let value = NbtPath::parse(path)
                        .ok()
                        .and_then(|path| self.read(id, &path));
                    if let Some(value) = value {
                        out.push_str(&value.display_text());
                    }
                }
                if let Some(Value::Array(extra)) = map.get("extra") {
                    for part in extra {
                        self.render_component(part, out);
                    }
                }
            }
            other => out.push_str(&other.to_string()),
        }
    }
}
