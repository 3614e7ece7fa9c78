//! Chat output and target selectors.

use crate::compiler::Compiler;
use crate::types::CACHE;
use crate::value::{Kind, Value};
use mcfc_types::{ErrorCode, Site};
use serde_json::json;
use std::fmt;

/// A target selector accepted by the configured game version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector(String);

impl Selector {
    /// The executing entity.
    pub fn executor() -> Self {
        Self("@s".into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One piece of a `tell` message.
#[derive(Debug, Clone)]
pub enum TextPart<'a> {
    Literal(&'a str),
    Value(&'a Value),
}

impl<'a> From<&'a str> for TextPart<'a> {
    fn from(text: &'a str) -> Self {
        TextPart::Literal(text)
    }
}

impl<'a> From<&'a Value> for TextPart<'a> {
    fn from(value: &'a Value) -> Self {
        TextPart::Value(value)
    }
}

impl Compiler {
    /// Validate `text` against the selector allow-list. Arguments in
    /// brackets are kept; only the base (`@a`, `@e`, ...) is checked.
    #[track_caller]
    pub fn selector(&mut self, text: &str) -> Selector {
        let site = Site::caller();
        let base = text.split('[').next().unwrap_or_default();
        if self.selectors.iter().any(|s| s == base) {
            return Selector(text.to_string());
        }
        self.report(
            ErrorCode::UNSUPPORTED_SELECTOR,
            format!(
                "selector '{base}' is not supported by version {}",
                self.config.version
            ),
            &site,
        );
        Selector::executor()
    }

    /// `say` a literal message as the executor.
    pub fn say(&mut self, message: &str) {
        self.emit(format!("say {message}"));
    }

    /// `say` a literal message as every entity matched by `target`.
    pub fn say_as(&mut self, target: &Selector, message: &str) {
        self.emit(format!("execute as {target} run say {message}"));
    }

    /// Send a message mixing literals and runtime values to `target`.
    #[track_caller]
    pub fn tell(&mut self, target: &Selector, parts: &[TextPart<'_>]) {
        let site = Site::caller();
        let l = self.layout.clone();
        let mut components = vec![json!("")];
        for (i, part) in parts.iter().enumerate() {
            let component = match part {
                TextPart::Literal(text) => json!({ "text": text }),
                TextPart::Value(value) => {
                    if !self.check_live(value, &site) {
                        continue;
                    }
                    match value.kind() {
                        Kind::Integer | Kind::Condition => json!({
                            "score": { "name": value.id().as_str(), "objective": l.var_objective }
                        }),
                        Kind::Float => {
                            let path = format!("{CACHE}.say{i}");
                            self.extract_float(value, &l.at(&path));
                            json!({ "storage": l.storage, "nbt": path })
                        }
                        _ => json!({ "storage": l.storage, "nbt": l.mem(value.id()).path }),
                    }
                }
            };
            components.push(component);
        }
        let text = serde_json::Value::Array(components).to_string();
        self.emit(format!("tellraw {target} {text}"));
    }

    /// Show one value to the executor.
    #[track_caller]
    pub fn say_value(&mut self, value: &Value) {
        let target = Selector::executor();
        self.tell(&target, &[TextPart::Value(value)]);
    }
}
