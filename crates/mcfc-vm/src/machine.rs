//! Machine state and function invocation.

use crate::error::{VmError, VmResult};
use crate::nbt::Nbt;
use crate::path::NbtPath;
use crate::scoreboard::Scoreboard;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, trace};

/// Execution limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum nesting of function calls.
    pub max_depth: usize,
    /// Maximum commands executed by one [`Machine::run`].
    pub max_commands: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_depth: 512,
            max_commands: 1_000_000,
        }
    }
}

/// Outcome of one command, as `execute store` observes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Outcome {
    pub success: bool,
    pub result: i32,
}

impl Outcome {
    pub fn ok(result: i32) -> Self {
        Self {
            success: true,
            result,
        }
    }

    pub fn fail() -> Self {
        Self {
            success: false,
            result: 0,
        }
    }

    pub fn flag(success: bool) -> Self {
        if success {
            Self::ok(1)
        } else {
            Self::fail()
        }
    }
}

/// What a command asks the enclosing function to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Next(Outcome),
    Return(i32),
}

/// An executor for loaded procedures.
pub struct Machine {
    procedures: HashMap<String, Rc<[String]>>,
    pub(crate) scores: Scoreboard,
    pub(crate) storages: HashMap<String, Nbt>,
    pub(crate) output: Vec<String>,
    limits: Limits,
    commands: u64,
    depth: usize,
    peak_depth: usize,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new(Limits::default())
    }
}

impl Machine {
    pub fn new(limits: Limits) -> Self {
        Self {
            procedures: HashMap::new(),
            scores: Scoreboard::new(),
            storages: HashMap::new(),
            output: Vec::new(),
            limits,
            commands: 0,
            depth: 0,
            peak_depth: 0,
        }
    }

    /// Load (or replace) a procedure.
    pub fn load<I, S>(&mut self, signature: impl Into<String>, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines: Vec<String> = lines.into_iter().map(Into::into).collect();
        self.procedures.insert(signature.into(), lines.into());
    }

    pub fn has_procedure(&self, signature: &str) -> bool {
        self.procedures.contains_key(signature)
    }

    /// Run a procedure from the top level. Returns its `return` value.
    pub fn run(&mut self, signature: &str) -> VmResult<Option<i32>> {
        debug!(function = signature, "run");
        self.commands = 0;
        self.depth = 0;
        self.call(signature, None)
    }

    /// Run a single command from the top level.
    pub fn execute_line(&mut self, command: &str) -> VmResult<()> {
        self.execute(command).map(|_| ())
    }

    pub fn scores(&self) -> &Scoreboard {
        &self.scores
    }

    pub fn score(&self, holder: &str, objective: &str) -> Option<i32> {
        self.scores.get(holder, objective)
    }

    /// Root compound of a storage.
    pub fn storage(&self, id: &str) -> Option<&Nbt> {
        self.storages.get(id)
    }

    /// Value at a path inside a storage.
    pub fn data(&self, id: &str, path: &str) -> Option<&Nbt> {
        let path = NbtPath::parse(path).ok()?;
        path.get(self.storages.get(id)?)
    }

    /// Lines printed by `say` and `tellraw`.
    pub fn output(&self) -> &[String] {
        &self.output
    }

    /// Deepest call nesting reached so far.
    pub fn peak_depth(&self) -> usize {
        self.peak_depth
    }

    /// Commands executed by the last run.
    pub fn commands_executed(&self) -> u64 {
        self.commands
    }

    fn tick(&mut self) -> VmResult<()> {
        self.commands += 1;
        if self.commands > self.limits.max_commands {
            Err(VmError::CommandLimitExceeded(self.limits.max_commands))
        } else {
            Ok(())
        }
    }

    pub(crate) fn call(
        &mut self,
        signature: &str,
        args: Option<&IndexMap<String, Nbt>>,
    ) -> VmResult<Option<i32>> {
        let lines = self
            .procedures
            .get(signature)
            .cloned()
            .ok_or_else(|| VmError::UnknownFunction(signature.to_string()))?;
        self.depth += 1;
        if self.depth > self.limits.max_depth {
            return Err(VmError::DepthExceeded(self.limits.max_depth));
        }
        self.peak_depth = self.peak_depth.max(self.depth);
        trace!(function = signature, depth = self.depth, "call");

        let mut returned = None;
        for raw in lines.iter() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let command = match line.strip_prefix('$') {
                Some(body) => {
                    let args =
                        args.ok_or_else(|| VmError::MissingMacroArguments(signature.to_string()))?;
                    substitute(body, args)?
                }
                None => line.to_string(),
            };
            self.tick()?;
            if let Step::Return(value) = self.execute(&command)? {
                returned = Some(value);
                break;
            }
        }
        self.depth -= 1;
        Ok(returned)
    }
}

/// Expand `$(key)` placeholders of a macro line.
fn substitute(body: &str, args: &IndexMap<String, Nbt>) -> VmResult<String> {
    let mut out = String::with_capacity(body.len());
    let mut rest = body;
    while let Some(start) = rest.find("$(") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find(')').ok_or_else(|| VmError::Parse {
            line: body.to_string(),
            reason: "unclosed macro placeholder".to_string(),
        })?;
        let key = &after[..end];
        let value = args
            .get(key)
            .ok_or_else(|| VmError::MissingMacroKey(key.to_string()))?;
        out.push_str(&value.macro_text());
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitute() {
        let mut args = IndexMap::new();
        args.insert("slot".to_string(), Nbt::String("v3".into()));
        args.insert("index".to_string(), Nbt::Int(-1));
        assert_eq!(
            substitute("data get storage s:t mem.$(slot)[$(index)]", &args).unwrap(),
            "data get storage s:t mem.v3[-1]"
        );
        assert!(matches!(
            substitute("say $(missing)", &args),
            Err(VmError::MissingMacroKey(ref k)) if k == "missing"
        ));
    }

    #[test]
    fn test_unknown_function() {
        let mut vm = Machine::default();
        assert!(matches!(vm.run("x:y"), Err(VmError::UnknownFunction(_))));
    }

    #[test]
    fn test_depth_limit() {
        let mut vm = Machine::new(Limits {
            max_depth: 8,
            max_commands: 1000,
        });
        vm.load("t:loop", ["function t:loop"]);
        assert!(matches!(vm.run("t:loop"), Err(VmError::DepthExceeded(8))));
        assert_eq!(vm.peak_depth(), 8);
    }

    #[test]
    fn test_command_limit() {
        let mut vm = Machine::new(Limits {
            max_depth: 100,
            max_commands: 3,
        });
        vm.load("t:f", ["say a", "say b", "say c", "say d"]);
        assert!(matches!(vm.run("t:f"), Err(VmError::CommandLimitExceeded(3))));
    }

    #[test]
    fn test_macro_without_arguments() {
        let mut vm = Machine::default();
        vm.load("t:m", ["$say $(x)"]);
        assert!(matches!(vm.run("t:m"), Err(VmError::MissingMacroArguments(_))));
    }
}
