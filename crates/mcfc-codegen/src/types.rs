//! Runtime layout: storage paths, objectives and register names.
//!
//! Everything generated code touches lives in one storage and two
//! scoreboard objectives, all derived from the project namespace:
//!
//! ```text
//! storage <ns>:mcf
//!   mem.<id>       values kept in storage (text, list, object, float)
//!   stack          call/loop stack of saved frames
//!   frame          frame under construction / last popped frame
//!   cond_stack     outcome markers of running branches
//!   call           call-argument area (macro arguments)
//!   ret            return slot
//!   alias          by-alias parameter write-back slots
//!   register       scratch result of helpers and library calls
//!   cache          scratch space
//! objective <ns>.var   one score per integer/condition value
//! objective <ns>.sys   system registers (#terminate, #loop_exit, ...)
//! ```

use crate::emit::ValueId;
use std::fmt;

/// Storage name inside the project namespace.
pub const STORAGE_NAME: &str = "mcf";
/// Directory of generated procedures inside the function directory.
pub const GENERATED_DIR: &str = "mcf";
/// Name of the generated initialization procedure.
pub const INIT_PROCEDURE: &str = "mcf/init";

// ── Storage keys ─────────────────────────────────────────────────────────────

pub const MEM: &str = "mem";
pub const STACK: &str = "stack";
pub const FRAME: &str = "frame";
pub const COND_STACK: &str = "cond_stack";
pub const CALL: &str = "call";
pub const RET: &str = "ret";
pub const ALIAS: &str = "alias";
pub const REGISTER: &str = "register";
pub const CACHE: &str = "cache";

// ── System registers ─────────────────────────────────────────────────────────

/// Fake players on the `<ns>.sys` objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    /// A `return` is unwinding the current function.
    Terminate,
    /// A `break` is unwinding the innermost loop.
    LoopExit,
    /// A `continue` is unwinding to the innermost loop control.
    LoopCont,
    /// Outcome of the last finished branch of an if/elif/else chain.
    CondLast,
    /// Scratch constant for operations that need a score operand.
    Const,
    /// General scratch register.
    General,
    /// Library scratch registers `#buf1`..`#buf6`.
    Buffer(u8),
}

/// Registers saved in every call frame.
pub const SIGNALS: [Register; 4] = [
    Register::Terminate,
    Register::LoopExit,
    Register::LoopCont,
    Register::CondLast,
];

/// Registers saved in every loop record.
pub const LOOP_SIGNALS: [Register; 2] = [Register::LoopExit, Register::LoopCont];

impl Register {
    pub fn holder(self) -> String {
        match self {
            Register::Terminate => "#terminate".to_string(),
            Register::LoopExit => "#loop_exit".to_string(),
            Register::LoopCont => "#loop_cont".to_string(),
            Register::CondLast => "#cond_last".to_string(),
            Register::Const => "#const".to_string(),
            Register::General => "#general".to_string(),
            Register::Buffer(n) => format!("#buf{n}"),
        }
    }

    /// Key under which a frame record saves this register.
    pub(crate) fn frame_key(self) -> &'static str {
        match self {
            Register::Terminate => "term",
            Register::LoopExit => "exit",
            Register::LoopCont => "cont",
            Register::CondLast => "cond",
            Register::Const => "const",
            Register::General => "general",
            Register::Buffer(_) => "buf",
        }
    }
}

// ── Addresses ────────────────────────────────────────────────────────────────

/// A scoreboard entry: holder plus objective.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Score {
    pub holder: String,
    pub objective: String,
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.holder, self.objective)
    }
}

/// A location in the structured store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loc {
    pub storage: String,
    pub path: String,
}

impl Loc {
    pub fn child(&self, key: &str) -> Loc {
        Loc {
            storage: self.storage.clone(),
            path: format!("{}.{key}", self.path),
        }
    }

    pub fn index(&self, index: i32) -> Loc {
        Loc {
            storage: self.storage.clone(),
            path: format!("{}[{index}]", self.path),
        }
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "storage {} {}", self.storage, self.path)
    }
}

/// Names derived from the project namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub namespace: String,
    /// `<ns>:mcf`
    pub storage: String,
    /// `<ns>.var`
    pub var_objective: String,
    /// `<ns>.sys`
    pub sys_objective: String,
}

impl Layout {
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            storage: format!("{namespace}:{STORAGE_NAME}"),
            var_objective: format!("{namespace}.var"),
            sys_objective: format!("{namespace}.sys"),
        }
    }

    /// Score of an integer or condition value.
    pub fn var(&self, id: &ValueId) -> Score {
        Score {
            holder: id.to_string(),
            objective: self.var_objective.clone(),
        }
    }

    pub fn sys(&self, register: Register) -> Score {
        Score {
            holder: register.holder(),
            objective: self.sys_objective.clone(),
        }
    }

    /// Any path in the project storage.
    pub fn at(&self, path: &str) -> Loc {
        Loc {
            storage: self.storage.clone(),
            path: path.to_string(),
        }
    }

    /// Storage slot of a value.
    pub fn mem(&self, id: &ValueId) -> Loc {
        self.at(&format!("{MEM}.{id}"))
    }

    /// Slot `i` of the frame under construction.
    pub fn frame_slot(&self, i: usize) -> Loc {
        self.at(&format!("{FRAME}.m{i}"))
    }

    /// Argument `i` of the call area.
    pub fn call_arg(&self, i: usize) -> Loc {
        self.at(&format!("{CALL}.m{i}"))
    }

    pub fn alias_slot(&self, i: usize) -> Loc {
        self.at(&format!("{ALIAS}.a{i}"))
    }

    /// Fully qualified signature of a procedure path.
    pub fn signature(&self, path: &str) -> String {
        format!("{}:{path}", self.namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_names() {
        let layout = Layout::new("demo");
        assert_eq!(layout.storage, "demo:mcf");
        assert_eq!(layout.sys(Register::LoopExit).to_string(), "#loop_exit demo.sys");
        assert_eq!(layout.frame_slot(2).to_string(), "storage demo:mcf frame.m2");
        assert_eq!(layout.at(STACK).index(-1).path, "stack[-1]");
        assert_eq!(layout.signature("mcf/p3"), "demo:mcf/p3");
    }

    #[test]
    fn test_buffer_holders() {
        assert_eq!(Register::Buffer(4).holder(), "#buf4");
    }
}
