//! Code generation engine: lowers structured programs into mcfunction
//! procedures.
//!
//! # Architecture
//!
//! A program drives a [`Compiler`] through direct calls. Each call
//! appends instruction lines to the procedure under the emission cursor;
//! constructs that need their own procedure (branches, loops, function
//! bodies) create one, move the cursor into it and back.
//!
//! ## Runtime layout
//!
//! | Item                     | Location                                  |
//! |--------------------------|-------------------------------------------|
//! | integer, condition value | score `<id> <ns>.var`                     |
//! | any other value          | `storage <ns>:mcf mem.<id>`               |
//! | call/loop stack          | `storage <ns>:mcf stack`                  |
//! | branch outcome markers   | `storage <ns>:mcf cond_stack`             |
//! | call arguments           | `storage <ns>:mcf call.m<i>`              |
//! | return value             | `storage <ns>:mcf ret`                    |
//! | signal registers         | `#terminate`, `#loop_exit`, `#loop_cont`, `#cond_last` on `<ns>.sys` |
//!
//! ## Signals
//!
//! The target has no non-local exits. `return`, `break` and `continue`
//! set a signal register and return from the current procedure; every
//! enclosing procedure checks the registers after each nested
//! invocation and returns in turn.
//!
//! ## Limits
//!
//! Loops iterate by recursion, so an iteration costs one level of the
//! runtime's call depth.

pub mod class;
pub mod cmd;
pub mod compiler;
pub mod control;
pub mod debug;
pub mod display;
pub mod emit;
pub mod entity;
pub mod error;
mod frame;
pub mod function;
pub mod ops;
pub mod runtime;
pub mod source_map;
pub mod types;
pub mod value;

pub use class::Fields;
pub use compiler::{Compiler, Generated, GeneratedProcedure};
pub use display::{Selector, TextPart};
pub use emit::{ProcKind, ValueId};
pub use error::{CodegenError, CodegenResult, CompileFailure};
pub use function::{FunctionId, Param, Pass};
pub use ops::{ArithOp, CmpOp, Operand};
pub use source_map::{ProcedureMap, ProcedureMapEntry};
pub use types::{Layout, Register};
pub use value::{DecimalFloat, Element, Kind, Literal, ShapeId, Value};
