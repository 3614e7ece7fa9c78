//! Reference executor for generated mcfunction procedures.
//!
//! Runs instruction text against an in-memory scoreboard and structured
//! store, with function macros, `return`, and bounded call depth. Used as
//! the golden reference for the semantics of generated code.

pub mod error;
pub mod machine;
pub mod nbt;
pub mod path;
pub mod scoreboard;

mod command;

pub use error::{VmError, VmResult};
pub use machine::{Limits, Machine};
pub use nbt::Nbt;
pub use path::NbtPath;
pub use scoreboard::Scoreboard;
