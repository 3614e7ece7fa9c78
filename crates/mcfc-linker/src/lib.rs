//! Component database and link pass for the mcfc compiler.
//!
//! Components are reusable libraries of hand-written procedures. Code
//! generation activates them on first use; [`ComponentRegistry::link`] then
//! relocates every activated component into the project namespace, rewrites
//! macro tokens and cross-component references, copies static resources and
//! lists the initialization calls in dependency order.

pub mod database;
pub mod error;
pub mod link;
pub mod manifest;
pub mod registry;

pub use database::{ComponentSource, DirDatabase, MemoryDatabase, ProcedureSource, DEFAULT_SELECTORS};
pub use error::{LinkError, LinkResult};
pub use link::{LinkOutput, LinkedProcedure, LinkedResource, Substitutions};
pub use manifest::{ComponentManifest, CopyRule};
pub use registry::ComponentRegistry;
