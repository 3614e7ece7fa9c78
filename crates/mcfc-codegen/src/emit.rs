//! Identities, procedures and the emission cursor.

use crate::error::{CodegenError, CodegenResult};
use crate::types::GENERATED_DIR;
use mcfc_types::Site;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ══════════════════════════════════════════════════════════════════════════════
// Value identities
// ══════════════════════════════════════════════════════════════════════════════

/// Identity of a runtime value: a score holder and a storage key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValueId(String);

impl ValueId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Issues identities and tracks which are live.
///
/// Identities are never handed out twice. Pinned identities belong to
/// function parameters and class fields; they stay live for the whole
/// compilation and survive `release`.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: u64,
    live: BTreeSet<ValueId>,
    pinned: BTreeSet<ValueId>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_id(&mut self) -> ValueId {
        let id = ValueId(format!("v{}", base36(self.next)));
        self.next += 1;
        self.live.insert(id.clone());
        id
    }

    /// A live identity that `release` never frees.
    pub fn new_pinned(&mut self) -> ValueId {
        let id = self.new_id();
        self.pinned.insert(id.clone());
        id
    }

    /// Drop `id` from the live set. Returns false for pinned or unknown ids.
    pub fn release(&mut self, id: &ValueId) -> bool {
        if self.pinned.contains(id) {
            return false;
        }
        self.live.remove(id)
    }

    pub fn is_live(&self, id: &ValueId) -> bool {
        self.live.contains(id)
    }

    pub fn is_pinned(&self, id: &ValueId) -> bool {
        self.pinned.contains(id)
    }

    pub fn issued(&self) -> u64 {
        self.next
    }

    /// Live identities that are not pinned.
    pub fn leaked(&self) -> Vec<ValueId> {
        self.live.difference(&self.pinned).cloned().collect()
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Procedures
// ══════════════════════════════════════════════════════════════════════════════

/// Handle of a procedure owned by the [`Emitter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcId(pub(crate) usize);

/// Role of a generated procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcKind {
    /// A named program entry point.
    Entry,
    /// The runtime initialization procedure.
    Init,
    /// Body of an if/elif/else branch.
    Branch,
    /// Loop control: advance, test, dispatch.
    LoopControl,
    /// Loop main body.
    LoopBody,
    /// Function entry: parameter construction and signal reset.
    FunctionEntry,
    /// Function body.
    FunctionBody,
    /// Method entry; the body is a `FunctionBody`.
    Method,
    /// Lexical scope opened with [`Compiler::scope`](crate::Compiler::scope).
    Block,
    /// Shared runtime helper.
    Helper,
}

/// A generated procedure.
#[derive(Debug, Clone)]
pub struct Procedure {
    /// Path inside the function directory, e.g. `mcf/p4`.
    pub path: String,
    pub kind: ProcKind,
    pub site: Site,
    /// Human-readable name for entries, functions and helpers.
    pub label: Option<String>,
    pub lines: Vec<String>,
    opened: bool,
    sealed: bool,
}

impl Procedure {
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Reserved procedures that were never written stay out of the output.
    pub fn is_opened(&self) -> bool {
        self.opened
    }
}

/// Owns every procedure and the stack of procedures being written.
///
/// The innermost entry of the cursor is the emission target. A
/// procedure is opened at most once; rewinding seals it.
#[derive(Debug, Default)]
pub struct Emitter {
    procedures: Vec<Procedure>,
    cursor: Vec<ProcId>,
    next_generated: u32,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh procedure with a generated path.
    pub fn new_procedure(&mut self, kind: ProcKind, site: Site) -> ProcId {
        let path = format!("{GENERATED_DIR}/p{}", self.next_generated);
        self.next_generated += 1;
        self.push(path, kind, site, None)
    }

    /// A procedure at a fixed path. `None` if the path is taken.
    pub fn named_procedure(
        &mut self,
        path: &str,
        kind: ProcKind,
        site: Site,
        label: Option<String>,
    ) -> Option<ProcId> {
        if self.find(path).is_some() {
            return None;
        }
        Some(self.push(path.to_string(), kind, site, label))
    }

    fn push(&mut self, path: String, kind: ProcKind, site: Site, label: Option<String>) -> ProcId {
        self.procedures.push(Procedure {
            path,
            kind,
            site,
            label,
            lines: Vec::new(),
            opened: false,
            sealed: false,
        });
        ProcId(self.procedures.len() - 1)
    }

    pub fn set_label(&mut self, id: ProcId, label: impl Into<String>) {
        if let Some(proc) = self.procedures.get_mut(id.0) {
            proc.label = Some(label.into());
        }
    }

    pub fn find(&self, path: &str) -> Option<ProcId> {
        self.procedures
            .iter()
            .position(|p| p.path == path)
            .map(ProcId)
    }

    /// Make `id` the emission target.
    pub fn forward(&mut self, id: ProcId) -> CodegenResult<()> {
        let proc = self
            .procedures
            .get_mut(id.0)
            .ok_or_else(|| CodegenError::Internal(format!("unknown procedure #{}", id.0)))?;
        if proc.opened {
            return Err(CodegenError::AlreadyWritten(proc.path.clone()));
        }
        proc.opened = true;
        self.cursor.push(id);
        Ok(())
    }

    /// Seal the current target and return to the previous one.
    pub fn rewind(&mut self) -> CodegenResult<ProcId> {
        let id = self
            .cursor
            .pop()
            .ok_or_else(|| CodegenError::Internal("rewind with an empty cursor".into()))?;
        self.procedures[id.0].sealed = true;
        Ok(id)
    }

    pub fn emit(&mut self, line: String) -> CodegenResult<()> {
        let id = self
            .cursor
            .last()
            .copied()
            .ok_or_else(|| CodegenError::NoOpenProcedure(line.clone()))?;
        self.procedures[id.0].lines.push(line);
        Ok(())
    }

    pub fn current(&self) -> Option<ProcId> {
        self.cursor.last().copied()
    }

    pub fn depth(&self) -> usize {
        self.cursor.len()
    }

    /// Label of the innermost labeled procedure under the cursor.
    pub fn enclosing_label(&self) -> Option<&str> {
        self.cursor
            .iter()
            .rev()
            .find_map(|id| self.procedures[id.0].label.as_deref())
    }

    pub fn procedure(&self, id: ProcId) -> &Procedure {
        &self.procedures[id.0]
    }

    pub fn procedures(&self) -> &[Procedure] {
        &self.procedures
    }

    pub fn into_procedures(self) -> Vec<Procedure> {
        self.procedures
    }
}
