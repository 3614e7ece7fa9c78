//! Procedure map: generated procedure → generation-time call site.
//!
//! Generated paths (`mcf/p17`) say nothing about where they came from.
//! The map records, for each procedure, its role and the site in the
//! driving program that produced it, so a failing procedure can be traced
//! back to user code.

use crate::emit::ProcKind;
use mcfc_types::Site;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcedureMap {
    pub entries: Vec<ProcedureMapEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcedureMapEntry {
    /// Fully qualified signature, e.g. `demo:mcf/p3`.
    pub signature: String,
    pub kind: ProcKind,
    /// Name of the entry point, function or helper, if any.
    pub label: Option<String>,
    pub site: Site,
    /// Number of instruction lines.
    pub lines: usize,
}

impl ProcedureMap {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, entry: ProcedureMapEntry) {
        self.entries.push(entry);
    }

    pub fn find(&self, signature: &str) -> Option<&ProcedureMapEntry> {
        self.entries.iter().find(|e| e.signature == signature)
    }

    pub fn by_kind(&self, kind: ProcKind) -> impl Iterator<Item = &ProcedureMapEntry> {
        self.entries.iter().filter(move |e| e.kind == kind)
    }

    /// Serialize to JSON bytes.
    pub fn to_json(&self) -> Vec<u8> {
        serde_json::to_vec_pretty(self).unwrap_or_default()
    }

    /// Deserialize from JSON bytes.
    pub fn from_json(data: &[u8]) -> Option<Self> {
        serde_json::from_slice(data).ok()
    }
}
