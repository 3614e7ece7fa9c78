//! Game handles: entities, players and blocks.
//!
//! An entity handle is the text the game resolves to a target (a
//! selector, a player name or a UUID string). Running code as an entity
//! goes through a macro helper so the handle can be read at run time.
//! Blocks keep their coordinates at `mem.<id>.src` and the result of the
//! last state query at `mem.<id>.data`.

use crate::cmd;
use crate::compiler::Compiler;
use crate::runtime::Helper;
use crate::types::{Loc, Register, CACHE, CALL, REGISTER};
use crate::value::{Capabilities, Kind, Literal, Value};
use mcfc_types::{ErrorCode, Site};

impl Compiler {
    // ══════════════════════════════════════════════════════════════════════
    // Handles
    // ══════════════════════════════════════════════════════════════════════

    /// An entity handle. Selectors are checked against the allow-list.
    #[track_caller]
    pub fn entity(&mut self, handle: &str) -> Value {
        self.handle(Kind::Entity, handle)
    }

    /// A player handle.
    #[track_caller]
    pub fn player(&mut self, handle: &str) -> Value {
        self.handle(Kind::Player, handle)
    }

    /// A block at `coords` (`"<x> <y> <z>"`, relative forms allowed).
    #[track_caller]
    pub fn block(&mut self, coords: &str) -> Value {
        let site = Site::caller();
        if coords.split_whitespace().count() != 3 {
            self.report(
                ErrorCode::INVALID_LITERAL,
                format!("block position '{coords}' needs three coordinates"),
                &site,
            );
        }
        let value = self.alloc(Kind::Block);
        let lines = value.assign_literal(&self.layout, &Literal::Text(coords.to_string()));
        self.emit_all(lines);
        value
    }

    #[track_caller]
    fn handle(&mut self, kind: Kind, handle: &str) -> Value {
        let text = if handle.starts_with('@') {
            self.selector(handle).as_str().to_string()
        } else {
            handle.to_string()
        };
        let value = self.alloc(kind);
        let lines = value.assign_literal(&self.layout, &Literal::Text(text));
        self.emit_all(lines);
        value
    }

    // ══════════════════════════════════════════════════════════════════════
    // Execution context
    // ══════════════════════════════════════════════════════════════════════

    /// Run `body` as every entity `entity` resolves to, at their
    /// position too when `use_location` is set.
    ///
    /// The body shares the enclosing frame, so values of the enclosing
    /// procedure stay usable and signals propagate out.
    #[track_caller]
    pub fn exec_as(
        &mut self,
        entity: &Value,
        use_location: bool,
        body: impl FnOnce(&mut Compiler),
    ) {
        let site = Site::caller();
        let valid = self.check_live(entity, &site) && self.check_kind(entity, Kind::Entity, &site);
        let signature = self.branch_body(&site, body);
        if !valid {
            return;
        }
        let helper = if use_location {
            Helper::RunAsAt
        } else {
            Helper::RunAs
        };
        self.run_as(entity, &signature, helper);
        self.forward_signals();
        self.frame.after_branch = false;
    }

    fn run_as(&mut self, entity: &Value, signature: &str, helper: Helper) {
        let l = self.layout.clone();
        let call = l.at(CALL);
        self.emit(cmd::set_from(&call.child("target"), &l.mem(entity.id())));
        self.emit(cmd::set_value(&call.child("proc"), &cmd::quote(signature)));
        let helper = self.helper(helper);
        self.emit(cmd::call_with(&helper, &call));
    }

    /// UUID of the entity in int-array form, written to `dest`.
    pub(crate) fn extract_entity(&mut self, entity: &Value, dest: &Loc, site: &Site) {
        let Some(signature) = self.library("entity.extract", site) else {
            return;
        };
        self.run_as(entity, &signature, Helper::RunAs);
        let line = cmd::set_from(dest, &self.layout.at(REGISTER));
        self.emit(line);
    }

    /// A handle for the entity whose int-array UUID is stored at `src`.
    pub(crate) fn construct_entity(&mut self, kind: Kind, src: &Loc, site: &Site) -> Value {
        let Some(signature) = self.library("entity.construct", site) else {
            return self.placeholder(kind);
        };
        let l = self.layout.clone();
        self.emit(cmd::set_from(&l.at(CACHE).child("src"), src));
        self.emit(cmd::call(&signature));
        let value = self.alloc(kind);
        self.emit(cmd::set_from(&l.mem(value.id()), &l.at(REGISTER)));
        value
    }

    // ══════════════════════════════════════════════════════════════════════
    // Blocks
    // ══════════════════════════════════════════════════════════════════════

    /// Condition: the block at `block` is `block_id` (a block id or tag,
    /// states allowed).
    #[track_caller]
    pub fn is_block(&mut self, block: &Value, block_id: &str) -> Value {
        let site = Site::caller();
        if !self.check_live(block, &site) || !self.check_kind(block, Kind::Block, &site) {
            return self.placeholder(Kind::Condition);
        }
        let l = self.layout.clone();
        let call = l.at(CALL);
        self.emit(cmd::set_from(&call.child("pos"), &l.mem(block.id()).child("src")));
        self.emit(cmd::set_value(&call.child("block"), &cmd::quote(block_id)));
        let helper = self.helper(Helper::IsBlock);
        self.emit(cmd::call_with(&helper, &call));
        let result = self.alloc(Kind::Condition);
        self.emit(cmd::operation(
            &l.var(result.id()),
            "=",
            &l.sys(Register::General),
        ));
        result
    }

    /// Read the full state of the block into `mem.<id>.data`.
    #[track_caller]
    pub fn query_state(&mut self, block: &Value) {
        let site = Site::caller();
        if !self.check_live(block, &site) || !self.check_kind(block, Kind::Block, &site) {
            return;
        }
        let Some(signature) = self.library("block.get_state", &site) else {
            return;
        };
        let l = self.layout.clone();
        let call = l.at(CALL);
        let mem = l.mem(block.id());
        self.emit(cmd::set_from(&call.child("pos"), &mem.child("src")));
        self.emit(cmd::set_value(&call.child("proc"), &cmd::quote(&signature)));
        let helper = self.helper(Helper::RunPositioned);
        self.emit(cmd::call_with(&helper, &call));
        self.emit(cmd::set_from(&mem.child("data"), &l.at(CACHE).child("result")));
    }
}
