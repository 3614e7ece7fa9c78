//! Core compiler state: identities, emission, scopes and diagnostics.
//!
//! A [`Compiler`] owns everything one compilation run mutates. Programs
//! drive it through direct calls (`int`, `add`, `if_`, `while_`,
//! `function`, ...); every call appends instruction lines to the
//! procedure under the emission cursor.

use crate::cmd;
use crate::emit::{Emitter, IdAllocator, ProcId, ProcKind, ValueId};
use crate::error::{CodegenError, CompileFailure};
use crate::frame::{FrameState, Slot};
use crate::function::FunctionDef;
use crate::runtime::Helper;
use crate::source_map::{ProcedureMap, ProcedureMapEntry};
use crate::types::{
    Layout, Register, CALL, COND_STACK, FRAME, INIT_PROCEDURE, MEM, SIGNALS, STACK,
};
use crate::value::{
    Capabilities, DecimalFloat, Element, Kind, Literal, ShapeRegistry, Value, DEFAULT_BLOCK,
    DEFAULT_ENTITY,
};
use mcfc_linker::{ComponentRegistry, ComponentSource, LinkResult, DEFAULT_SELECTORS};
use mcfc_types::{CompileErrors, Config, ErrorCode, McfError, Site};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Path prefixes user entry points may not use.
const RESERVED_PREFIXES: &[&str] = &["mcf/", "lib/"];

/// The code generation engine.
pub struct Compiler {
    pub(crate) config: Config,
    pub(crate) layout: Layout,
    pub(crate) ids: IdAllocator,
    pub(crate) emitter: Emitter,
    /// Generation-time frame of the procedure tree being written.
    pub(crate) frame: FrameState,
    /// Frames of callers whose generation is suspended.
    pub(crate) saved_frames: Vec<FrameState>,
    pub(crate) shapes: ShapeRegistry,
    pub(crate) functions: Vec<FunctionDef>,
    pub(crate) components: ComponentRegistry,
    pub(crate) selectors: Vec<String>,
    pub(crate) helpers: HashMap<Helper, String>,
    /// Stand-ins for results of operations that already reported an error.
    placeholders: HashSet<ValueId>,
    entries: Vec<String>,
    errors: CompileErrors,
    internal: Vec<CodegenError>,
    pub(crate) frames_pushed: usize,
    pub(crate) frames_popped: usize,
}

/// Finished, unlinked output of a compilation.
#[derive(Debug)]
pub struct Generated {
    pub config: Config,
    pub layout: Layout,
    pub procedures: Vec<GeneratedProcedure>,
    /// Signature of the initialization procedure.
    pub init: String,
    /// Signatures of user entry points.
    pub entries: Vec<String>,
    /// Component registry with every activation made during generation.
    pub components: ComponentRegistry,
    pub procedure_map: ProcedureMap,
    /// Warnings collected during generation.
    pub warnings: CompileErrors,
    /// Identities still live after every scope closed.
    pub leaked: Vec<ValueId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedProcedure {
    /// Path inside the function directory.
    pub path: String,
    pub signature: String,
    pub kind: ProcKind,
    pub lines: Vec<String>,
}

impl Generated {
    pub fn procedure(&self, signature: &str) -> Option<&GeneratedProcedure> {
        self.procedures.iter().find(|p| p.signature == signature)
    }

    pub fn procedures_of_kind(&self, kind: ProcKind) -> impl Iterator<Item = &GeneratedProcedure> {
        self.procedures.iter().filter(move |p| p.kind == kind)
    }
}

impl Compiler {
    // ══════════════════════════════════════════════════════════════════════
    // Construction
    // ══════════════════════════════════════════════════════════════════════

    /// A compiler with no component database.
    #[track_caller]
    pub fn new(config: Config) -> Self {
        let site = Site::caller();
        let layout = Layout::new(&config.namespace);
        let mut compiler = Self {
            components: ComponentRegistry::new(config.namespace.clone()),
            selectors: DEFAULT_SELECTORS.iter().map(|s| s.to_string()).collect(),
            layout,
            config,
            ids: IdAllocator::new(),
            emitter: Emitter::new(),
            frame: FrameState::default(),
            saved_frames: Vec::new(),
            shapes: ShapeRegistry::new(),
            functions: Vec::new(),
            helpers: HashMap::new(),
            placeholders: HashSet::new(),
            entries: Vec::new(),
            errors: CompileErrors::empty(),
            internal: Vec::new(),
            frames_pushed: 0,
            frames_popped: 0,
        };
        if let Err(err) = compiler.config.validate() {
            let code = match err {
                mcfc_types::ConfigError::UnsupportedVersion(_) => ErrorCode::UNSUPPORTED_VERSION,
                _ => ErrorCode::INVALID_NAME,
            };
            compiler.report(code, err.to_string(), &site);
        }
        compiler
    }

    /// A compiler whose components and selectors come from `source`.
    #[track_caller]
    pub fn with_database(config: Config, source: &dyn ComponentSource) -> LinkResult<Self> {
        let mut compiler = Self::new(config);
        compiler.components = ComponentRegistry::from_source(compiler.config.namespace.clone(), source)?;
        compiler.selectors = source.selectors()?;
        Ok(compiler)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn errors(&self) -> &CompileErrors {
        &self.errors
    }

    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    pub fn shapes(&self) -> &ShapeRegistry {
        &self.shapes
    }

    /// Whether `value`'s identity has not been released yet.
    pub fn is_live(&self, value: &Value) -> bool {
        self.ids.is_live(value.id())
    }

    // ══════════════════════════════════════════════════════════════════════
    // Diagnostics and emission
    // ══════════════════════════════════════════════════════════════════════

    pub(crate) fn report(&mut self, code: ErrorCode, message: impl Into<String>, site: &Site) {
        let error = McfError::new(code, message, site.clone());
        debug!(code = %error.code, site = %site, "{}", error.message);
        self.errors.push_error(error);
    }

    pub(crate) fn warn(&mut self, code: ErrorCode, message: impl Into<String>, site: &Site) {
        self.errors.push_warning(McfError::warning(code, message, site.clone()));
    }

    pub(crate) fn fail(&mut self, error: CodegenError) {
        debug!(%error, "internal failure");
        self.internal.push(error);
    }

    pub(crate) fn emit(&mut self, line: impl Into<String>) {
        if let Err(err) = self.emitter.emit(line.into()) {
            self.fail(err);
        }
    }

    pub(crate) fn emit_all(&mut self, lines: Vec<String>) {
        for line in lines {
            self.emit(line);
        }
    }

    pub(crate) fn new_procedure(&mut self, kind: ProcKind, site: &Site) -> ProcId {
        let id = self.emitter.new_procedure(kind, site.clone());
        debug!(path = %self.emitter.procedure(id).path, ?kind, "procedure created");
        id
    }

    pub(crate) fn signature(&self, id: ProcId) -> String {
        self.layout.signature(&self.emitter.procedure(id).path)
    }

    pub(crate) fn forward(&mut self, id: ProcId) {
        if let Err(err) = self.emitter.forward(id) {
            self.fail(err);
        }
    }

    pub(crate) fn rewind(&mut self) {
        if let Err(err) = self.emitter.rewind() {
            self.fail(err);
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Scopes and liveness
    // ══════════════════════════════════════════════════════════════════════

    pub(crate) fn open_scope(&mut self) {
        self.frame.scopes.push(Vec::new());
    }

    /// Close the innermost scope, releasing what it still owns.
    pub(crate) fn close_scope(&mut self) {
        let Some(ids) = self.frame.scopes.pop() else {
            self.fail(CodegenError::Internal("scope stack underflow".into()));
            return;
        };
        for id in ids.iter().rev() {
            if let Some(slot) = self.frame.context.shift_remove(id) {
                if slot.owned && self.config.gc {
                    let lines = slot.value.release(&self.layout);
                    self.emit_all(lines);
                }
            }
            self.ids.release(id);
        }
    }

    /// Lines releasing every owned value in scopes `from..`.
    pub(crate) fn release_scopes_from(&mut self, from: usize) {
        if !self.config.gc {
            return;
        }
        let ids: Vec<ValueId> = self.frame.scopes[from.min(self.frame.scopes.len())..]
            .iter()
            .flatten()
            .cloned()
            .collect();
        for id in ids.iter().rev() {
            if let Some(slot) = self.frame.context.get(id) {
                if slot.owned {
                    let lines = slot.value.release(&self.layout);
                    self.emit_all(lines);
                }
            }
        }
    }

    /// Run `body` in a nested scope; its values are released at the end.
    pub fn scope<R>(&mut self, body: impl FnOnce(&mut Compiler) -> R) -> R {
        self.open_scope();
        let result = body(self);
        self.close_scope();
        result
    }

    /// A fresh value owned by the innermost scope.
    pub(crate) fn alloc(&mut self, kind: Kind) -> Value {
        let value = Value::new(self.ids.new_id(), kind);
        self.adopt(&value, true);
        value
    }

    pub(crate) fn adopt(&mut self, value: &Value, owned: bool) {
        self.frame.context.insert(
            value.id().clone(),
            Slot {
                value: value.clone(),
                owned,
            },
        );
        if let Some(scope) = self.frame.scopes.last_mut() {
            scope.push(value.id().clone());
        }
    }

    /// A value of `kind` that stands in for the result of a failed operation.
    pub(crate) fn placeholder(&mut self, kind: Kind) -> Value {
        let value = self.alloc(kind);
        self.placeholders.insert(value.id().clone());
        value
    }

    /// Whether `value` may be used here; reports a name error otherwise.
    /// Placeholders are never usable but report nothing, so one mistake
    /// yields one diagnostic.
    pub(crate) fn check_live(&mut self, value: &Value, site: &Site) -> bool {
        if self.placeholders.contains(value.id()) {
            return false;
        }
        if self.frame.context.contains_key(value.id()) {
            return true;
        }
        self.report(
            ErrorCode::UNKNOWN_IDENTITY,
            format!("{} value {} is not live here", value.kind().name(), value.id()),
            site,
        );
        false
    }

    pub(crate) fn check_kind(&mut self, value: &Value, expected: Kind, site: &Site) -> bool {
        if expected.accepts(value.kind()) {
            return true;
        }
        self.report(
            ErrorCode::TYPE_MISMATCH,
            format!("expected {}, found {}", expected.name(), value.kind().name()),
            site,
        );
        false
    }

    // ══════════════════════════════════════════════════════════════════════
    // Entry points
    // ══════════════════════════════════════════════════════════════════════

    /// Generate the entry point `<ns>:<name>`.
    #[track_caller]
    pub fn entry(&mut self, name: &str, body: impl FnOnce(&mut Compiler)) {
        let site = Site::caller();
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '_' | '-' | '.' | '/'))
            && !RESERVED_PREFIXES.iter().any(|p| name.starts_with(p));
        if !valid {
            self.report(
                ErrorCode::INVALID_NAME,
                format!("'{name}' is not a valid entry point name"),
                &site,
            );
            return;
        }
        let Some(proc) = self.emitter.named_procedure(
            name,
            ProcKind::Entry,
            site.clone(),
            Some(name.to_string()),
        ) else {
            self.report(
                ErrorCode::REDECLARATION,
                format!("entry point '{name}' is already defined"),
                &site,
            );
            return;
        };
        info!(entry = name, "generating entry point");
        self.entries.push(self.signature(proc));

        let outer = std::mem::take(&mut self.frame);
        self.forward(proc);
        self.open_new_frame(&[]);
        body(self);
        while !self.frame.scopes.is_empty() {
            self.close_scope();
        }
        self.rewind();
        self.frame = outer;
    }

    // ══════════════════════════════════════════════════════════════════════
    // Value construction
    // ══════════════════════════════════════════════════════════════════════

    fn literal_value(&mut self, kind: Kind, literal: Literal) -> Value {
        let value = self.alloc(kind);
        let lines = value.assign_literal(&self.layout, &literal);
        self.emit_all(lines);
        value
    }

    #[track_caller]
    pub fn int(&mut self, value: i32) -> Value {
        self.literal_value(Kind::Integer, Literal::Int(value))
    }

    #[track_caller]
    pub fn boolean(&mut self, value: bool) -> Value {
        self.literal_value(Kind::Condition, Literal::Bool(value))
    }

    /// A float from a decimal literal.
    #[track_caller]
    pub fn float(&mut self, literal: &str) -> Value {
        let site = Site::caller();
        let parsed = match DecimalFloat::parse(literal) {
            Ok(f) => f,
            Err(err) => {
                self.report(ErrorCode::INVALID_LITERAL, err.to_string(), &site);
                DecimalFloat::ZERO
            }
        };
        self.literal_value(Kind::Float, Literal::Float(parsed))
    }

    #[track_caller]
    pub fn text(&mut self, value: &str) -> Value {
        self.literal_value(Kind::Text, Literal::Text(value.to_string()))
    }

    /// An empty list.
    #[track_caller]
    pub fn list(&mut self, element: Element) -> Value {
        self.literal_value(Kind::List(element), Literal::Snbt("[]".into()))
    }

    /// A blank or initialized instance of `kind`.
    ///
    /// With `void` set, no instructions are emitted and the storage is
    /// left as it is.
    #[track_caller]
    pub fn blank(&mut self, kind: Kind, void: bool) -> Value {
        if void {
            return self.alloc(kind);
        }
        let literal = match kind {
            Kind::Condition => Literal::Bool(false),
            Kind::Integer => Literal::Int(0),
            Kind::Float => Literal::Float(DecimalFloat::ZERO),
            Kind::Text => Literal::Text(String::new()),
            Kind::List(_) => Literal::Snbt("[]".into()),
            Kind::Object(shape) => Literal::Snbt(self.shapes.default_snbt(shape)),
            Kind::Entity | Kind::Player => Literal::Text(DEFAULT_ENTITY.to_string()),
            Kind::Block => Literal::Text(DEFAULT_BLOCK.to_string()),
        };
        self.literal_value(kind, literal)
    }

    /// A new value of the same kind as `value`, initialized from `init`
    /// or left blank.
    #[track_caller]
    pub fn duplicate(&mut self, value: &Value, init: Option<&Value>, void: bool) -> Value {
        let site = Site::caller();
        let copy = self.blank(value.kind(), void || init.is_some());
        if let Some(init) = init {
            if self.check_live(init, &site) && self.check_kind(init, value.kind(), &site) {
                let lines = copy.assign_value(&self.layout, init);
                self.emit_all(lines);
            }
        }
        copy
    }

    // ══════════════════════════════════════════════════════════════════════
    // Value capabilities
    // ══════════════════════════════════════════════════════════════════════

    /// Overwrite `target` with `source` of the same kind.
    #[track_caller]
    pub fn assign(&mut self, target: &Value, source: &Value) {
        let site = Site::caller();
        if !self.check_live(target, &site) || !self.check_live(source, &site) {
            return;
        }
        if self.check_kind(source, target.kind(), &site) && target.id() != source.id() {
            let lines = target.assign_value(&self.layout, source);
            self.emit_all(lines);
        }
    }

    /// Overwrite `target` with a literal.
    #[track_caller]
    pub fn assign_literal(&mut self, target: &Value, literal: Literal) {
        let site = Site::caller();
        if !self.check_live(target, &site) {
            return;
        }
        let fits = matches!(
            (target.kind(), &literal),
            (Kind::Condition, Literal::Bool(_))
                | (Kind::Integer, Literal::Int(_))
                | (Kind::Float, Literal::Float(_))
                | (Kind::Text | Kind::Entity | Kind::Player | Kind::Block, Literal::Text(_))
                | (Kind::List(_) | Kind::Object(_), Literal::Snbt(_))
        );
        if !fits {
            self.report(
                ErrorCode::TYPE_MISMATCH,
                format!("literal {literal:?} does not fit a {} value", target.kind().name()),
                &site,
            );
            return;
        }
        let lines = target.assign_literal(&self.layout, &literal);
        self.emit_all(lines);
    }

    /// Emit the cleanup of `value` now. The value stays in scope but is
    /// not released again when the scope closes.
    #[track_caller]
    pub fn release(&mut self, value: &Value) {
        let site = Site::caller();
        if !self.check_live(value, &site) {
            return;
        }
        let lines = value.release(&self.layout);
        self.emit_all(lines);
        if let Some(slot) = self.frame.context.get_mut(value.id()) {
            slot.owned = false;
        }
    }

    /// Copy `value` to `path` in the project storage.
    #[track_caller]
    pub fn move_out(&mut self, value: &Value, path: &str) {
        let site = Site::caller();
        if self.check_live(value, &site) {
            let lines = value.move_out(&self.layout, &self.layout.at(path));
            self.emit_all(lines);
        }
    }

    /// Overwrite `value` from `path` in the project storage.
    #[track_caller]
    pub fn collect_in(&mut self, value: &Value, path: &str) {
        let site = Site::caller();
        if self.check_live(value, &site) {
            let lines = value.collect_in(&self.layout, &self.layout.at(path));
            self.emit_all(lines);
        }
    }

    /// Write the plain form of `value` to `path`. Floats become doubles,
    /// entities their UUID int array.
    #[track_caller]
    pub fn extract(&mut self, value: &Value, path: &str) {
        let site = Site::caller();
        if !self.check_live(value, &site) {
            return;
        }
        let dest = self.layout.at(path);
        if value.kind() == Kind::Float {
            self.extract_float(value, &dest);
        } else if value.kind().is_entity() {
            self.extract_entity(value, &dest, &site);
        } else {
            let lines = value.move_out(&self.layout, &dest);
            self.emit_all(lines);
        }
    }

    /// A new value built from the plain form stored at `path`.
    #[track_caller]
    pub fn construct(&mut self, kind: Kind, path: &str) -> Value {
        let site = Site::caller();
        let src = self.layout.at(path);
        if kind == Kind::Float {
            return self.construct_float(&src, &site);
        }
        if kind.is_entity() {
            return self.construct_entity(kind, &src, &site);
        }
        let value = self.alloc(kind);
        let lines = value.collect_in(&self.layout, &src);
        self.emit_all(lines);
        value
    }

    // ══════════════════════════════════════════════════════════════════════
    // Completion
    // ══════════════════════════════════════════════════════════════════════

    fn build_init(&mut self) {
        let Some(init) = self.emitter.named_procedure(
            INIT_PROCEDURE,
            ProcKind::Init,
            Site::synthetic(),
            Some("init".into()),
        ) else {
            self.fail(CodegenError::Internal("init procedure already exists".into()));
            return;
        };
        let l = self.layout.clone();
        self.forward(init);
        self.emit(cmd::add_objective(&l.var_objective));
        self.emit(cmd::add_objective(&l.sys_objective));
        for register in SIGNALS {
            self.emit(cmd::set(&l.sys(register), 0));
        }
        self.emit(cmd::set(&l.sys(Register::General), 0));
        for key in [STACK, COND_STACK] {
            self.emit(cmd::set_value(&l.at(key), "[]"));
        }
        for key in [FRAME, CALL, MEM] {
            self.emit(cmd::set_value(&l.at(key), "{}"));
        }
        self.rewind();
    }

    /// Finish generation. Fails when any error diagnostic was reported or
    /// the engine's own bookkeeping is unbalanced.
    pub fn finish(mut self) -> Result<Generated, CompileFailure> {
        if self.emitter.depth() != 0 {
            self.fail(CodegenError::Internal(format!(
                "emission cursor left {} procedure(s) open",
                self.emitter.depth()
            )));
        }
        if !self.saved_frames.is_empty() || self.frames_pushed != self.frames_popped {
            self.fail(CodegenError::Internal(format!(
                "unbalanced frames: {} pushed, {} popped",
                self.frames_pushed, self.frames_popped
            )));
        }
        self.build_init();

        if self.errors.has_errors() || !self.internal.is_empty() {
            return Err(CompileFailure {
                errors: self.errors,
                internal: self.internal,
            });
        }

        let layout = self.layout;
        let mut procedure_map = ProcedureMap::new();
        let procedures: Vec<GeneratedProcedure> = self
            .emitter
            .into_procedures()
            .into_iter()
            .filter(|p| p.is_opened())
            .map(|p| {
                let signature = layout.signature(&p.path);
                procedure_map.push(ProcedureMapEntry {
                    signature: signature.clone(),
                    kind: p.kind,
                    label: p.label.clone(),
                    site: p.site.clone(),
                    lines: p.lines.len(),
                });
                GeneratedProcedure {
                    path: p.path,
                    signature,
                    kind: p.kind,
                    lines: p.lines,
                }
            })
            .collect();
        info!(procedures = procedures.len(), "generation finished");

        Ok(Generated {
            init: layout.signature(INIT_PROCEDURE),
            config: self.config,
            layout,
            procedures,
            entries: self.entries,
            components: self.components,
            procedure_map,
            warnings: self.errors,
            leaked: self.ids.leaked(),
        })
    }
}
