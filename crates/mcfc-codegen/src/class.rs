//! Classes: shapes, instances, field access and methods.
//!
//! An instance is a compound at `mem.<id>`. Field access copies the
//! compound's entries into the shape's shared field slots, runs the
//! body against the slots and stores them back.

use crate::compiler::Compiler;
use crate::emit::ProcKind;
use crate::function::{FunctionId, Param};
use crate::value::shape::{Field, ShapeError};
use crate::value::{Capabilities, Kind, ShapeId, Value};
use mcfc_types::{ErrorCode, Site};
use tracing::debug;

/// Field slots of an open instance.
#[derive(Debug, Clone)]
pub struct Fields {
    object: Value,
    fields: Vec<Field>,
}

impl Fields {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.slot)
    }

    pub fn object(&self) -> &Value {
        &self.object
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

impl Compiler {
    /// Register a class shape. Field order is kept in the stored compound.
    #[track_caller]
    pub fn define_class(&mut self, name: &str, fields: &[(&str, Kind)]) -> ShapeId {
        let site = Site::caller();
        match self.shapes.define(name, fields, &mut self.ids) {
            Ok(id) => {
                debug!(class = name, fields = fields.len(), "class defined");
                id
            }
            Err(ShapeError::Redeclared(existing)) => {
                self.report(
                    ErrorCode::REDECLARATION,
                    format!("class '{name}' is already defined"),
                    &site,
                );
                existing
            }
            Err(ShapeError::DuplicateField(field)) => {
                self.report(
                    ErrorCode::REDECLARATION,
                    format!("field '{field}' appears twice in class '{name}'"),
                    &site,
                );
                let unique: Vec<(&str, Kind)> = fields
                    .iter()
                    .enumerate()
                    .filter(|(i, (f, _))| !fields[..*i].iter().any(|(g, _)| g == f))
                    .map(|(_, field)| *field)
                    .collect();
                self.define_class(name, &unique)
            }
        }
    }

    /// A new instance with default field values.
    #[track_caller]
    pub fn new_object(&mut self, class: ShapeId) -> Value {
        self.blank(Kind::Object(class), false)
    }

    // ══════════════════════════════════════════════════════════════════════
    // Fields
    // ══════════════════════════════════════════════════════════════════════

    /// Run `body` with `object`'s fields open.
    #[track_caller]
    pub fn with_fields<R>(
        &mut self,
        object: &Value,
        body: impl FnOnce(&mut Compiler, &Fields) -> R,
    ) -> Option<R> {
        let site = Site::caller();
        if !self.check_live(object, &site) {
            return None;
        }
        let Kind::Object(shape) = object.kind() else {
            self.report(
                ErrorCode::TYPE_MISMATCH,
                format!("expected object, found {}", object.kind().name()),
                &site,
            );
            return None;
        };
        if self.frame.open_fields.iter().any(|(_, s)| *s == shape) {
            self.report(
                ErrorCode::NESTED_FIELD_ACCESS,
                format!(
                    "fields of class '{}' are already open",
                    self.shapes.get(shape).name
                ),
                &site,
            );
            return None;
        }

        let fields = Fields {
            object: object.clone(),
            fields: self.shapes.get(shape).fields.clone(),
        };
        let l = self.layout.clone();
        let record = l.mem(object.id());
        for field in &fields.fields {
            let lines = field.slot.collect_in(&l, &record.child(&field.name));
            self.emit_all(lines);
            self.adopt(&field.slot, false);
        }
        self.frame.open_fields.push((object.clone(), shape));

        let result = body(self, &fields);

        self.frame.open_fields.pop();
        self.store_fields(object, &fields.fields);
        for field in &fields.fields {
            self.frame.context.shift_remove(field.slot.id());
            for scope in &mut self.frame.scopes {
                scope.retain(|id| id != field.slot.id());
            }
        }
        Some(result)
    }

    /// Field `name` of an open instance. An unknown name is reported once;
    /// the placeholder returned for it is ignored by later checks.
    #[track_caller]
    pub fn field(&mut self, fields: &Fields, name: &str) -> Value {
        let site = Site::caller();
        if let Some(slot) = fields.get(name) {
            return slot.clone();
        }
        let class = match fields.object.kind() {
            Kind::Object(shape) => self.shapes.get(shape).name.clone(),
            _ => String::new(),
        };
        self.report(
            ErrorCode::UNKNOWN_FIELD,
            format!("class '{class}' has no field '{name}'"),
            &site,
        );
        self.placeholder(Kind::Integer)
    }

    fn store_fields(&mut self, object: &Value, fields: &[Field]) {
        let l = self.layout.clone();
        let record = l.mem(object.id());
        for field in fields {
            let lines = field.slot.move_out(&l, &record.child(&field.name));
            self.emit_all(lines);
        }
    }

    /// Write every open field back to its instance. Used before leaving
    /// a function early.
    pub(crate) fn store_open_fields(&mut self) {
        self.store_open_fields_from(0);
    }

    /// Write back the instances opened at depth `from` or deeper, innermost
    /// first. Used before leaving a loop iteration early.
    pub(crate) fn store_open_fields_from(&mut self, from: usize) {
        let open: Vec<(Value, ShapeId)> = self
            .frame
            .open_fields
            .get(from..)
            .unwrap_or_default()
            .to_vec();
        for (object, shape) in open.iter().rev() {
            let fields = self.shapes.get(*shape).fields.clone();
            self.store_fields(object, &fields);
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Methods
    // ══════════════════════════════════════════════════════════════════════

    /// Declare method `name` of `class`. The body gets the instance as a
    /// by-alias `self`, so changes to it persist in the caller.
    #[track_caller]
    pub fn method(
        &mut self,
        class: ShapeId,
        name: &str,
        params: &[Param],
        ret: Option<Kind>,
        body: impl FnOnce(&mut Compiler, &Value, &[Value]) + 'static,
    ) -> FunctionId {
        let site = Site::caller();
        let class_name = self.shapes.get(class).name.clone();
        if let Some(existing) = self.shapes.method(class, name) {
            self.report(
                ErrorCode::REDECLARATION,
                format!("method '{class_name}.{name}' is already defined"),
                &site,
            );
            return existing;
        }
        let mut all = Vec::with_capacity(params.len() + 1);
        all.push(Param::alias(Kind::Object(class)));
        all.extend_from_slice(params);
        let id = self.declare(
            &format!("{class_name}.{name}"),
            &all,
            ret,
            ProcKind::Method,
            &site,
            Box::new(move |cx: &mut Compiler, inputs: &[Value]| {
                body(cx, &inputs[0], &inputs[1..]);
            }),
        );
        self.shapes.add_method(class, name, id);
        id
    }

    /// Look up a method declared on `class`.
    pub fn find_method(&self, class: ShapeId, name: &str) -> Option<FunctionId> {
        self.shapes.method(class, name)
    }

    /// Call `method` on `object`.
    #[track_caller]
    pub fn call_method(
        &mut self,
        object: &Value,
        method: FunctionId,
        args: &[&Value],
    ) -> Option<Value> {
        let site = Site::caller();
        let mut all = Vec::with_capacity(args.len() + 1);
        all.push(object);
        all.extend_from_slice(args);
        self.invoke(method, &all, &site)
    }
}
