//! Object shapes: named field sets shared by every instance of a class.

use super::{Kind, Value, DEFAULT_BLOCK, DEFAULT_ENTITY};
use crate::cmd;
use crate::emit::IdAllocator;
use crate::function::FunctionId;
use indexmap::IndexMap;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(pub(crate) usize);

/// A field of a shape. `slot` is the value that stands for the field
/// while an instance's fields are open.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub slot: Value,
}

#[derive(Debug, Clone)]
pub struct Shape {
    pub name: String,
    pub fields: Vec<Field>,
    pub(crate) methods: IndexMap<String, FunctionId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    Redeclared(ShapeId),
    DuplicateField(String),
}

#[derive(Debug, Default)]
pub struct ShapeRegistry {
    shapes: Vec<Shape>,
    by_name: HashMap<String, ShapeId>,
}

impl ShapeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(
        &mut self,
        name: &str,
        fields: &[(&str, Kind)],
        ids: &mut IdAllocator,
    ) -> Result<ShapeId, ShapeError> {
        if let Some(existing) = self.by_name.get(name) {
            return Err(ShapeError::Redeclared(*existing));
        }
        let mut seen = std::collections::HashSet::new();
        for (field, _) in fields {
            if !seen.insert(*field) {
                return Err(ShapeError::DuplicateField(field.to_string()));
            }
        }
        let id = ShapeId(self.shapes.len());
        self.shapes.push(Shape {
            name: name.to_string(),
            fields: fields
                .iter()
                .map(|(field, kind)| Field {
                    name: field.to_string(),
                    slot: Value::new(ids.new_pinned(), *kind),
                })
                .collect(),
            methods: IndexMap::new(),
        });
        self.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn lookup(&self, name: &str) -> Option<ShapeId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: ShapeId) -> &Shape {
        &self.shapes[id.0]
    }

    pub fn field(&self, id: ShapeId, name: &str) -> Option<&Field> {
        self.get(id).fields.iter().find(|f| f.name == name)
    }

    pub(crate) fn method(&self, id: ShapeId, name: &str) -> Option<FunctionId> {
        self.get(id).methods.get(name).copied()
    }

    pub(crate) fn add_method(&mut self, id: ShapeId, name: &str, function: FunctionId) {
        if let Some(shape) = self.shapes.get_mut(id.0) {
            shape.methods.insert(name.to_string(), function);
        }
    }

    /// Default instance: zero numbers, false conditions, empty texts and lists.
    pub fn default_snbt(&self, id: ShapeId) -> String {
        let fields: Vec<String> = self
            .get(id)
            .fields
            .iter()
            .map(|f| format!("{}:{}", f.name, self.default_of(f.slot.kind())))
            .collect();
        format!("{{{}}}", fields.join(","))
    }

    pub fn default_of(&self, kind: Kind) -> String {
        match kind {
            Kind::Condition => "0b".to_string(),
            Kind::Integer => "0".to_string(),
            Kind::Float => super::DecimalFloat::ZERO.to_snbt(),
            Kind::Text => cmd::quote(""),
            Kind::List(_) => "[]".to_string(),
            Kind::Object(shape) => self.default_snbt(shape),
            Kind::Entity | Kind::Player => cmd::quote(DEFAULT_ENTITY),
            Kind::Block => format!("{{src:{}}}", cmd::quote(DEFAULT_BLOCK)),
        }
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Element;

    #[test]
    fn test_define_and_defaults() {
        let mut ids = IdAllocator::new();
        let mut shapes = ShapeRegistry::new();
        let point = shapes
            .define("Point", &[("x", Kind::Integer), ("y", Kind::Integer)], &mut ids)
            .unwrap();
        let line = shapes
            .define(
                "Line",
                &[
                    ("a", Kind::Object(point)),
                    ("label", Kind::Text),
                    ("tags", Kind::List(Element::Text)),
                    ("on", Kind::Condition),
                ],
                &mut ids,
            )
            .unwrap();
        assert_eq!(shapes.default_snbt(point), "{x:0,y:0}");
        assert_eq!(
            shapes.default_snbt(line),
            r#"{a:{x:0,y:0},label:"",tags:[],on:0b}"#
        );
        assert_eq!(shapes.lookup("Line"), Some(line));
        assert!(ids.is_pinned(shapes.field(point, "x").unwrap().slot.id()));
    }

    #[test]
    fn test_handle_field_defaults() {
        let mut ids = IdAllocator::new();
        let mut shapes = ShapeRegistry::new();
        let guard = shapes
            .define("Guard", &[("target", Kind::Player), ("post", Kind::Block)], &mut ids)
            .unwrap();
        assert_eq!(
            shapes.default_snbt(guard),
            r#"{target:"@s",post:{src:"~ ~ ~"}}"#
        );
    }

    #[test]
    fn test_redeclaration_and_duplicate_fields() {
        let mut ids = IdAllocator::new();
        let mut shapes = ShapeRegistry::new();
        let a = shapes.define("A", &[], &mut ids).unwrap();
        assert_eq!(
            shapes.define("A", &[], &mut ids),
            Err(ShapeError::Redeclared(a))
        );
        assert_eq!(
            shapes.define("B", &[("x", Kind::Integer), ("x", Kind::Text)], &mut ids),
            Err(ShapeError::DuplicateField("x".into()))
        );
    }
}
