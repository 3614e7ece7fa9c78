//! Runtime values and their lowering.
//!
//! Every value kind answers the same questions through [`Capabilities`]:
//! how to copy another value in, how to move out to a storage location,
//! how to collect back from one, how to construct from a macro argument
//! and how to release its storage. Integer and condition values live on
//! the `<ns>.var` objective; everything else lives at `mem.<id>`.
//!
//! Game handles are storage kinds too: an entity or player is a selector,
//! name or UUID string, a block is `{src:"<x> <y> <z>"}` plus the `data`
//! read by the last state query.

pub mod float;
mod score;
pub mod shape;
mod stored;

use crate::emit::ValueId;
use crate::types::{Layout, Loc};
pub use float::{DecimalFloat, FloatError};
pub use shape::{ShapeId, ShapeRegistry};

/// Handle written into a blank entity or player: the executor.
pub const DEFAULT_ENTITY: &str = "@s";

/// Coordinates written into a blank block: the execution position.
pub const DEFAULT_BLOCK: &str = "~ ~ ~";

/// Element type of a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Element {
    Condition,
    Integer,
    Float,
    Text,
    Object(ShapeId),
}

/// Runtime kind of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Condition,
    Integer,
    Float,
    Text,
    List(Element),
    Object(ShapeId),
    Entity,
    /// An entity known to be a player.
    Player,
    Block,
}

impl Kind {
    pub fn name(&self) -> &'static str {
        match self {
            Kind::Condition => "condition",
            Kind::Integer => "integer",
            Kind::Float => "float",
            Kind::Text => "text",
            Kind::List(_) => "list",
            Kind::Object(_) => "object",
            Kind::Entity => "entity",
            Kind::Player => "player",
            Kind::Block => "block",
        }
    }

    /// Whether a value of kind `other` may stand where `self` is expected.
    /// A player is accepted wherever an entity is.
    pub fn accepts(&self, other: Kind) -> bool {
        *self == other || (*self == Kind::Entity && other == Kind::Player)
    }

    /// Entity and player handles.
    pub fn is_entity(&self) -> bool {
        matches!(self, Kind::Entity | Kind::Player)
    }

    /// Kinds kept on the scoreboard.
    pub fn is_score(&self) -> bool {
        matches!(self, Kind::Condition | Kind::Integer)
    }

    /// Storage type used when a score kind is written to storage.
    pub(crate) fn store_type(&self) -> &'static str {
        match self {
            Kind::Condition => "byte",
            _ => "int",
        }
    }
}

impl From<Element> for Kind {
    fn from(element: Element) -> Self {
        match element {
            Element::Condition => Kind::Condition,
            Element::Integer => Kind::Integer,
            Element::Float => Kind::Float,
            Element::Text => Kind::Text,
            Element::Object(shape) => Kind::Object(shape),
        }
    }
}

/// A handle to a runtime value.
///
/// Holding a `Value` does not keep it alive: once its scope closes (or
/// it is released) the handle is stale and using it is a name error.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Value {
    id: ValueId,
    kind: Kind,
}

impl Value {
    pub(crate) fn new(id: ValueId, kind: Kind) -> Self {
        Self { id, kind }
    }

    pub fn id(&self) -> &ValueId {
        &self.id
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }
}

/// A constant that can be written without any other value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    Int(i32),
    Float(DecimalFloat),
    Text(String),
    /// Raw SNBT, used for empty lists and object defaults.
    Snbt(String),
}

/// Uniform lowering interface shared by every value kind.
///
/// Each method returns the instruction lines to emit; none of them
/// touch compiler state.
pub trait Capabilities {
    /// Copy `other` into this value.
    fn assign_value(&self, layout: &Layout, other: &Value) -> Vec<String>;
    /// Write a constant into this value.
    fn assign_literal(&self, layout: &Layout, literal: &Literal) -> Vec<String>;
    /// Write this value to a storage location.
    fn move_out(&self, layout: &Layout, dest: &Loc) -> Vec<String>;
    /// Read this value back from a storage location.
    fn collect_in(&self, layout: &Layout, src: &Loc) -> Vec<String>;
    /// Construct this value from the value whose identity is the macro
    /// argument `slot`. Lines start with `$`.
    fn macro_construct(&self, layout: &Layout, slot: &str) -> Vec<String>;
    /// Free this value's runtime storage.
    fn release(&self, layout: &Layout) -> Vec<String>;
}

impl Capabilities for Value {
    fn assign_value(&self, layout: &Layout, other: &Value) -> Vec<String> {
        if self.kind.is_score() {
            score::assign_value(layout, self, other)
        } else {
            stored::assign_value(layout, self, other)
        }
    }

    fn assign_literal(&self, layout: &Layout, literal: &Literal) -> Vec<String> {
        if self.kind.is_score() {
            score::assign_literal(layout, self, literal)
        } else {
            stored::assign_literal(layout, self, literal)
        }
    }

    fn move_out(&self, layout: &Layout, dest: &Loc) -> Vec<String> {
        if self.kind.is_score() {
            score::move_out(layout, self, dest)
        } else {
            stored::move_out(layout, self, dest)
        }
    }

    fn collect_in(&self, layout: &Layout, src: &Loc) -> Vec<String> {
        if self.kind.is_score() {
            score::collect_in(layout, self, src)
        } else {
            stored::collect_in(layout, self, src)
        }
    }

    fn macro_construct(&self, layout: &Layout, slot: &str) -> Vec<String> {
        if self.kind.is_score() {
            score::macro_construct(layout, self, slot)
        } else {
            stored::macro_construct(layout, self, slot)
        }
    }

    fn release(&self, layout: &Layout) -> Vec<String> {
        if self.kind.is_score() {
            score::release(layout, self)
        } else {
            stored::release(layout, self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::IdAllocator;

    fn layout() -> Layout {
        Layout::new("t")
    }

    fn value(kind: Kind) -> Value {
        let mut ids = IdAllocator::new();
        Value::new(ids.new_id(), kind)
    }

    #[test]
    fn test_integer_round_trip_lines() {
        let l = layout();
        let v = value(Kind::Integer);
        let slot = l.frame_slot(0);
        assert_eq!(
            v.move_out(&l, &slot),
            ["execute store result storage t:mcf frame.m0 int 1 run scoreboard players get v0 t.var"]
        );
        assert_eq!(
            v.collect_in(&l, &slot),
            ["execute store result score v0 t.var run data get storage t:mcf frame.m0"]
        );
        assert_eq!(v.release(&l), ["scoreboard players reset v0 t.var"]);
    }

    #[test]
    fn test_condition_moves_as_byte() {
        let l = layout();
        let v = value(Kind::Condition);
        assert!(v.move_out(&l, &l.at("ret"))[0].contains(" byte 1 "));
    }

    #[test]
    fn test_stored_kinds_use_mem_slot() {
        let l = layout();
        let v = value(Kind::Text);
        assert_eq!(
            v.move_out(&l, &l.at("ret")),
            ["data modify storage t:mcf ret set from storage t:mcf mem.v0"]
        );
        assert_eq!(
            v.macro_construct(&l, "m1"),
            ["$data modify storage t:mcf mem.v0 set from storage t:mcf mem.$(m1)"]
        );
        assert_eq!(v.release(&l), ["data remove storage t:mcf mem.v0"]);
    }

    #[test]
    fn test_player_stands_in_for_entity() {
        assert!(Kind::Entity.accepts(Kind::Player));
        assert!(!Kind::Player.accepts(Kind::Entity));
        assert!(!Kind::Block.accepts(Kind::Text));
    }

    #[test]
    fn test_block_literal_wraps_coordinates() {
        let l = layout();
        assert_eq!(
            value(Kind::Block).assign_literal(&l, &Literal::Text("1 64 -3".into())),
            [r#"data modify storage t:mcf mem.v0 set value {src:"1 64 -3"}"#]
        );
        assert_eq!(
            value(Kind::Player).assign_literal(&l, &Literal::Text("@p".into())),
            [r#"data modify storage t:mcf mem.v0 set value "@p""#]
        );
    }

    #[test]
    fn test_score_macro_construct() {
        let l = layout();
        let v = value(Kind::Integer);
        assert_eq!(
            v.macro_construct(&l, "m0"),
            ["$scoreboard players operation v0 t.var = $(m0) t.var"]
        );
    }

    #[test]
    fn test_literals() {
        let l = layout();
        assert_eq!(
            value(Kind::Condition).assign_literal(&l, &Literal::Bool(true)),
            ["scoreboard players set v0 t.var 1"]
        );
        assert_eq!(
            value(Kind::Text).assign_literal(&l, &Literal::Text("hi".into())),
            [r#"data modify storage t:mcf mem.v0 set value "hi""#]
        );
        let f = DecimalFloat::parse("2.5").unwrap();
        assert_eq!(
            value(Kind::Float).assign_literal(&l, &Literal::Float(f)),
            ["data modify storage t:mcf mem.v0 set value {m:25000000,e:0,s:0b}"]
        );
    }
}
